//! Track store: the latest known state of every vessel heard from.
//!
//! Tracks are kept in the order they were first heard, and never evicted.
//! The display target is the first AIS vessel heard; the own-ship compass
//! track only stands in until one is. Own-ship AIS sees one or two keys per
//! session, so lookups are a linear scan.

use jiff::Timestamp;

use crate::model::{PositionFix, Track, TrackKey, TrackUpdate};

/// Insertion-ordered tracks, keyed by [`TrackKey`].
///
/// Not synchronized; the session owning it serializes access.
#[derive(Debug, Default)]
pub struct TrackStore {
    tracks: Vec<Track>,
}

impl TrackStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a partial update, creating the track on first sight.
    pub fn upsert(&mut self, key: TrackKey, update: TrackUpdate, at: Timestamp) -> &Track {
        let index = match self.tracks.iter().position(|t| t.key == key) {
            Some(index) => index,
            None => {
                self.tracks.push(Track::new(key, at));
                self.tracks.len() - 1
            }
        };
        let track = &mut self.tracks[index];
        track.apply(update, at);
        track
    }

    /// The first-registered AIS track, else the own-ship track, if any.
    pub fn display_target(&self) -> Option<&Track> {
        self.tracks
            .iter()
            .find(|t| matches!(t.key, TrackKey::Mmsi(_)))
            .or_else(|| self.tracks.first())
    }

    pub fn latest_heading(&self) -> Option<f64> {
        self.display_target().and_then(|t| t.heading)
    }

    pub fn latest_position(&self) -> Option<PositionFix> {
        self.display_target().and_then(|t| t.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix(latitude: f64, longitude: f64) -> PositionFix {
        PositionFix {
            latitude,
            longitude,
        }
    }

    #[test]
    fn empty_store_has_no_target() {
        let store = TrackStore::new();
        assert!(store.tracks.is_empty());
        assert!(store.display_target().is_none());
        assert_eq!(store.latest_heading(), None);
        assert_eq!(store.latest_position(), None);
    }

    #[test]
    fn partial_updates_keep_absent_fields() {
        let mut store = TrackStore::new();
        let t0 = Timestamp::new(1_000, 0).unwrap();
        let t1 = Timestamp::new(1_001, 0).unwrap();

        store.upsert(TrackKey::OwnShip, TrackUpdate::heading(87.6), t0);
        let track = store.upsert(TrackKey::OwnShip, TrackUpdate::position(fix(48.1, 11.5)), t1);

        assert_eq!(track.heading, Some(87.6));
        assert_eq!(track.position, Some(fix(48.1, 11.5)));
        assert_eq!(track.updated_at, t1);
        assert_eq!(store.tracks.len(), 1);
    }

    #[test]
    fn newer_values_replace_older_ones() {
        let mut store = TrackStore::new();
        let now = Timestamp::now();

        store.upsert(TrackKey::OwnShip, TrackUpdate::heading(10.0), now);
        store.upsert(TrackKey::OwnShip, TrackUpdate::heading(20.0), now);

        assert_eq!(store.latest_heading(), Some(20.0));
    }

    #[test]
    fn display_target_is_first_registered() {
        let mut store = TrackStore::new();
        let now = Timestamp::now();

        store.upsert(
            TrackKey::Mmsi(477_553_000),
            TrackUpdate {
                name: Some("ALPHA STAR".into()),
                heading: Some(181.0),
                ..TrackUpdate::default()
            },
            now,
        );
        store.upsert(TrackKey::Mmsi(338_087_471), TrackUpdate::heading(80.0), now);
        store.upsert(TrackKey::Mmsi(338_087_471), TrackUpdate::heading(81.0), now);

        let target = store.display_target().unwrap();
        assert_eq!(target.key, TrackKey::Mmsi(477_553_000));
        assert_eq!(target.name.as_deref(), Some("ALPHA STAR"));
        assert_eq!(store.latest_heading(), Some(181.0));
        assert_eq!(store.tracks.len(), 2);
    }

    #[test]
    fn ais_target_outranks_earlier_compass_track() {
        let mut store = TrackStore::new();
        let now = Timestamp::now();

        store.upsert(TrackKey::OwnShip, TrackUpdate::heading(10.0), now);
        assert_eq!(store.latest_heading(), Some(10.0));

        store.upsert(TrackKey::Mmsi(477_553_000), TrackUpdate::heading(181.0), now);
        store.upsert(TrackKey::OwnShip, TrackUpdate::heading(12.0), now);
        store.upsert(TrackKey::Mmsi(338_087_471), TrackUpdate::heading(80.0), now);

        let target = store.display_target().unwrap();
        assert_eq!(target.key, TrackKey::Mmsi(477_553_000));
        assert_eq!(store.latest_heading(), Some(181.0));
    }
}
