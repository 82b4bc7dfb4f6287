//! Tracks and heading samples: the derived state of a session.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::reading::{AisReport, PositionFix};

/// Identifies a tracked vessel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "mmsi", rename_all = "camelCase")]
pub enum TrackKey {
    /// The vessel carrying the instruments (NMEA sentences have no identifier).
    OwnShip,

    /// An AIS target, keyed by its MMSI.
    Mmsi(u32),
}

/// The latest known state of one vessel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub key: TrackKey,
    pub name: Option<String>,
    pub position: Option<PositionFix>,
    pub heading: Option<f64>,
    pub course: Option<f64>,
    pub speed: Option<f64>,
    pub updated_at: Timestamp,
}

impl Track {
    pub fn new(key: TrackKey, at: Timestamp) -> Self {
        Self {
            key,
            name: None,
            position: None,
            heading: None,
            course: None,
            speed: None,
            updated_at: at,
        }
    }

    /// Applies the present fields of `update`, leaving the rest untouched.
    pub fn apply(&mut self, update: TrackUpdate, at: Timestamp) {
        let TrackUpdate {
            name,
            position,
            heading,
            course,
            speed,
        } = update;
        if name.is_some() {
            self.name = name;
        }
        if position.is_some() {
            self.position = position;
        }
        if heading.is_some() {
            self.heading = heading;
        }
        if course.is_some() {
            self.course = course;
        }
        if speed.is_some() {
            self.speed = speed;
        }
        self.updated_at = at;
    }
}

/// A partial track update. `None` means "not reported", not "cleared".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackUpdate {
    pub name: Option<String>,
    pub position: Option<PositionFix>,
    pub heading: Option<f64>,
    pub course: Option<f64>,
    pub speed: Option<f64>,
}

impl TrackUpdate {
    pub fn heading(heading: f64) -> Self {
        Self {
            heading: Some(heading),
            ..Self::default()
        }
    }

    pub fn position(position: PositionFix) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }
}

impl From<AisReport> for TrackUpdate {
    fn from(report: AisReport) -> Self {
        Self {
            name: report.name,
            position: report.position,
            heading: report.heading,
            course: report.course,
            speed: report.speed,
        }
    }
}

/// One heading observation, as plotted and as written to the heading log.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadingSample {
    pub at: Timestamp,
    pub heading: f64,
}
