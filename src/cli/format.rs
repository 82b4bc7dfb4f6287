//! Output formatting for console display.

use crate::helm::Snapshot;
use crate::model::{HeadingSample, PositionFix, Track, TrackKey};

/// Eight bar heights, lowest first.
const SPARKLINE_CHARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// One line summarising a session, printed on every refresh.
pub(super) fn status_line(snapshot: &Snapshot) -> String {
    let mut line = format!(
        "{state:<7} {vessel}  HDG {heading}  POS {position}  [{lines} lines, {headings} hdg, {errors} bad]",
        state = snapshot.state,
        vessel = snapshot.vessel.as_deref().unwrap_or("-"),
        heading = format_heading(snapshot.latest_heading),
        position = format_position(snapshot.latest_position),
        lines = snapshot.stats.sentences,
        headings = snapshot.stats.headings,
        errors = snapshot.stats.parse_errors,
    );
    if let Some(target) = snapshot
        .display_target
        .as_ref()
        .filter(|t| matches!(t.key, TrackKey::Mmsi(_)))
    {
        line.push_str("  ");
        line.push_str(&format_target(target));
    }
    if let Some(fault) = &snapshot.fault {
        line.push_str(&format!("  ! {fault}"));
    }
    line
}

/// `087.6°`, or `---.-°` before the first heading.
pub(super) fn format_heading(heading: Option<f64>) -> String {
    heading.map_or_else(|| "---.-°".to_string(), |h| format!("{h:05.1}°"))
}

/// `48.11730N 11.51667E`, or `no fix`.
pub(super) fn format_position(position: Option<PositionFix>) -> String {
    let Some(fix) = position else {
        return "no fix".to_string();
    };
    let ns = if fix.latitude < 0.0 { 'S' } else { 'N' };
    let ew = if fix.longitude < 0.0 { 'W' } else { 'E' };
    format!(
        "{:.5}{ns} {:.5}{ew}",
        fix.latitude.abs(),
        fix.longitude.abs()
    )
}

/// `MMSI 477553000 "ALPHA STAR" COG 051.0° SOG 0.0kn`, with absent fields left out.
pub(super) fn format_target(track: &Track) -> String {
    let mut parts = Vec::new();
    match track.key {
        TrackKey::Mmsi(mmsi) => parts.push(format!("MMSI {mmsi}")),
        TrackKey::OwnShip => parts.push("own ship".to_string()),
    }
    if let Some(name) = &track.name {
        parts.push(format!("\"{name}\""));
    }
    if let Some(course) = track.course {
        parts.push(format!("COG {course:05.1}°"));
    }
    if let Some(speed) = track.speed {
        parts.push(format!("SOG {speed:.1}kn"));
    }
    parts.join(" ")
}

/// The last `width` headings as a bar chart on a fixed 0–360° scale.
pub(super) fn sparkline(headings: &[HeadingSample], width: usize) -> String {
    let start = headings.len().saturating_sub(width);
    headings[start..]
        .iter()
        .map(|sample| {
            let level = (sample.heading / 360.0 * 8.0).floor();
            #[allow(clippy::cast_sign_loss)]
            let index = (level.max(0.0) as usize).min(SPARKLINE_CHARS.len() - 1);
            SPARKLINE_CHARS[index]
        })
        .collect()
}
