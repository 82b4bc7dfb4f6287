//! Readings: the typed result of classifying one sentence.

use serde::{Deserialize, Serialize};

/// A position in signed decimal degrees (north and east positive).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    pub latitude: f64,
    pub longitude: f64,
}

/// The fields carried by one decoded AIS message.
///
/// Messages rarely carry everything: position reports have no name and
/// static reports have no position. Absent fields are `None`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AisReport {
    pub mmsi: u32,
    pub name: Option<String>,
    pub position: Option<PositionFix>,
    /// True heading in degrees.
    pub heading: Option<f64>,
    /// Course over ground in degrees.
    pub course: Option<f64>,
    /// Speed over ground in knots.
    pub speed: Option<f64>,
}

/// What a single line turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    /// A heading sentence, degrees in [0, 360).
    Heading(f64),

    /// A position sentence. Only latitude and longitude are kept.
    Position(PositionFix),

    /// A decoded own-ship AIS message.
    Ais(AisReport),

    /// One part of a multi-sentence AIS message, held until the rest arrives.
    Fragment,

    /// Not a sentence type this recorder understands. Raw-recorded only.
    Unrecognized,

    /// A recognized sentence that could not be parsed.
    Invalid(ParseError),
}

/// Why a recognized sentence could not be parsed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("field {0} is missing")]
    MissingField(usize),

    #[error("field {field} is not a number: '{value}'")]
    NotANumber { field: usize, value: String },

    #[error("heading {0} is outside [0, 360)")]
    HeadingOutOfRange(f64),

    #[error("no position fix")]
    NoFix,

    #[error("invalid hemisphere '{0}'")]
    Hemisphere(String),

    #[error("coordinate {0} is out of range")]
    CoordinateOutOfRange(f64),

    #[error("checksum mismatch: sentence says {expected:02X}, computed {computed:02X}")]
    Checksum { expected: u8, computed: u8 },

    #[error("malformed AIS envelope: {0}")]
    Envelope(&'static str),

    #[error("invalid AIS armor character '{0}'")]
    Armor(char),

    #[error("AIS message type {message_type} needs {needed} bits, got {got}")]
    TooShort {
        message_type: u8,
        needed: usize,
        got: usize,
    },

    #[error("unsupported AIS message type {0}")]
    UnsupportedMessage(u8),
}
