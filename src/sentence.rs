//! Sentence classification: one line of text in, one typed reading out.
//!
//! Dispatch is by prefix:
//!
//! - `$HEHDT`, `$HEHDG`: heading
//! - `$GPRMC`, `$GPGGA`, `$GPGLL`: position (latitude and longitude only)
//! - `!AIVDO`: own-ship AIS report, decoded in AIS mode only
//!
//! Everything else is [`Reading::Unrecognized`]. [`classify`] is pure and
//! never panics; malformed sentences come back as [`Reading::Invalid`].

mod ais;
mod nmea;

use tracing::debug;

use crate::model::{Reading, SignalMode};

use nmea::PositionSentence;

const HEADING_PREFIXES: [&str; 2] = ["$HEHDT", "$HEHDG"];

const POSITION_PREFIXES: [(&str, PositionSentence); 3] = [
    ("$GPRMC", PositionSentence::Rmc),
    ("$GPGGA", PositionSentence::Gga),
    ("$GPGLL", PositionSentence::Gll),
];

/// Turns the bytes of one line into text.
///
/// Invalid UTF-8 is dropped rather than failing the line.
/// Line terminators and surrounding whitespace are stripped.
pub fn decode_line(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text.trim().to_string()
}

/// Classifies and parses a single line.
///
/// Multi-sentence AIS messages cannot be decoded from one line; they
/// come back as [`Reading::Invalid`] here. Use a [`Decoder`] to join them.
pub fn classify(line: &str, mode: SignalMode) -> Reading {
    if HEADING_PREFIXES.iter().any(|prefix| line.starts_with(prefix)) {
        return nmea::parse_heading(line).map_or_else(Reading::Invalid, Reading::Heading);
    }

    if let Some((_, kind)) = POSITION_PREFIXES
        .iter()
        .find(|(prefix, _)| line.starts_with(prefix))
    {
        return nmea::parse_position(line, *kind).map_or_else(Reading::Invalid, Reading::Position);
    }

    if mode == SignalMode::Ais && line.starts_with(ais::AIVDO_PREFIX) {
        let decoded = ais::Fragment::parse(line).and_then(|fragment| {
            let message = fragment.into_message()?;
            ais::decode(&message)
        });
        return decoded.map_or_else(Reading::Invalid, Reading::Ais);
    }

    Reading::Unrecognized
}

/// A classifier that also joins multi-sentence AIS messages.
///
/// Holds the one piece of state classification needs: fragments of an
/// AIS message waiting for the rest. Every other line goes straight to
/// [`classify`].
#[derive(Debug)]
pub struct Decoder {
    mode: SignalMode,
    reassembler: ais::Reassembler,
}

impl Decoder {
    pub fn new(mode: SignalMode) -> Self {
        Self {
            mode,
            reassembler: ais::Reassembler::default(),
        }
    }

    pub fn decode(&mut self, line: &str) -> Reading {
        if self.mode != SignalMode::Ais || !line.starts_with(ais::AIVDO_PREFIX) {
            return classify(line, self.mode);
        }

        let fragment = match ais::Fragment::parse(line) {
            Ok(fragment) => fragment,
            Err(e) => return Reading::Invalid(e),
        };
        if fragment.is_complete() {
            return classify(line, self.mode);
        }

        match self.reassembler.push(fragment) {
            Some(message) => ais::decode(&message).map_or_else(Reading::Invalid, Reading::Ais),
            None => {
                debug!(line, "holding AIS fragment");
                Reading::Fragment
            }
        }
    }
}
