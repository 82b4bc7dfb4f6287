//! AIS own-ship reports: `!AIVDO` envelopes and their 6-bit armored payloads.
//!
//! Decoded message types:
//!
//! - 1, 2, 3: class A position report
//! - 18: class B position report
//! - 19: extended class B position report (with name)
//! - 5: static and voyage data (name), always two sentences
//! - 24 part A: class B static data (name)

use tracing::debug;

use crate::model::{AisReport, ParseError, PositionFix};

use super::nmea::sentence_body;

pub(super) const AIVDO_PREFIX: &str = "!AIVDO";

/// One `!AIVDO` sentence: a piece of an armored message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Fragment {
    count: u8,
    number: u8,
    sequence: String,
    payload: String,
    fill_bits: u8,
}

impl Fragment {
    /// Parses `!AIVDO,count,number,sequence,channel,payload,fill*cs`.
    pub(super) fn parse(line: &str) -> Result<Self, ParseError> {
        let body = sentence_body(line)?;
        let fields: Vec<&str> = body.split(',').collect();
        let [_, count, number, sequence, _channel, payload, fill] = fields[..] else {
            return Err(ParseError::Envelope("expected 7 fields"));
        };

        let count: u8 = count
            .parse()
            .map_err(|_| ParseError::Envelope("bad fragment count"))?;
        let number: u8 = number
            .parse()
            .map_err(|_| ParseError::Envelope("bad fragment number"))?;
        if count == 0 || number == 0 || number > count {
            return Err(ParseError::Envelope("fragment number out of range"));
        }
        let fill_bits: u8 = fill
            .parse()
            .ok()
            .filter(|bits| *bits <= 5)
            .ok_or(ParseError::Envelope("bad fill bits"))?;
        if payload.is_empty() {
            return Err(ParseError::Envelope("empty payload"));
        }

        Ok(Self {
            count,
            number,
            sequence: sequence.to_string(),
            payload: payload.to_string(),
            fill_bits,
        })
    }

    /// Whether this sentence carries a whole message on its own.
    pub(super) fn is_complete(&self) -> bool {
        self.count == 1
    }

    pub(super) fn into_message(self) -> Result<Message, ParseError> {
        if !self.is_complete() {
            return Err(ParseError::Envelope("multi-sentence message"));
        }
        Ok(Message {
            payload: self.payload,
            fill_bits: self.fill_bits,
        })
    }
}

/// A complete armored payload, ready to decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Message {
    payload: String,
    fill_bits: u8,
}

/// Joins the sentences of a multi-sentence message.
///
/// Only one message is assembled at a time. A first part discards any
/// message still in progress; a part that doesn't continue the current
/// message is dropped.
#[derive(Debug, Default)]
pub(super) struct Reassembler {
    pending: Option<Pending>,
}

#[derive(Debug)]
struct Pending {
    sequence: String,
    count: u8,
    next: u8,
    payload: String,
}

impl Reassembler {
    /// Adds a fragment. Returns the message once its last part arrives.
    pub(super) fn push(&mut self, fragment: Fragment) -> Option<Message> {
        if fragment.is_complete() {
            return fragment.into_message().ok();
        }

        if fragment.number == 1 {
            if let Some(dropped) = self.pending.take() {
                debug!(
                    sequence = %dropped.sequence,
                    "dropping incomplete AIS message"
                );
            }
            self.pending = Some(Pending {
                sequence: fragment.sequence,
                count: fragment.count,
                next: 2,
                payload: fragment.payload,
            });
            return None;
        }

        match self.pending.take() {
            Some(mut pending)
                if pending.sequence == fragment.sequence
                    && pending.count == fragment.count
                    && pending.next == fragment.number =>
            {
                pending.payload.push_str(&fragment.payload);
                if fragment.number == fragment.count {
                    return Some(Message {
                        payload: pending.payload,
                        fill_bits: fragment.fill_bits,
                    });
                }
                pending.next += 1;
                self.pending = Some(pending);
                None
            }
            _ => {
                debug!(
                    sequence = %fragment.sequence,
                    number = fragment.number,
                    "dropping out-of-order AIS fragment"
                );
                None
            }
        }
    }
}

/// Decodes an armored payload into the fields we track.
pub(super) fn decode(message: &Message) -> Result<AisReport, ParseError> {
    let bits = Bits::unarmor(&message.payload, message.fill_bits)?;
    bits.require(0, 38)?;

    let message_type = bits.uint(0, 6) as u8;
    let mut report = AisReport {
        mmsi: bits.uint(8, 30),
        ..AisReport::default()
    };

    match message_type {
        1..=3 => {
            bits.require(message_type, 137)?;
            report.speed = speed(bits.uint(50, 10));
            report.position = position(bits.int(61, 28), bits.int(89, 27));
            report.course = course(bits.uint(116, 12));
            report.heading = heading(bits.uint(128, 9));
        }
        18 | 19 => {
            bits.require(message_type, if message_type == 19 { 263 } else { 133 })?;
            report.speed = speed(bits.uint(46, 10));
            report.position = position(bits.int(57, 28), bits.int(85, 27));
            report.course = course(bits.uint(112, 12));
            report.heading = heading(bits.uint(124, 9));
            if message_type == 19 {
                report.name = bits.text(143, 20);
            }
        }
        5 => {
            bits.require(message_type, 232)?;
            report.name = bits.text(112, 20);
        }
        24 => {
            bits.require(message_type, 40)?;
            // Part B carries call sign and dimensions, nothing we track.
            if bits.uint(38, 2) == 0 {
                bits.require(message_type, 160)?;
                report.name = bits.text(40, 20);
            }
        }
        other => return Err(ParseError::UnsupportedMessage(other)),
    }

    Ok(report)
}

/// Speed over ground in knots; 1023 means not available.
fn speed(raw: u32) -> Option<f64> {
    (raw < 1023).then(|| f64::from(raw) / 10.0)
}

/// Course over ground in degrees; 3600 means not available.
fn course(raw: u32) -> Option<f64> {
    (raw < 3600).then(|| f64::from(raw) / 10.0)
}

/// True heading in degrees; 511 means not available.
fn heading(raw: u32) -> Option<f64> {
    (raw < 360).then(|| f64::from(raw))
}

/// Position in 1/10000 minute; longitude 181 and latitude 91 mean not available.
fn position(lon: i32, lat: i32) -> Option<PositionFix> {
    let longitude = f64::from(lon) / 600_000.0;
    let latitude = f64::from(lat) / 600_000.0;
    if longitude.abs() > 180.0 || latitude.abs() > 90.0 {
        return None;
    }
    Some(PositionFix {
        latitude,
        longitude,
    })
}

/// A de-armored payload: one 6-bit value per payload character.
struct Bits {
    sixbits: Vec<u8>,
    len: usize,
}

impl Bits {
    fn unarmor(payload: &str, fill_bits: u8) -> Result<Self, ParseError> {
        let sixbits = payload
            .chars()
            .map(|c| match c {
                '0'..='W' => Ok(c as u8 - 48),
                '`'..='w' => Ok(c as u8 - 56),
                other => Err(ParseError::Armor(other)),
            })
            .collect::<Result<Vec<u8>, _>>()?;
        let len = (sixbits.len() * 6).saturating_sub(usize::from(fill_bits));
        Ok(Self { sixbits, len })
    }

    fn require(&self, message_type: u8, needed: usize) -> Result<(), ParseError> {
        if self.len < needed {
            return Err(ParseError::TooShort {
                message_type,
                needed,
                got: self.len,
            });
        }
        Ok(())
    }

    fn bit(&self, index: usize) -> bool {
        (self.sixbits[index / 6] >> (5 - index % 6)) & 1 == 1
    }

    fn uint(&self, start: usize, width: usize) -> u32 {
        (start..start + width).fold(0, |acc, i| (acc << 1) | u32::from(self.bit(i)))
    }

    /// Two's complement signed field.
    #[allow(clippy::cast_possible_wrap)]
    fn int(&self, start: usize, width: usize) -> i32 {
        let shift = 32 - width;
        ((self.uint(start, width) << shift) as i32) >> shift
    }

    /// Six-bit ASCII text, with `@` padding and trailing spaces removed.
    fn text(&self, start: usize, chars: usize) -> Option<String> {
        let text: String = (0..chars)
            .map(|i| {
                let value = self.uint(start + i * 6, 6) as u8;
                char::from(if value < 32 { value + 64 } else { value })
            })
            .collect();
        let text = text.trim_end_matches(['@', ' ']);
        (!text.is_empty()).then(|| text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_line(line: &str) -> Result<AisReport, ParseError> {
        decode(&Fragment::parse(line)?.into_message()?)
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn class_a_position_report() {
        let report = decode_line("!AIVDO,1,1,,,177KQJ5000G?tO`K>RA1wUbN0TKH,0*1C").unwrap();

        assert_eq!(report.mmsi, 477_553_000);
        assert_eq!(report.speed, Some(0.0));
        assert_eq!(report.course, Some(51.0));
        assert_eq!(report.heading, Some(181.0));
        assert_eq!(report.name, None);
        let fix = report.position.unwrap();
        assert_close(fix.latitude, 47.582_833_333);
        assert_close(fix.longitude, -122.345_833_333);
    }

    #[test]
    fn class_b_position_report() {
        let report = decode_line("!AIVDO,1,1,,,B52K>;h0Nnc>k25lNThih`000000,0*58").unwrap();

        assert_eq!(report.mmsi, 338_087_471);
        assert_eq!(report.speed, Some(12.3));
        assert_eq!(report.course, Some(79.6));
        assert_eq!(report.heading, Some(80.0));
        let fix = report.position.unwrap();
        assert_close(fix.latitude, 40.6845);
        assert_close(fix.longitude, -74.0721);
    }

    #[test]
    fn unavailable_fields_are_none() {
        let report = decode_line("!AIVDO,1,1,,,B52K>;h3wk?8mP=18D3Q3wP00000,0*25").unwrap();

        assert_eq!(report.mmsi, 338_087_471);
        assert_eq!(report.speed, None);
        assert_eq!(report.course, None);
        assert_eq!(report.heading, None);
        assert_eq!(report.position, None);
    }

    #[test]
    fn extended_class_b_carries_name() {
        let report = decode_line(
            "!AIVDO,1,1,,,C5N7KvP0=nc>k25lNTihQJP0V:30T2d:L0000000000000000000,0*72",
        )
        .unwrap();

        assert_eq!(report.mmsi, 367_123_450);
        assert_eq!(report.name.as_deref(), Some("SEA RAVEN"));
        assert_eq!(report.speed, Some(5.5));
        assert_eq!(report.course, Some(180.0));
        assert_eq!(report.heading, Some(181.0));
    }

    #[test]
    fn static_data_part_a_carries_name() {
        let report = decode_line("!AIVDO,1,1,,,H5N7KvQ<D6185HDp000000000000,0*03").unwrap();

        assert_eq!(report.mmsi, 367_123_450);
        assert_eq!(report.name.as_deref(), Some("SEA RAVEN"));
        assert_eq!(report.position, None);
    }

    #[test]
    fn static_data_part_b_has_no_name() {
        let report = decode_line("!AIVDO,1,1,,,H5N7KvTU00000000000000000000,0*5D").unwrap();

        assert_eq!(report.mmsi, 367_123_450);
        assert_eq!(report.name, None);
    }

    #[test]
    fn unsupported_message_type() {
        assert_eq!(
            decode_line("!AIVDO,1,1,,,403OviP000000000000000000000,0*62"),
            Err(ParseError::UnsupportedMessage(4))
        );
    }

    #[test]
    fn invalid_armor_character() {
        assert_eq!(
            decode_line("!AIVDO,1,1,,,17~KQJ5000G?tO`K>RA1wUbN0TKH,0"),
            Err(ParseError::Armor('~'))
        );
    }

    #[test]
    fn truncated_payload() {
        assert!(matches!(
            decode_line("!AIVDO,1,1,,,177KQJ5000G?tO,0"),
            Err(ParseError::TooShort {
                message_type: 1,
                ..
            })
        ));
    }

    #[test]
    fn malformed_envelopes() {
        assert_eq!(
            Fragment::parse("!AIVDO,1,1,,177KQJ5000G?tO`K>RA1wUbN0TKH,0"),
            Err(ParseError::Envelope("expected 7 fields"))
        );
        assert_eq!(
            Fragment::parse("!AIVDO,1,2,,,177KQJ5000G?tO`K>RA1wUbN0TKH,0"),
            Err(ParseError::Envelope("fragment number out of range"))
        );
        assert_eq!(
            Fragment::parse("!AIVDO,1,1,,,177KQJ5000G?tO`K>RA1wUbN0TKH,9"),
            Err(ParseError::Envelope("bad fill bits"))
        );
    }

    #[test]
    fn reassembler_restarts_on_new_first_part() {
        let first = Fragment::parse(
            "!AIVDO,2,1,3,,577KQJ02;H;p4i0P7404i0P61=@580000000000000000000000000000000,0*7E",
        )
        .unwrap();
        let second = Fragment::parse("!AIVDO,2,2,3,,00000000000,2*64").unwrap();

        let mut reassembler = Reassembler::default();
        assert!(reassembler.push(first.clone()).is_none());
        assert!(reassembler.push(first).is_none());

        let message = reassembler.push(second.clone()).unwrap();
        assert_eq!(message.fill_bits, 2);
        assert_eq!(decode(&message).unwrap().name.as_deref(), Some("ALPHA STAR"));

        // The message is consumed; a repeated last part is an orphan.
        assert!(reassembler.push(second).is_none());
    }

    #[test]
    fn reassembler_drops_mismatched_sequence() {
        let first = Fragment::parse(
            "!AIVDO,2,1,3,,577KQJ02;H;p4i0P7404i0P61=@580000000000000000000000000000000,0*7E",
        )
        .unwrap();
        let mut second = Fragment::parse("!AIVDO,2,2,3,,00000000000,2*64").unwrap();
        second.sequence = "4".into();

        let mut reassembler = Reassembler::default();
        assert!(reassembler.push(first).is_none());
        assert!(reassembler.push(second).is_none());
    }
}
