//! NMEA-0183 heading and position sentences.

use crate::model::{ParseError, PositionFix};

/// The position sentences we read, and where their coordinates sit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum PositionSentence {
    /// `RMC,time,status,lat,N,lon,E,...`
    Rmc,
    /// `GGA,time,lat,N,lon,E,...`
    Gga,
    /// `GLL,lat,N,lon,E,...`
    Gll,
}

impl PositionSentence {
    fn latitude_field(self) -> usize {
        match self {
            Self::Rmc => 3,
            Self::Gga => 2,
            Self::Gll => 1,
        }
    }
}

/// Strips the leading `$`/`!` and the trailing checksum.
///
/// A two-hex-digit checksum is verified. A missing checksum, or a
/// placeholder such as `*hh`, is not.
pub(super) fn sentence_body(line: &str) -> Result<&str, ParseError> {
    let line = line.strip_prefix(|c| c == '$' || c == '!').unwrap_or(line);
    let Some((body, checksum)) = line.rsplit_once('*') else {
        return Ok(line);
    };

    let checksum = checksum.trim();
    if checksum.len() == 2 && checksum.bytes().all(|b| b.is_ascii_hexdigit()) {
        let expected = u8::from_str_radix(checksum, 16).unwrap_or_default();
        let computed = body.bytes().fold(0, |acc, b| acc ^ b);
        if expected != computed {
            return Err(ParseError::Checksum { expected, computed });
        }
    }
    Ok(body)
}

/// Parses `HDT`/`HDG`: the heading is field 1.
pub(super) fn parse_heading(line: &str) -> Result<f64, ParseError> {
    let body = sentence_body(line)?;
    let fields: Vec<&str> = body.split(',').collect();

    let heading = number(&fields, 1)?;
    if !(0.0..360.0).contains(&heading) {
        return Err(ParseError::HeadingOutOfRange(heading));
    }
    // `-0.0` is inside the range; store it as `0.0`.
    Ok(heading + 0.0)
}

/// Parses the latitude and longitude of an `RMC`, `GGA` or `GLL` sentence.
pub(super) fn parse_position(line: &str, kind: PositionSentence) -> Result<PositionFix, ParseError> {
    let body = sentence_body(line)?;
    let fields: Vec<&str> = body.split(',').collect();

    let lat_at = kind.latitude_field();
    let lon_at = lat_at + 2;
    let present = |i: usize| fields.get(i).is_some_and(|f| !f.is_empty());
    if !present(lat_at) || !present(lon_at) {
        return Err(ParseError::NoFix);
    }

    let latitude = coordinate(&fields, lat_at, ('N', 'S'), 90.0)?;
    let longitude = coordinate(&fields, lon_at, ('E', 'W'), 180.0)?;
    Ok(PositionFix {
        latitude,
        longitude,
    })
}

/// Reads a numeric field. Empty fields count as missing.
fn number(fields: &[&str], index: usize) -> Result<f64, ParseError> {
    let value = fields
        .get(index)
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .ok_or(ParseError::MissingField(index))?;
    value.parse().map_err(|_| ParseError::NotANumber {
        field: index,
        value: value.to_string(),
    })
}

/// Converts `(d)ddmm.mmmm` at `index` plus the hemisphere after it to signed degrees.
fn coordinate(
    fields: &[&str],
    index: usize,
    (positive, negative): (char, char),
    limit: f64,
) -> Result<f64, ParseError> {
    let raw = number(fields, index)?;
    let degrees = (raw / 100.0).trunc();
    let minutes = raw - degrees * 100.0;
    let magnitude = degrees + minutes / 60.0;
    if !(0.0..=limit).contains(&magnitude) {
        return Err(ParseError::CoordinateOutOfRange(magnitude));
    }

    let hemisphere = fields.get(index + 1).copied().unwrap_or_default();
    let mut chars = hemisphere.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c == positive => Ok(magnitude),
        (Some(c), None) if c == negative => Ok(-magnitude),
        _ => Err(ParseError::Hemisphere(hemisphere.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_strips_start_marker_and_checksum() {
        assert_eq!(sentence_body("$HEHDT,087.6,T*26"), Ok("HEHDT,087.6,T"));
        assert_eq!(
            sentence_body("!AIVDO,1,1,,,177KQJ5000G?tO`K>RA1wUbN0TKH,0*1C"),
            Ok("AIVDO,1,1,,,177KQJ5000G?tO`K>RA1wUbN0TKH,0")
        );
    }

    #[test]
    fn lowercase_hex_checksum_is_verified() {
        assert_eq!(
            sentence_body("$GPGLL,4916.45,N,12311.12,W,225444,A*31"),
            Ok("GPGLL,4916.45,N,12311.12,W,225444,A")
        );
        assert!(sentence_body("$HEHDG,101.1,,,7.1,W*3a").is_ok());
    }

    #[test]
    fn negative_zero_heading_is_normalized() {
        let heading = parse_heading("$HEHDT,-0.0,T").unwrap();
        assert_eq!(heading, 0.0);
        assert!(heading.is_sign_positive());
    }

    #[test]
    fn coordinate_beyond_limit_is_rejected() {
        let fields = ["GLL", "9130.00", "N"];
        assert!(matches!(
            coordinate(&fields, 1, ('N', 'S'), 90.0),
            Err(ParseError::CoordinateOutOfRange(_))
        ));
    }

    #[test]
    fn missing_hemisphere_is_rejected() {
        let fields = ["GLL", "4916.45"];
        assert_eq!(
            coordinate(&fields, 1, ('N', 'S'), 90.0),
            Err(ParseError::Hemisphere(String::new()))
        );
    }
}
