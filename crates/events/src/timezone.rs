//! Presentation of UTC timestamps in the supported display zones.
//!
//! Each code names an IANA zone, so daylight saving time applies; the
//! rendered string keeps a locale-shaped date pattern and always ends with
//! the uppercased code (`15.07.2026, 14:00:00 CET`).

use std::str::FromStr;

use chrono::FixedOffset;
use chrono_tz::Tz;

use crate::{NotifyError, Timestamp};

/// A supported display zone, selected by a three-letter code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayZone {
    /// Central European (`Europe/Berlin`), `DD.MM.YYYY, HH:MM:SS`.
    #[default]
    Cet,
    /// Indian Standard (`Asia/Kolkata`), `DD/MM/YYYY, HH:MM:SS`.
    Ist,
    /// US Eastern (`America/New_York`), `MM/DD/YYYY, HH:MM:SS`.
    Est,
}

impl DisplayZone {
    /// Lowercase zone code.
    pub fn code(self) -> &'static str {
        match self {
            Self::Cet => "cet",
            Self::Ist => "ist",
            Self::Est => "est",
        }
    }

    /// IANA zone the code stands for.
    pub fn tz(self) -> Tz {
        match self {
            Self::Cet => chrono_tz::Europe::Berlin,
            Self::Ist => chrono_tz::Asia::Kolkata,
            Self::Est => chrono_tz::America::New_York,
        }
    }

    fn pattern(self) -> &'static str {
        match self {
            Self::Cet => "%d.%m.%Y, %H:%M:%S",
            Self::Ist => "%d/%m/%Y, %H:%M:%S",
            Self::Est => "%m/%d/%Y, %H:%M:%S",
        }
    }

    /// Renders `timestamp` as wall-clock time in this zone.
    pub fn format(self, timestamp: Timestamp) -> String {
        let local = timestamp.as_datetime().with_timezone(&self.tz());
        format!(
            "{} {}",
            local.format(self.pattern()),
            self.code().to_uppercase()
        )
    }
}

impl FromStr for DisplayZone {
    type Err = NotifyError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        match code.to_ascii_lowercase().as_str() {
            "cet" => Ok(Self::Cet),
            "ist" => Ok(Self::Ist),
            "est" => Ok(Self::Est),
            _ => Err(NotifyError::configuration(format!(
                "unsupported timezone '{code}'; use cet, ist, or est"
            ))),
        }
    }
}

impl std::fmt::Display for DisplayZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Renders `timestamp` in the zone named by `code` (case-insensitive).
///
/// # Errors
///
/// [`NotifyError::Configuration`] if `code` is not `cet`, `ist`, or `est`.
pub fn convert_utc(timestamp: Timestamp, code: &str) -> Result<String, NotifyError> {
    Ok(code.parse::<DisplayZone>()?.format(timestamp))
}

/// Renders `timestamp` shifted by an explicit `±HH:MM` offset as
/// `YYYY-MM-DD HH:MM:SS UTC±HH:MM`.
///
/// # Errors
///
/// [`NotifyError::Configuration`] if `offset` is not of the form `+05:30` or
/// `-04:00`.
pub fn convert_with_offset(timestamp: Timestamp, offset: &str) -> Result<String, NotifyError> {
    let fixed = parse_offset(offset).ok_or_else(|| {
        NotifyError::configuration(format!(
            "invalid UTC offset '{offset}'; use a format like +05:30 or -04:00"
        ))
    })?;
    let local = timestamp.as_datetime().with_timezone(&fixed);
    Ok(format!("{} UTC{offset}", local.format("%Y-%m-%d %H:%M:%S")))
}

/// Accepts exactly `±HH:MM`; chrono alone would also take `+0530` or `+05`.
fn parse_offset(offset: &str) -> Option<FixedOffset> {
    let bytes = offset.as_bytes();
    let shaped = bytes.len() == 6
        && matches!(bytes[0], b'+' | b'-')
        && bytes[3] == b':'
        && [1, 2, 4, 5].iter().all(|&i| bytes[i].is_ascii_digit());
    if !shaped {
        return None;
    }
    offset.parse::<FixedOffset>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(text: &str) -> Timestamp {
        Timestamp::parse_rfc3339(text).unwrap()
    }

    fn noon() -> Timestamp {
        at("2026-10-18T12:00:00.000Z")
    }

    #[test]
    fn supported_codes_render_with_uppercase_suffix() {
        assert_eq!(convert_utc(noon(), "cet").unwrap(), "18.10.2026, 14:00:00 CET");
        assert_eq!(convert_utc(noon(), "ist").unwrap(), "18/10/2026, 17:30:00 IST");
        assert_eq!(convert_utc(noon(), "est").unwrap(), "10/18/2026, 08:00:00 EST");
    }

    #[test]
    fn summer_time_applies_in_july() {
        let july = at("2026-07-15T12:00:00Z");
        assert_eq!(convert_utc(july, "cet").unwrap(), "15.07.2026, 14:00:00 CET");
        assert_eq!(convert_utc(july, "est").unwrap(), "07/15/2026, 08:00:00 EST");
    }

    #[test]
    fn standard_time_applies_in_january() {
        let january = at("2026-01-15T12:00:00Z");
        assert_eq!(convert_utc(january, "cet").unwrap(), "15.01.2026, 13:00:00 CET");
        assert_eq!(convert_utc(january, "est").unwrap(), "01/15/2026, 07:00:00 EST");
    }

    #[test]
    fn india_has_no_daylight_saving() {
        assert_eq!(
            convert_utc(at("2026-07-15T12:00:00Z"), "ist").unwrap(),
            "15/07/2026, 17:30:00 IST"
        );
        assert_eq!(
            convert_utc(at("2026-01-15T12:00:00Z"), "ist").unwrap(),
            "15/01/2026, 17:30:00 IST"
        );
    }

    #[test]
    fn codes_are_case_insensitive() {
        assert!(convert_utc(noon(), "IST").unwrap().ends_with(" IST"));
        assert_eq!("Est".parse::<DisplayZone>().unwrap(), DisplayZone::Est);
    }

    #[test]
    fn unsupported_code_is_a_configuration_error() {
        let err = convert_utc(noon(), "pst").unwrap_err();
        assert!(matches!(err, NotifyError::Configuration { .. }));
    }

    #[test]
    fn default_zone_is_central_european() {
        assert_eq!(DisplayZone::default(), DisplayZone::Cet);
    }

    #[test]
    fn conversion_crosses_date_boundary() {
        let late = at("2026-12-31T23:30:00Z");
        assert_eq!(DisplayZone::Cet.format(late), "01.01.2027, 00:30:00 CET");
    }

    #[test]
    fn explicit_offsets_shift_and_label() {
        assert_eq!(
            convert_with_offset(noon(), "+05:30").unwrap(),
            "2026-10-18 17:30:00 UTC+05:30"
        );
        assert_eq!(
            convert_with_offset(noon(), "-04:00").unwrap(),
            "2026-10-18 08:00:00 UTC-04:00"
        );
    }

    #[test]
    fn malformed_offsets_are_rejected() {
        for bad in ["05:30", "+5:30", "+05-30", "+0a:00", "+0530", ""] {
            assert!(convert_with_offset(noon(), bad).is_err(), "{bad}");
        }
    }
}
