//! Timestamp epoch conversions.
//!
//! Containers in this suite carry timestamps against three different
//! epochs: classic Mac OS counts unsigned seconds from 1904-01-01 UTC,
//! Unix counts seconds (signed or unsigned depending on the field) from
//! 1970-01-01 UTC, and FAT packs a local date and time into two 16-bit
//! words with 2-second resolution.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Seconds between 1904-01-01T00:00:00Z and 1970-01-01T00:00:00Z.
pub const MAC_UNIX_EPOCH_DELTA: u64 = 2_082_844_800;

/// Unsigned seconds since the Mac epoch. Zero means "never set".
pub fn from_mac_seconds(secs: u32) -> Option<SystemTime> {
    if secs == 0 {
        return None;
    }
    let secs = u64::from(secs);
    if secs >= MAC_UNIX_EPOCH_DELTA {
        Some(UNIX_EPOCH + Duration::from_secs(secs - MAC_UNIX_EPOCH_DELTA))
    } else {
        Some(UNIX_EPOCH - Duration::from_secs(MAC_UNIX_EPOCH_DELTA - secs))
    }
}

/// Signed seconds since the Unix epoch.
pub fn from_unix_seconds_signed(secs: i64) -> SystemTime {
    if secs >= 0 {
        UNIX_EPOCH + Duration::from_secs(secs as u64)
    } else {
        UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs())
    }
}

/// Unsigned seconds since the Unix epoch. Zero means "never set".
pub fn from_unix_seconds(secs: u32) -> Option<SystemTime> {
    if secs == 0 {
        return None;
    }
    Some(UNIX_EPOCH + Duration::from_secs(u64::from(secs)))
}

/// FAT packed date and time words.
///
/// Date: bits 15..9 year since 1980, 8..5 month (1..12), 4..0 day (1..31).
/// Time: bits 15..11 hour, 10..5 minute, 4..0 seconds divided by two.
/// Out-of-range fields yield `None`; FAT stores local time, which is
/// interpreted here as UTC because the original zone is unrecoverable.
pub fn from_dos_datetime(date: u16, time: u16) -> Option<SystemTime> {
    let year = 1980 + i64::from(date >> 9);
    let month = u32::from((date >> 5) & 0x0F);
    let day = u32::from(date & 0x1F);
    let hour = u64::from(time >> 11);
    let minute = u64::from((time >> 5) & 0x3F);
    let second = u64::from((time & 0x1F) * 2);

    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    if hour > 23 || minute > 59 || second > 59 {
        return None;
    }

    let days = days_from_civil(year, month, day);
    let secs = days * 86_400 + (hour * 3_600 + minute * 60 + second) as i64;
    Some(from_unix_seconds_signed(secs))
}

/// Days from 1970-01-01 to the given civil date (proleptic Gregorian).
fn days_from_civil(y: i64, m: u32, d: u32) -> i64 {
    let y = if m <= 2 { y - 1 } else { y };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = (y - era * 400) as u64;
    let mp = (m as u64 + 9) % 12;
    let doy = (153 * mp + 2) / 5 + d as u64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe as i64 - 719_468
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unix_secs(t: SystemTime) -> i64 {
        match t.duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_secs() as i64,
            Err(e) => -(e.duration().as_secs() as i64),
        }
    }

    #[test]
    fn mac_epoch_delta() {
        // 1904-01-01 and 1970-01-01 are 24_107 days apart (17 leap years).
        assert_eq!(MAC_UNIX_EPOCH_DELTA, 24_107 * 86_400);
    }

    #[test]
    fn mac_seconds_straddle_the_unix_epoch() {
        let before = from_mac_seconds(1).unwrap();
        assert_eq!(unix_secs(before), 1 - MAC_UNIX_EPOCH_DELTA as i64);

        let after = from_mac_seconds(0xB2C4_E400).unwrap();
        assert_eq!(unix_secs(after), 916_534_144);

        assert_eq!(from_mac_seconds(0), None);
    }

    #[test]
    fn signed_unix_seconds() {
        assert_eq!(unix_secs(from_unix_seconds_signed(0)), 0);
        assert_eq!(unix_secs(from_unix_seconds_signed(-86_400)), -86_400);
        assert_eq!(
            unix_secs(from_unix_seconds_signed(1_000_000_000)),
            1_000_000_000
        );
    }

    #[test]
    fn dos_datetime_known_vector() {
        // 2000-03-01 12:30:06: year 20, month 3, day 1; 12h 30m 3*2s.
        let date = (20 << 9) | (3 << 5) | 1;
        let time = (12 << 11) | (30 << 5) | 3;
        let t = from_dos_datetime(date, time).unwrap();
        assert_eq!(unix_secs(t), 951_913_806);
    }

    #[test]
    fn dos_datetime_rejects_out_of_range_fields() {
        assert_eq!(from_dos_datetime(0, 0), None); // month 0, day 0
        let bad_month = (5 << 9) | (13 << 5) | 2;
        assert_eq!(from_dos_datetime(bad_month, 0), None);
        let ok_date = (5 << 9) | (6 << 5) | 2;
        let bad_hour = 24 << 11;
        assert_eq!(from_dos_datetime(ok_date, bad_hour), None);
    }
}
