//! Minute/second/frame addressing.
//!
//! CDs address sectors at 75 frames per second with a 2-second pregap:
//! LBA 0 is MSF 00:02:00. Hour digits appear in multi-hour DDCD-style
//! TOCs, carried in the high nibble of a TOC entry's Zero byte.

pub const FRAMES_PER_SECOND: i64 = 75;
pub const PREGAP_FRAMES: i64 = 2 * FRAMES_PER_SECOND;

/// `(hour, minute, second, frame)` to LBA. MSF 00:02:00 maps to LBA 0;
/// addresses inside the pregap come out negative.
pub fn msf_to_lba(hour: u8, minute: u8, second: u8, frame: u8) -> i64 {
    i64::from(hour) * 60 * 60 * FRAMES_PER_SECOND
        + i64::from(minute) * 60 * FRAMES_PER_SECOND
        + i64::from(second) * FRAMES_PER_SECOND
        + i64::from(frame)
        - PREGAP_FRAMES
}

/// LBA back to `(hour, minute, second, frame)`.
pub fn lba_to_msf(lba: i64) -> (u8, u8, u8, u8) {
    let total = lba + PREGAP_FRAMES;
    let frames_per_hour = 60 * 60 * FRAMES_PER_SECOND;
    let hour = total / frames_per_hour;
    let rem = total % frames_per_hour;
    let minute = rem / (60 * FRAMES_PER_SECOND);
    let rem = rem % (60 * FRAMES_PER_SECOND);
    let second = rem / FRAMES_PER_SECOND;
    let frame = rem % FRAMES_PER_SECOND;
    (hour as u8, minute as u8, second as u8, frame as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_addresses() {
        assert_eq!(msf_to_lba(0, 0, 2, 0), 0);
        assert_eq!(msf_to_lba(0, 0, 0, 0), -150);
        assert_eq!(msf_to_lba(0, 2, 0, 0), 8850);
        assert_eq!(msf_to_lba(0, 74, 59, 74), 337_274);
        assert_eq!(lba_to_msf(0), (0, 0, 2, 0));
        assert_eq!(lba_to_msf(150), (0, 0, 4, 0));
    }

    proptest! {
        #[test]
        fn round_trip(h in 0u8..2, m in 0u8..60, s in 0u8..60, f in 0u8..75) {
            let lba = msf_to_lba(h, m, s, f);
            prop_assert_eq!(lba_to_msf(lba), (h, m, s, f));
        }
    }
}
