//! CD-ROM error detection code.
//!
//! Data sectors carry a 32-bit EDC over a mode-dependent span, computed
//! with the reflected polynomial 0xD8018001 and stored little-endian.
//! This is the check `verify_sector` uses; full Reed-Solomon ECC repair
//! belongs to drive firmware, not image decoders.

use std::sync::OnceLock;

use relic_util::endian::le_u32;

use crate::track::TrackType;

const POLY: u32 = 0xD801_8001;

fn table() -> &'static [u32; 256] {
    static TABLE: OnceLock<[u32; 256]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0u32; 256];
        for (i, slot) in table.iter_mut().enumerate() {
            let mut value = i as u32;
            for _ in 0..8 {
                let carry = value & 1;
                value >>= 1;
                if carry != 0 {
                    value ^= POLY;
                }
            }
            *slot = value;
        }
        table
    })
}

pub fn compute_edc(data: &[u8]) -> u32 {
    let table = table();
    data.iter().fold(0u32, |edc, &byte| {
        (edc >> 8) ^ table[((edc ^ u32::from(byte)) & 0xFF) as usize]
    })
}

/// Check the EDC of one raw 2352-byte record.
///
/// Returns `None` when the track type carries no checkable EDC (audio,
/// formless Mode 2) or when a Form 2 sector left the optional EDC zero.
pub fn verify_record(record: &[u8], track_type: TrackType) -> Option<bool> {
    if record.len() < 2352 {
        return None;
    }
    let (span, stored_at) = match track_type {
        TrackType::CdMode1 => (0..2064, 2064),
        TrackType::CdMode2Form1 => (16..2072, 2072),
        TrackType::CdMode2Form2 => (16..2348, 2348),
        _ => return None,
    };
    let stored = le_u32(&record[stored_at..stored_at + 4]);
    if track_type == TrackType::CdMode2Form2 && stored == 0 {
        // Form 2 EDC is optional; zero means "not recorded".
        return None;
    }
    Some(compute_edc(&record[span]) == stored)
}
