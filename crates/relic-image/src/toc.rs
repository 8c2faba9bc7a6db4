//! Reconstructed CD table of contents.
//!
//! Descriptor-based image formats carry the TOC as text or scattered
//! fields; the contract re-serializes it into the canonical binary block
//! a drive returns for READ TOC/PMA/ATIP format 2 (full TOC): a
//! big-endian length word, first and last session numbers, then 11-byte
//! descriptors.

/// One raw TOC descriptor.
///
/// `zero` carries the hour digits of multi-hour discs: HOUR in the high
/// nibble, PHOUR in the low nibble.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TocEntry {
    pub session: u8,
    pub adr: u8,
    pub control: u8,
    pub tno: u8,
    pub point: u8,
    pub min: u8,
    pub sec: u8,
    pub frame: u8,
    pub zero: u8,
    pub pmin: u8,
    pub psec: u8,
    pub pframe: u8,
}

impl TocEntry {
    pub fn hour(&self) -> u8 {
        self.zero >> 4
    }

    pub fn phour(&self) -> u8 {
        self.zero & 0x0F
    }
}

/// Serialize entries into the canonical full-TOC block.
///
/// Layout: `u16 BE data_length | first_session | last_session |
/// entries * 11 bytes`, with `data_length = entries * 11 + 2`.
pub fn build_full_toc(entries: &[TocEntry]) -> Vec<u8> {
    let first_session = entries.iter().map(|e| e.session).min().unwrap_or(0);
    let last_session = entries.iter().map(|e| e.session).max().unwrap_or(0);

    let data_length = entries.len() * 11 + 2;
    let mut out = Vec::with_capacity(data_length + 2);
    out.extend_from_slice(&(data_length as u16).to_be_bytes());
    out.push(first_session);
    out.push(last_session);

    for entry in entries {
        out.push(entry.session);
        out.push((entry.adr << 4) | (entry.control & 0x0F));
        out.push(entry.tno);
        out.push(entry.point);
        out.push(entry.min);
        out.push(entry.sec);
        out.push(entry.frame);
        out.push(entry.zero);
        out.push(entry.pmin);
        out.push(entry.psec);
        out.push(entry.pframe);
    }
    out
}
