//! AppleSingle container unwrapping.
//!
//! AppleSingle flattens a classic Mac file (data fork, resource fork,
//! Finder metadata, dates) into one file: a big-endian header, a 16-byte
//! space-padded home-filesystem tag, and an entry table of
//! `{id, offset, length}` records pointing at the payload blobs.
//!
//! Timestamp entries differ by id: FileDates (8) is signed seconds from
//! the Unix epoch, the Mac and ProDOS file-info entries (10, 11) are
//! unsigned seconds from the Mac epoch, and the version-1 FileInfo entry
//! (7) has a layout selected by the home-filesystem tag.

use relic_util::dates;
use relic_util::endian::{be_u16, be_u32};

use crate::filter::{ContainerLayout, ForkWindow};
use crate::source::FilterSource;
use crate::{FilterError, Result};

const MAGIC: u32 = 0x0005_1600;
const VERSION_1: u32 = 0x0001_0000;
const VERSION_2: u32 = 0x0002_0000;

const ENTRY_DATA_FORK: u32 = 1;
const ENTRY_RESOURCE_FORK: u32 = 2;
const ENTRY_FILE_INFO: u32 = 7;
const ENTRY_FILE_DATES: u32 = 8;
const ENTRY_MAC_FILE_INFO: u32 = 10;
const ENTRY_PRODOS_FILE_INFO: u32 = 11;
const ENTRY_DOS_FILE_INFO: u32 = 12;

/// Cheap sniff: does the artifact start with an AppleSingle header?
pub fn is_applesingle(source: &mut dyn FilterSource) -> bool {
    let mut head = [0u8; 8];
    if source.read_at(0, &mut head).is_err() {
        return false;
    }
    let version = be_u32(&head[4..8]);
    be_u32(&head[0..4]) == MAGIC && (version == VERSION_1 || version == VERSION_2)
}

pub(crate) fn probe(source: &mut dyn FilterSource) -> Result<Option<ContainerLayout>> {
    if !is_applesingle(source) {
        return Ok(None);
    }
    let total = source.len()?;

    // magic + version + home-filesystem tag + entry count
    let mut fixed = [0u8; 26];
    source
        .read_at(0, &mut fixed)
        .map_err(|_| FilterError::CorruptContainer("AppleSingle header truncated"))?;
    let home_fs: [u8; 16] = fixed[8..24].try_into().expect("slice is 16 bytes");
    let entry_count = be_u16(&fixed[24..26]);

    let table_len = usize::from(entry_count) * 12;
    let mut table = vec![0u8; table_len];
    source
        .read_at(26, &mut table)
        .map_err(|_| FilterError::CorruptContainer("AppleSingle entry table truncated"))?;

    let mut layout = ContainerLayout {
        data: ForkWindow { offset: 0, len: 0 },
        resource: None,
        creation_time: None,
        last_write_time: None,
    };
    let mut saw_data_fork = false;

    for entry in table.chunks_exact(12) {
        let id = be_u32(&entry[0..4]);
        let offset = u64::from(be_u32(&entry[4..8]));
        let length = u64::from(be_u32(&entry[8..12]));

        let end = offset
            .checked_add(length)
            .ok_or(FilterError::OffsetOverflow)?;
        if end > total {
            return Err(FilterError::CorruptContainer(
                "AppleSingle entry exceeds container",
            ));
        }

        match id {
            ENTRY_DATA_FORK => {
                layout.data = ForkWindow {
                    offset,
                    len: length,
                };
                saw_data_fork = true;
            }
            ENTRY_RESOURCE_FORK => {
                layout.resource = Some(ForkWindow {
                    offset,
                    len: length,
                });
            }
            ENTRY_FILE_INFO => decode_file_info(source, &home_fs, offset, length, &mut layout)?,
            ENTRY_FILE_DATES => {
                if length >= 8 {
                    let mut buf = [0u8; 8];
                    source.read_at(offset, &mut buf)?;
                    let create = be_u32(&buf[0..4]) as i32;
                    let modify = be_u32(&buf[4..8]) as i32;
                    layout.creation_time = Some(dates::from_unix_seconds_signed(create.into()));
                    layout.last_write_time = Some(dates::from_unix_seconds_signed(modify.into()));
                }
            }
            ENTRY_MAC_FILE_INFO | ENTRY_PRODOS_FILE_INFO => {
                if length >= 8 {
                    let mut buf = [0u8; 8];
                    source.read_at(offset, &mut buf)?;
                    layout.creation_time = dates::from_mac_seconds(be_u32(&buf[0..4]));
                    layout.last_write_time = dates::from_mac_seconds(be_u32(&buf[4..8]));
                }
            }
            ENTRY_DOS_FILE_INFO => {
                if length >= 4 {
                    let mut buf = [0u8; 4];
                    source.read_at(offset, &mut buf)?;
                    layout.last_write_time =
                        dates::from_dos_datetime(be_u16(&buf[0..2]), be_u16(&buf[2..4]));
                }
            }
            other => {
                log::debug!("AppleSingle: ignoring entry id {other}");
            }
        }
    }

    if !saw_data_fork {
        return Err(FilterError::CorruptContainer(
            "AppleSingle container has no data fork entry",
        ));
    }

    Ok(Some(layout))
}

/// Version-1 FileInfo: layout dispatched by the home-filesystem tag.
fn decode_file_info(
    source: &mut dyn FilterSource,
    home_fs: &[u8; 16],
    offset: u64,
    length: u64,
    layout: &mut ContainerLayout,
) -> Result<()> {
    let tag = std::str::from_utf8(home_fs)
        .unwrap_or("")
        .trim_end_matches(' ');
    match tag {
        "Macintosh" | "ProDOS" => {
            if length >= 8 {
                let mut buf = [0u8; 8];
                source.read_at(offset, &mut buf)?;
                layout.creation_time = dates::from_mac_seconds(be_u32(&buf[0..4]));
                layout.last_write_time = dates::from_mac_seconds(be_u32(&buf[4..8]));
            }
        }
        "MS-DOS" => {
            if length >= 4 {
                let mut buf = [0u8; 4];
                source.read_at(offset, &mut buf)?;
                layout.last_write_time =
                    dates::from_dos_datetime(be_u16(&buf[0..2]), be_u16(&buf[2..4]));
            }
        }
        "Unix" => {
            if length >= 12 {
                let mut buf = [0u8; 12];
                source.read_at(offset, &mut buf)?;
                // create, access, modify
                layout.creation_time = dates::from_unix_seconds(be_u32(&buf[0..4]));
                layout.last_write_time = dates::from_unix_seconds(be_u32(&buf[8..12]));
            }
        }
        other => {
            log::debug!("AppleSingle: unknown home filesystem {other:?}");
        }
    }
    Ok(())
}
