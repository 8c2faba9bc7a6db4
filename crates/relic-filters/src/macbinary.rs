//! MacBinary container unwrapping.
//!
//! MacBinary ships a Mac file as a 128-byte header followed by the data
//! fork and then the resource fork, each padded to a 128-byte boundary.
//! There is no magic number; detection is structural, per the MacBinary II
//! rules: three header bytes that must be zero, a sane filename length,
//! fork lengths that fit the artifact, and (when present) the version
//! bytes 129/130 at offsets 122/123.

use relic_util::dates;
use relic_util::endian::{be_u16, be_u32};

use crate::filter::{ContainerLayout, ForkWindow};
use crate::source::FilterSource;
use crate::{FilterError, Result};

const HEADER_LEN: u64 = 128;
/// Fork lengths beyond this are not representable in classic Mac OS.
const MAX_FORK_LEN: u32 = 0x007F_FFFF;

struct Header {
    data_len: u32,
    resource_len: u32,
    secondary_len: u16,
    creation: u32,
    modification: u32,
}

fn parse_header(raw: &[u8; 128]) -> Option<Header> {
    if raw[0] != 0 || raw[74] != 0 || raw[82] != 0 {
        return None;
    }
    let name_len = raw[1];
    if !(1..=63).contains(&name_len) {
        return None;
    }
    let data_len = be_u32(&raw[83..87]);
    let resource_len = be_u32(&raw[87..91]);
    if data_len > MAX_FORK_LEN || resource_len > MAX_FORK_LEN {
        return None;
    }
    // MacBinary II carries version bytes; original MacBinary leaves them 0.
    let version = raw[122];
    let min_version = raw[123];
    if version != 0 && (!(129..=130).contains(&version) || min_version > version) {
        return None;
    }
    Some(Header {
        data_len,
        resource_len,
        secondary_len: be_u16(&raw[120..122]),
        creation: be_u32(&raw[91..95]),
        modification: be_u32(&raw[95..99]),
    })
}

fn pad128(len: u64) -> u64 {
    len.div_ceil(HEADER_LEN) * HEADER_LEN
}

/// Structural sniff for a MacBinary wrapper.
pub fn is_macbinary(source: &mut dyn FilterSource) -> bool {
    probe_header(source).is_some()
}

fn probe_header(source: &mut dyn FilterSource) -> Option<(Header, u64)> {
    let total = source.len().ok()?;
    if total < HEADER_LEN {
        return None;
    }
    let mut raw = [0u8; 128];
    source.read_at(0, &mut raw).ok()?;
    let header = parse_header(&raw)?;

    let data_start = HEADER_LEN + pad128(u64::from(header.secondary_len));
    // The resource fork begins on the 128-byte boundary after the data fork.
    let min_total = if header.resource_len > 0 {
        data_start + pad128(u64::from(header.data_len)) + u64::from(header.resource_len)
    } else {
        data_start + u64::from(header.data_len)
    };
    if min_total > total {
        return None;
    }
    // An empty wrapper (both forks zero) is indistinguishable from 128
    // arbitrary bytes; require some payload.
    if header.data_len == 0 && header.resource_len == 0 {
        return None;
    }
    Some((header, data_start))
}

pub(crate) fn probe(source: &mut dyn FilterSource) -> Result<Option<ContainerLayout>> {
    let Some((header, data_start)) = probe_header(source) else {
        return Ok(None);
    };

    let resource_start = data_start
        .checked_add(pad128(u64::from(header.data_len)))
        .ok_or(FilterError::OffsetOverflow)?;

    let resource = if header.resource_len > 0 {
        Some(ForkWindow {
            offset: resource_start,
            len: u64::from(header.resource_len),
        })
    } else {
        None
    };

    Ok(Some(ContainerLayout {
        data: ForkWindow {
            offset: data_start,
            len: u64::from(header.data_len),
        },
        resource,
        creation_time: dates::from_mac_seconds(header.creation),
        last_write_time: dates::from_mac_seconds(header.modification),
    }))
}
