//! The image contract of the relic suite.
//!
//! A container decoder turns an opened [`relic_filters::Filter`] into a
//! logical sector/track view. This crate defines the surface those
//! decoders implement and the vocabulary they share:
//!
//! - [`BaseImage`]: the uniform capability trait (info, sector reads,
//!   tag reads, verification); operations a format cannot support
//!   default to [`ImageError::FeatureNotImplemented`]
//! - [`OpticalImage`] / [`TapeImage`]: per-role extensions for
//!   track/session-structured optical media and file/block-structured
//!   tape media
//! - the metadata model: [`ImageInfo`], [`Track`], [`Session`],
//!   [`Partition`], sector-tag and media-tag kinds with their raw-sector
//!   layout table
//! - CD primitives: MSF addressing, the ECMA-130 descrambler, full-TOC
//!   serialization and EDC verification

mod error;
mod image;
mod info;
mod tags;
mod tape;
mod track;

pub mod edc;
pub mod msf;
pub mod scramble;
pub mod toc;

pub use error::{ImageError, ImageResult};
pub use image::{BaseImage, OpticalImage, VerifyOutcome};
pub use info::{Geometry, ImageInfo, MediaType, XmlMediaType};
pub use tags::{MediaTagKind, SectorTagKind, TagLayout, tag_layout};
pub use tape::{TapeFile, TapeImage};
pub use track::{Partition, Session, SubchannelKind, Track, TrackType};

/// Raw bytes in one CD sector (sync + header + payload + EDC/ECC).
pub const RAW_SECTOR_SIZE: usize = 2352;
/// Subchannel bytes accompanying one CD sector.
pub const SUBCHANNEL_SIZE: usize = 96;
/// The sync mark opening every raw data sector.
pub const CD_SYNC_PATTERN: [u8; 12] = [
    0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00,
];
