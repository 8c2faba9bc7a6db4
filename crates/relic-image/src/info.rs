use std::time::SystemTime;

use crate::tags::{MediaTagKind, SectorTagKind};

/// Physical media the image claims to describe.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MediaType {
    /// Mixed or unclassified Compact Disc.
    Cd,
    CdRom,
    CdRomXa,
    /// Multi-session mixed-mode disc (audio first session, data later).
    CdPlus,
    CdDa,
    CdR,
    CdRw,
    DvdRom,
    DvdPlusR,
    GenericHdd,
    Floppy35Dd,
    Floppy35Hd,
    Floppy525Dd,
    Floppy525Hd,
    Unknown,
}

/// Coarse media category used by metadata sidecars.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum XmlMediaType {
    OpticalDisc,
    BlockMedia,
    LinearMedia,
    Tape,
}

/// Cylinder/head/sector geometry for block media.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Geometry {
    pub cylinders: u32,
    pub heads: u32,
    pub sectors_per_track: u32,
}

/// Everything known about an opened image, populated by `open`.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageInfo {
    pub sectors: u64,
    /// Largest effective sector size in the image, in bytes.
    pub sector_size: u32,
    pub media_type: MediaType,
    pub xml_media_type: XmlMediaType,
    /// Size of the on-disk representation, in bytes.
    pub image_size: u64,

    pub application: Option<String>,
    pub application_version: Option<String>,
    pub creator: Option<String>,
    pub creation_time: Option<SystemTime>,
    pub last_modification_time: Option<SystemTime>,

    pub drive_manufacturer: Option<String>,
    pub drive_model: Option<String>,
    pub drive_serial_number: Option<String>,
    pub media_manufacturer: Option<String>,
    pub media_model: Option<String>,
    pub media_serial_number: Option<String>,
    pub media_barcode: Option<String>,
    /// Media Catalogue Number (CD `CATALOG`).
    pub media_catalogue_number: Option<String>,

    pub readable_sector_tags: Vec<SectorTagKind>,
    pub readable_media_tags: Vec<MediaTagKind>,

    pub geometry: Option<Geometry>,
}

impl Default for ImageInfo {
    fn default() -> Self {
        Self {
            sectors: 0,
            sector_size: 0,
            media_type: MediaType::Unknown,
            xml_media_type: XmlMediaType::BlockMedia,
            image_size: 0,
            application: None,
            application_version: None,
            creator: None,
            creation_time: None,
            last_modification_time: None,
            drive_manufacturer: None,
            drive_model: None,
            drive_serial_number: None,
            media_manufacturer: None,
            media_model: None,
            media_serial_number: None,
            media_barcode: None,
            media_catalogue_number: None,
            readable_sector_tags: Vec::new(),
            readable_media_tags: Vec::new(),
            geometry: None,
        }
    }
}
