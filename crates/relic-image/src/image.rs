use crate::error::{ImageError, ImageResult};
use crate::info::ImageInfo;
use crate::tags::{MediaTagKind, SectorTagKind};
use crate::track::{Partition, Session, Track};

/// Outcome of verifying a sector range.
///
/// `status` folds the per-sector results: `Some(true)` when every
/// checkable sector passed, `Some(false)` when at least one failed,
/// `None` when nothing in the range carries a checksum.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VerifyOutcome {
    pub status: Option<bool>,
    pub failing: Vec<u64>,
    pub unknown: Vec<u64>,
}

/// Uniform capability surface of every opened image.
///
/// All reads are synchronous and the handle is single-owner: callers
/// serialize access, and cache state after a call is a deterministic
/// function of the state before it. Operations a format cannot support
/// keep their default body and surface `FeatureNotImplemented`.
pub trait BaseImage {
    fn info(&self) -> &ImageInfo;

    /// Effective-size bytes of the sector at `lba`.
    fn read_sector(&mut self, lba: u64) -> ImageResult<Vec<u8>>;

    /// `count` consecutive sectors starting at `lba`, in ascending order.
    fn read_sectors(&mut self, lba: u64, count: u32) -> ImageResult<Vec<u8>>;

    /// The raw on-media record of the sector (2352 bytes for CD).
    fn read_sector_long(&mut self, _lba: u64) -> ImageResult<Vec<u8>> {
        Err(ImageError::FeatureNotImplemented("raw sector reads"))
    }

    fn read_sectors_long(&mut self, _lba: u64, _count: u32) -> ImageResult<Vec<u8>> {
        Err(ImageError::FeatureNotImplemented("raw sector reads"))
    }

    /// A named subregion of the sector's raw record.
    fn read_sector_tag(&mut self, _lba: u64, _tag: SectorTagKind) -> ImageResult<Vec<u8>> {
        Err(ImageError::FeatureNotImplemented("sector tags"))
    }

    fn read_sectors_tag(
        &mut self,
        _lba: u64,
        _count: u32,
        _tag: SectorTagKind,
    ) -> ImageResult<Vec<u8>> {
        Err(ImageError::FeatureNotImplemented("sector tags"))
    }

    /// A disc-wide metadata blob (full TOC, CD-Text, ...).
    fn read_media_tag(&mut self, _tag: MediaTagKind) -> ImageResult<Vec<u8>> {
        Err(ImageError::FeatureNotImplemented("media tags"))
    }

    /// `Some(ok)` when the sector carries a checksum, `None` when its
    /// integrity cannot be judged. Never fails on a checksum mismatch.
    fn verify_sector(&mut self, _lba: u64) -> ImageResult<Option<bool>> {
        Ok(None)
    }

    fn verify_sectors(&mut self, lba: u64, count: u32) -> ImageResult<VerifyOutcome> {
        let mut outcome = VerifyOutcome::default();
        let mut all_known = true;
        let mut any_fail = false;
        for s in lba..lba + u64::from(count) {
            match self.verify_sector(s)? {
                Some(true) => {}
                Some(false) => {
                    any_fail = true;
                    outcome.failing.push(s);
                }
                None => {
                    all_known = false;
                    outcome.unknown.push(s);
                }
            }
        }
        outcome.status = if any_fail {
            Some(false)
        } else if all_known {
            Some(true)
        } else {
            None
        };
        Ok(outcome)
    }
}

/// Capabilities of track/session-structured optical media.
pub trait OpticalImage: BaseImage {
    fn tracks(&self) -> &[Track];
    fn sessions(&self) -> &[Session];
    fn partitions(&self) -> &[Partition];

    /// Track-scoped read: `lba` is absolute and must lie inside `track`.
    fn read_sector_in_track(&mut self, lba: u64, track: u32) -> ImageResult<Vec<u8>>;
    fn read_sectors_in_track(&mut self, lba: u64, count: u32, track: u32) -> ImageResult<Vec<u8>>;
    fn read_sector_long_in_track(&mut self, lba: u64, track: u32) -> ImageResult<Vec<u8>>;
    fn read_sector_tag_in_track(
        &mut self,
        lba: u64,
        track: u32,
        tag: SectorTagKind,
    ) -> ImageResult<Vec<u8>>;

    fn verify_sector_in_track(&mut self, lba: u64, track: u32) -> ImageResult<Option<bool>> {
        let _ = (lba, track);
        Ok(None)
    }

    fn verify_sectors_in_track(
        &mut self,
        lba: u64,
        count: u32,
        track: u32,
    ) -> ImageResult<VerifyOutcome> {
        let mut outcome = VerifyOutcome::default();
        let mut all_known = true;
        let mut any_fail = false;
        for s in lba..lba + u64::from(count) {
            match self.verify_sector_in_track(s, track)? {
                Some(true) => {}
                Some(false) => {
                    any_fail = true;
                    outcome.failing.push(s);
                }
                None => {
                    all_known = false;
                    outcome.unknown.push(s);
                }
            }
        }
        outcome.status = if any_fail {
            Some(false)
        } else if all_known {
            Some(true)
        } else {
            None
        };
        Ok(outcome)
    }
}
