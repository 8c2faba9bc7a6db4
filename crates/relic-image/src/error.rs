use thiserror::Error;

use crate::tags::SectorTagKind;

pub type ImageResult<T> = std::result::Result<T, ImageError>;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("no format plugin recognized the artifact")]
    NotIdentified,

    #[error("incomplete image: {0}")]
    IncompleteImage(String),

    #[error("corrupt image: {0}")]
    CorruptImage(&'static str),

    #[error("out of bounds: sector {lba}, image has {sectors}")]
    OutOfBounds { lba: u64, sectors: u64 },

    #[error("sector tag {tag:?} not supported for track {track}")]
    TagNotSupportedForTrack { tag: SectorTagKind, track: u32 },

    #[error("feature not present in this image: {0}")]
    FeatureNotPresent(&'static str),

    #[error("feature not implemented: {0}")]
    FeatureNotImplemented(&'static str),

    #[error("integer overflow while computing byte offsets")]
    OffsetOverflow,

    #[error("allocation exceeds the metadata size limit")]
    AllocationLimit,

    #[error("backing stream error: {0}")]
    Io(#[from] relic_filters::FilterError),
}
