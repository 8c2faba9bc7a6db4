/// Payload layout of a CD track's sectors.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TrackType {
    Audio,
    CdMode1,
    CdMode2Form1,
    CdMode2Form2,
    CdMode2Formless,
    /// Non-CD data (block media exposed through the optical surface).
    Data,
}

impl TrackType {
    /// Effective (cooked) bytes per sector for this track type.
    pub fn cooked_size(self) -> u32 {
        match self {
            TrackType::Audio => 2352,
            TrackType::CdMode1 => 2048,
            TrackType::CdMode2Form1 => 2048,
            TrackType::CdMode2Form2 => 2324,
            TrackType::CdMode2Formless => 2336,
            TrackType::Data => 2048,
        }
    }

    /// Offset of the cooked payload inside a raw 2352-byte record.
    pub fn cooked_offset(self) -> u32 {
        match self {
            TrackType::Audio => 0,
            TrackType::CdMode1 => 16,
            TrackType::CdMode2Form1 => 24,
            TrackType::CdMode2Form2 => 24,
            TrackType::CdMode2Formless => 16,
            TrackType::Data => 0,
        }
    }

    pub fn is_data(self) -> bool {
        !matches!(self, TrackType::Audio)
    }
}

/// Subchannel representation backing a track, if any.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SubchannelKind {
    None,
    /// 96 bytes per sector, eight channels bit-interleaved.
    RawInterleaved,
    /// 16 bytes per sector of deinterleaved Q.
    Q16Interleaved,
}

/// One track of an optical or tape image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Track {
    /// 1-based track number.
    pub sequence: u32,
    pub session: u16,
    pub start_sector: u64,
    /// Inclusive.
    pub end_sector: u64,
    pub raw_bytes_per_sector: u32,
    /// Effective (cooked) bytes per sector.
    pub bytes_per_sector: u32,
    pub track_type: TrackType,
    /// Byte offset of the track's first raw record in the data fork.
    pub file_offset: u64,
    pub subchannel: SubchannelKind,
    /// Byte offset of the track's first subchannel record in the
    /// subchannel fork; meaningful only when `subchannel` is not `None`.
    pub subchannel_offset: u64,
}

impl Track {
    pub fn sectors(&self) -> u64 {
        self.end_sector - self.start_sector + 1
    }

    pub fn contains(&self, lba: u64) -> bool {
        (self.start_sector..=self.end_sector).contains(&lba)
    }
}

/// One session of a multi-session disc.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    /// 1-based session number.
    pub sequence: u16,
    pub first_track: u32,
    pub last_track: u32,
    pub start_sector: u64,
    /// Inclusive.
    pub end_sector: u64,
}

/// A contiguous sector run, synthesized 1:1 from tracks for optical media.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Partition {
    /// 0-based position in the partition table.
    pub sequence: u32,
    pub start_sector: u64,
    /// Length in sectors.
    pub sectors: u64,
    /// Byte offset inside the image's data area.
    pub offset: u64,
    /// Size in bytes (sectors x raw bytes per sector).
    pub size: u64,
    /// Textual type, e.g. "Audio" or "Data".
    pub kind: String,
}
