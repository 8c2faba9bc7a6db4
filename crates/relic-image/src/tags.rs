use crate::track::TrackType;

/// Named subregion of a raw CD sector.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SectorTagKind {
    Sync,
    Header,
    SubHeader,
    Edc,
    Ecc,
    EccP,
    EccQ,
    /// 96 bytes of side-band data, served from the subchannel fork.
    Subchannel,
}

/// Disc-wide metadata blob.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum MediaTagKind {
    /// Full TOC as a drive would return it (READ TOC/PMA/ATIP format 2).
    FullToc,
    CdText,
    /// Media Catalogue Number.
    Mcn,
    Atip,
}

/// Where a tag lives inside a raw 2352-byte record: `size` bytes at
/// `offset`, with `skip` trailing bytes to the end of the record.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TagLayout {
    pub offset: usize,
    pub size: usize,
    pub skip: usize,
}

const fn layout(offset: usize, size: usize, skip: usize) -> Option<TagLayout> {
    Some(TagLayout { offset, size, skip })
}

/// The (track type, tag) -> raw-record layout table.
///
/// `None` means the pair is unsupported; `Subchannel` is always `None`
/// here because it is served from the subchannel fork, not the raw
/// record.
pub fn tag_layout(track_type: TrackType, tag: SectorTagKind) -> Option<TagLayout> {
    use SectorTagKind::*;
    use TrackType::*;
    match (track_type, tag) {
        (CdMode1, Sync) => layout(0, 12, 2340),
        (CdMode1, Header) => layout(12, 4, 2336),
        (CdMode1, Ecc) => layout(2076, 276, 0),
        (CdMode1, EccP) => layout(2076, 172, 104),
        (CdMode1, EccQ) => layout(2248, 104, 0),
        (CdMode1, Edc) => layout(2064, 4, 284),

        (CdMode2Formless, SubHeader) => layout(0, 8, 2328),
        (CdMode2Formless, Edc) => layout(2332, 4, 0),

        (CdMode2Form1, Sync) => layout(0, 12, 2340),
        (CdMode2Form1, Header) => layout(12, 4, 2336),
        (CdMode2Form1, SubHeader) => layout(16, 8, 2328),
        (CdMode2Form1, Ecc) => layout(2076, 276, 0),
        (CdMode2Form1, Edc) => layout(2072, 4, 276),

        (CdMode2Form2, Sync) => layout(0, 12, 2340),
        (CdMode2Form2, Header) => layout(12, 4, 2336),
        (CdMode2Form2, SubHeader) => layout(16, 8, 2328),
        (CdMode2Form2, Edc) => layout(2348, 4, 0),

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layouts_span_the_raw_record() {
        // offset + size + skip reaches 2352 for every defined tag.
        for track_type in [
            TrackType::CdMode1,
            TrackType::CdMode2Form1,
            TrackType::CdMode2Form2,
            TrackType::CdMode2Formless,
        ] {
            for tag in [
                SectorTagKind::Sync,
                SectorTagKind::Header,
                SectorTagKind::SubHeader,
                SectorTagKind::Edc,
                SectorTagKind::Ecc,
                SectorTagKind::EccP,
                SectorTagKind::EccQ,
            ] {
                if let Some(l) = tag_layout(track_type, tag) {
                    assert!(
                        l.offset + l.size + l.skip <= 2352,
                        "{track_type:?}/{tag:?} overruns the record"
                    );
                }
            }
        }
    }

    #[test]
    fn audio_supports_no_structural_tags() {
        assert_eq!(tag_layout(TrackType::Audio, SectorTagKind::Sync), None);
        assert_eq!(tag_layout(TrackType::Audio, SectorTagKind::Edc), None);
    }

    #[test]
    fn mode1_edc_location() {
        assert_eq!(
            tag_layout(TrackType::CdMode1, SectorTagKind::Edc),
            Some(TagLayout {
                offset: 2064,
                size: 4,
                skip: 284
            })
        );
    }
}
