use std::fs;
use std::path::Path;

use relic_formats::{CloneCdFormat, FormatPlugin, OpenedImage, Registry};
use relic_image::{
    BaseImage, CD_SYNC_PATTERN, ImageError, MediaTagKind, MediaType, OpticalImage, SectorTagKind,
    TrackType, edc, scramble,
};

const RAW: usize = 2352;
const SUB: usize = 96;

fn audio_record(lba: u64) -> Vec<u8> {
    let mut record = vec![0u8; RAW];
    for (i, b) in record.iter_mut().enumerate() {
        *b = ((lba as usize + i) % 253) as u8;
    }
    record
}

/// Mode 2 Form 1: sync, header (mode 2), doubled subheader, payload,
/// EDC over bytes 16..2072.
fn mode2_form1_record(lba: u64, good_edc: bool) -> Vec<u8> {
    let mut record = vec![0u8; RAW];
    record[..12].copy_from_slice(&CD_SYNC_PATTERN);
    record[15] = 0x02;
    let subheader = [0x00, 0x00, 0x08, 0x00]; // data, form 1
    record[16..20].copy_from_slice(&subheader);
    record[20..24].copy_from_slice(&subheader);
    for (i, b) in record.iter_mut().enumerate().take(2072).skip(24) {
        *b = ((lba as usize).wrapping_add(i * 7) % 251) as u8;
    }
    let mut value = edc::compute_edc(&record[16..2072]);
    if !good_edc {
        value ^= 0x1;
    }
    record[2072..2076].copy_from_slice(&value.to_le_bytes());
    record
}

/// Mode 1: sync, header (mode 1), payload, EDC over bytes 0..2064.
fn mode1_record(lba: u64) -> Vec<u8> {
    let mut record = vec![0u8; RAW];
    record[..12].copy_from_slice(&CD_SYNC_PATTERN);
    record[15] = 0x01;
    for (i, b) in record.iter_mut().enumerate().take(2064).skip(16) {
        *b = ((lba as usize).wrapping_add(i) % 241) as u8;
    }
    let value = edc::compute_edc(&record[..2064]);
    record[2064..2068].copy_from_slice(&value.to_le_bytes());
    record
}

fn entry(session: u8, point: u8, control: u8, pmsf: (u8, u8, u8)) -> String {
    format!(
        "[Entry]\r\nSession={session}\r\nPoint={point:#04x}\r\nADR=0x01\r\nControl={control:#04x}\r\n\
         TrackNo=0\r\nAMin=0\r\nASec=0\r\nAFrame=0\r\nZero=0\r\n\
         PMin={}\r\nPSec={}\r\nPFrame={}\r\n",
        pmsf.0, pmsf.1, pmsf.2
    )
}

/// Two-session disc: audio track 1 (LBA 0..=149), Mode 2 Form 1 data
/// track 2 (150..=199), audio track 3 (200..=249).
fn cd_plus_descriptor() -> String {
    let mut ccd = String::from("[CloneCD]\r\nVersion=3\r\n[Disc]\r\nTocEntries=8\r\nSessions=2\r\nDataTracksScrambled=0\r\nCDTextLength=0\r\n");
    // Session 1: A0/A1/A2, then track 1 at 00:02:00.
    ccd += &entry(1, 0xA0, 0x00, (1, 0, 0));
    ccd += &entry(1, 0xA1, 0x00, (1, 0, 0));
    ccd += &entry(1, 0xA2, 0x00, (0, 4, 0)); // lead-out LBA 150
    ccd += &entry(1, 0x01, 0x00, (0, 2, 0)); // track 1 LBA 0
    // Session 2: tracks 2 (data) and 3 (audio), lead-out LBA 250.
    ccd += &entry(2, 0xA0, 0x04, (2, 0, 0));
    ccd += &entry(2, 0xA2, 0x04, (0, 5, 25)); // lead-out LBA 250
    ccd += &entry(2, 0x02, 0x04, (0, 4, 0)); // track 2 LBA 150
    ccd += &entry(2, 0x03, 0x00, (0, 4, 50)); // track 3 LBA 200
    ccd
}

fn write_cd_plus(dir: &Path) {
    fs::write(dir.join("disc.ccd"), cd_plus_descriptor()).unwrap();

    let mut img = Vec::with_capacity(250 * RAW);
    for lba in 0..150u64 {
        img.extend(audio_record(lba));
    }
    for lba in 150..200u64 {
        // One deliberately corrupt sector for the verify tests.
        img.extend(mode2_form1_record(lba, lba != 151));
    }
    for lba in 200..250u64 {
        img.extend(audio_record(lba));
    }
    fs::write(dir.join("disc.img"), img).unwrap();

    let mut sub = Vec::with_capacity(250 * SUB);
    for lba in 0..250u64 {
        sub.extend(std::iter::repeat_n((lba & 0xFF) as u8, SUB));
    }
    fs::write(dir.join("disc.sub"), sub).unwrap();
}

fn open_cd_plus(dir: &Path) -> OpenedImage {
    Registry::default().open_path(&dir.join("disc.ccd")).unwrap()
}

#[test]
fn cd_plus_disc_layout() {
    let dir = tempfile::tempdir().unwrap();
    write_cd_plus(dir.path());
    let mut image = open_cd_plus(dir.path());
    let optical = image.as_optical_mut().expect("CloneCD opens as optical");

    assert_eq!(optical.sessions().len(), 2);
    assert_eq!(optical.tracks().len(), 3);
    assert_eq!(optical.partitions().len(), 3);
    assert_eq!(optical.info().media_type, MediaType::CdPlus);
    assert_eq!(optical.info().sectors, 250);
    assert_eq!(optical.info().sector_size, 2352);

    let tracks = optical.tracks();
    assert_eq!(tracks[0].track_type, TrackType::Audio);
    assert_eq!(tracks[1].track_type, TrackType::CdMode2Form1);
    assert_eq!(tracks[2].track_type, TrackType::Audio);
    assert_eq!(tracks[1].bytes_per_sector, 2048);

    // Tracks tile their sessions, ending at each lead-out.
    assert_eq!(
        (tracks[0].start_sector, tracks[0].end_sector),
        (0, 149)
    );
    assert_eq!(
        (tracks[1].start_sector, tracks[1].end_sector),
        (150, 199)
    );
    assert_eq!(
        (tracks[2].start_sector, tracks[2].end_sector),
        (200, 249)
    );

    let sessions = optical.sessions();
    assert_eq!((sessions[0].start_sector, sessions[0].end_sector), (0, 149));
    assert_eq!(
        (sessions[1].start_sector, sessions[1].end_sector),
        (150, 249)
    );

    let partitions = optical.partitions();
    assert_eq!(partitions[1].offset, 150 * RAW as u64);
    assert_eq!(partitions[1].sectors, 50);
    assert_eq!(partitions[1].size, 50 * RAW as u64);
}

#[test]
fn raw_reads_and_sector_tags() {
    let dir = tempfile::tempdir().unwrap();
    write_cd_plus(dir.path());
    let mut image = open_cd_plus(dir.path());
    let base = image.base_mut();

    let long = base.read_sectors_long(150, 1).unwrap();
    assert_eq!(long.len(), 2352);

    let sync = base.read_sectors_tag(150, 1, SectorTagKind::Sync).unwrap();
    assert_eq!(sync, CD_SYNC_PATTERN);

    // Slicing the long read at a tag's layout equals reading the tag.
    for tag in [
        SectorTagKind::Sync,
        SectorTagKind::Header,
        SectorTagKind::SubHeader,
        SectorTagKind::Edc,
        SectorTagKind::Ecc,
        SectorTagKind::EccP,
        SectorTagKind::EccQ,
    ] {
        let layout = relic_image::tag_layout(TrackType::CdMode2Form1, tag);
        let Some(layout) = layout else { continue };
        let sliced = long[layout.offset..layout.offset + layout.size].to_vec();
        let direct = base.read_sector_tag(150, tag).unwrap();
        assert_eq!(sliced, direct, "{tag:?}");
    }

    // Audio tracks support no structural tags.
    assert!(matches!(
        base.read_sector_tag(0, SectorTagKind::Sync),
        Err(ImageError::TagNotSupportedForTrack { .. })
    ));

    // Subchannel comes from the .sub fork.
    let sub = base.read_sector_tag(150, SectorTagKind::Subchannel).unwrap();
    assert_eq!(sub, vec![150u8; SUB]);
}

#[test]
fn cooked_reads_span_track_boundaries() {
    let dir = tempfile::tempdir().unwrap();
    write_cd_plus(dir.path());
    let mut image = open_cd_plus(dir.path());
    let base = image.base_mut();

    // Two audio sectors (2352 each) then two Mode 2 Form 1 payloads (2048).
    let bytes = base.read_sectors(148, 4).unwrap();
    assert_eq!(bytes.len(), 2 * 2352 + 2 * 2048);
    assert_eq!(&bytes[..2352], &audio_record(148)[..]);

    let expected_payload = &mode2_form1_record(150, true)[24..24 + 2048];
    assert_eq!(&bytes[2 * 2352..2 * 2352 + 2048], expected_payload);

    // A cooked single-sector read of the data track yields its payload.
    let cooked = base.read_sector(150).unwrap();
    assert_eq!(cooked.len(), 2048);
    assert_eq!(cooked, expected_payload);

    assert!(matches!(
        base.read_sectors(249, 2),
        Err(ImageError::OutOfBounds { .. })
    ));
}

#[test]
fn track_scoped_reads_enforce_containment() {
    let dir = tempfile::tempdir().unwrap();
    write_cd_plus(dir.path());
    let mut image = open_cd_plus(dir.path());
    let optical = image.as_optical_mut().unwrap();

    let cooked = optical.read_sector_in_track(150, 2).unwrap();
    assert_eq!(cooked.len(), 2048);

    assert!(matches!(
        optical.read_sector_in_track(149, 2),
        Err(ImageError::OutOfBounds { .. })
    ));
    assert!(matches!(
        optical.read_sector_in_track(200, 2),
        Err(ImageError::OutOfBounds { .. })
    ));
}

#[test]
fn verification_is_three_valued() {
    let dir = tempfile::tempdir().unwrap();
    write_cd_plus(dir.path());
    let mut image = open_cd_plus(dir.path());
    let base = image.base_mut();

    assert_eq!(base.verify_sector(150).unwrap(), Some(true));
    assert_eq!(base.verify_sector(151).unwrap(), Some(false));
    assert_eq!(base.verify_sector(0).unwrap(), None); // audio

    let outcome = base.verify_sectors(150, 3).unwrap();
    assert_eq!(outcome.status, Some(false));
    assert_eq!(outcome.failing, vec![151]);
    assert!(outcome.unknown.is_empty());
}

#[test]
fn full_toc_has_canonical_shape() {
    let dir = tempfile::tempdir().unwrap();
    write_cd_plus(dir.path());
    let mut image = open_cd_plus(dir.path());
    let base = image.base_mut();

    let toc = base.read_media_tag(MediaTagKind::FullToc).unwrap();
    let entries = 8;
    assert_eq!(toc.len(), 4 + 11 * entries);
    let declared = u16::from_be_bytes([toc[0], toc[1]]);
    assert_eq!(usize::from(declared), 11 * entries + 2);
    assert_eq!(toc[2], 1); // first session
    assert_eq!(toc[3], 2); // last session

    assert!(matches!(
        base.read_media_tag(MediaTagKind::CdText),
        Err(ImageError::FeatureNotPresent(_))
    ));
}

#[test]
fn open_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    write_cd_plus(dir.path());

    let mut first = open_cd_plus(dir.path());
    let mut second = open_cd_plus(dir.path());
    let first = first.as_optical_mut().unwrap();
    let second = second.as_optical_mut().unwrap();

    assert_eq!(first.info(), second.info());
    assert_eq!(first.tracks(), second.tracks());
    assert_eq!(first.sessions(), second.sessions());
    assert_eq!(first.partitions(), second.partitions());
}

#[test]
fn scrambled_data_track_is_descrambled_on_read() {
    let dir = tempfile::tempdir().unwrap();

    let mut ccd = String::from("[CloneCD]\r\nVersion=3\r\n[Disc]\r\nTocEntries=2\r\nSessions=1\r\nDataTracksScrambled=1\r\n");
    ccd += &entry(1, 0xA2, 0x04, (0, 2, 16)); // lead-out LBA 16
    ccd += &entry(1, 0x01, 0x04, (0, 2, 0)); // track 1 LBA 0
    fs::write(dir.path().join("scr.ccd"), ccd).unwrap();

    let mut img = Vec::new();
    for lba in 0..16u64 {
        let mut record = mode1_record(lba);
        scramble::descramble(&mut record); // scrambling is the same XOR
        img.extend(record);
    }
    fs::write(dir.path().join("scr.img"), img).unwrap();

    let mut image = Registry::default()
        .open_path(&dir.path().join("scr.ccd"))
        .unwrap();
    let optical = image.as_optical_mut().unwrap();

    assert_eq!(optical.tracks()[0].track_type, TrackType::CdMode1);
    assert!(optical.info().sector_size >= 2048);

    let cooked = optical.read_sector(0).unwrap();
    assert_eq!(cooked.len(), 2048);
    assert_eq!(cooked, &mode1_record(0)[16..2064]);

    // Long reads return the descrambled record, sync mark intact.
    let long = optical.read_sector_long(0).unwrap();
    assert_eq!(long, mode1_record(0));
    assert_eq!(optical.verify_sector(0).unwrap(), Some(true));
}

#[test]
fn missing_data_fork_is_an_incomplete_image() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("alone.ccd"), cd_plus_descriptor()).unwrap();

    let err = Registry::default()
        .open_path(&dir.path().join("alone.ccd"))
        .unwrap_err();
    assert!(matches!(err, ImageError::IncompleteImage(_)));
}

#[test]
fn sibling_resolution_is_extension_case_insensitive() {
    let dir = tempfile::tempdir().unwrap();

    let mut ccd = String::from("[CloneCD]\r\nVersion=3\r\n[Disc]\r\nTocEntries=2\r\nSessions=1\r\nDataTracksScrambled=0\r\n");
    ccd += &entry(1, 0xA2, 0x04, (0, 2, 4)); // lead-out LBA 4
    ccd += &entry(1, 0x01, 0x04, (0, 2, 0));
    fs::write(dir.path().join("disc.ccd"), ccd).unwrap();

    let mut img = Vec::new();
    for lba in 0..4u64 {
        img.extend(mode1_record(lba));
    }
    fs::write(dir.path().join("disc.IMG"), img).unwrap();

    let mut image = Registry::default()
        .open_path(&dir.path().join("disc.ccd"))
        .unwrap();
    assert_eq!(image.base_mut().info().sectors, 4);
}

#[test]
fn identify_rejects_binary_and_foreign_text() {
    let registry_probe = |bytes: Vec<u8>| {
        let mut filter = relic_filters::Filter::from_bytes("x.ccd", bytes).unwrap();
        CloneCdFormat.identify(&mut filter)
    };

    assert!(registry_probe(cd_plus_descriptor().into_bytes()));
    assert!(!registry_probe(b"[FooBar]\r\nVersion=3\r\n".to_vec()));
    // The marker buried in binary data must not be claimed.
    let mut binary = vec![0u8; 32];
    binary.extend_from_slice(b"[CloneCD]");
    assert!(!registry_probe(binary));
}

#[test]
fn unrecognized_artifact_detects_as_none() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blank.bin");
    fs::write(&path, vec![0u8; 512]).unwrap();

    let registry = Registry::default();
    let mut filter = relic_filters::Filter::open(&path).unwrap();
    assert!(registry.detect(&mut filter).is_none());

    assert!(matches!(
        registry.open_path(&path),
        Err(ImageError::NotIdentified)
    ));
}
