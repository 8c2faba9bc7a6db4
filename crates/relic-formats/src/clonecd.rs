//! CloneCD optical images.
//!
//! A CloneCD dump is three co-located files sharing a stem: a text
//! descriptor (`.ccd`) with `[Section]` headers and `Key=Value` lines, a
//! raw data fork (`.img`) of concatenated 2352-byte records, and an
//! optional subchannel fork (`.sub`) of 96 bytes per sector.
//!
//! The descriptor's `[Entry N]` sections are raw TOC descriptors; from
//! them the decoder rebuilds the canonical full TOC, derives track and
//! session boundaries (POINT 0xA2 marks each session's lead-out), and
//! autodetects every data track's sector mode by reading its first raw
//! record: sync mark, mode byte, and for Mode 2 a subheader comparison.
//! Images dumped with `DataTracksScrambled=1` store data sectors still
//! XORed with the ECMA-130 scrambler stream and are descrambled on read.

use std::path::{Path, PathBuf};

use relic_filters::Filter;
use relic_image::toc::{TocEntry, build_full_toc};
use relic_image::{
    BaseImage, CD_SYNC_PATTERN, ImageError, ImageInfo, ImageResult, MediaTagKind, MediaType,
    OpticalImage, Partition, RAW_SECTOR_SIZE, SUBCHANNEL_SIZE, SectorTagKind, Session,
    SubchannelKind, Track, TrackType, XmlMediaType, edc, msf, scramble, tag_layout,
};

use crate::registry::{FormatPlugin, OpenedImage, plausible_text};

/// Descriptor versions CloneCD itself has shipped.
const KNOWN_VERSIONS: [u32; 2] = [2, 3];

/// Format plugin for CloneCD descriptor triples.
pub struct CloneCdFormat;

impl FormatPlugin for CloneCdFormat {
    fn name(&self) -> &'static str {
        "CloneCD"
    }

    fn identify(&self, filter: &mut Filter) -> bool {
        let mut head = [0u8; 512];
        let Ok(n) = filter.read_at_most(0, &mut head) else {
            return false;
        };
        let head = &head[..n];
        if !plausible_text(head) {
            return false;
        }
        let text = String::from_utf8_lossy(head).to_ascii_lowercase();
        text.contains("[clonecd]")
    }

    fn open(&self, mut filter: Filter) -> ImageResult<OpenedImage> {
        let data_path = find_sibling(filter.base_path(), "img").ok_or_else(|| {
            ImageError::IncompleteImage(format!(
                "no .img data fork next to {}",
                filter.base_path().display()
            ))
        })?;
        let data = Filter::open(&data_path)?;
        let sub = match find_sibling(filter.base_path(), "sub") {
            Some(path) => Some(Filter::open(&path)?),
            None => None,
        };
        let image = CloneCdImage::open_parts(&mut filter, data, sub)?;
        Ok(OpenedImage::Optical(Box::new(image)))
    }
}

/// Locate `<stem>.<ext>` next to `path`, matching the extension
/// case-insensitively (shipped images mix `.img` and `.IMG`).
fn find_sibling(path: &Path, ext: &str) -> Option<PathBuf> {
    let parent = path.parent()?;
    let dir = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };
    let stem = path.file_stem()?.to_str()?;
    for entry in std::fs::read_dir(dir).ok()?.flatten() {
        let candidate = entry.path();
        let Some(c_stem) = candidate.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let Some(c_ext) = candidate.extension().and_then(|s| s.to_str()) else {
            continue;
        };
        if c_stem == stem && c_ext.eq_ignore_ascii_case(ext) {
            return Some(candidate);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Descriptor parsing
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Section {
    None,
    CloneCd,
    Disc,
    Session,
    Entry,
    Track,
    CdText,
    Unknown,
}

#[derive(Default)]
struct Descriptor {
    version: Option<u32>,
    toc_entries_declared: Option<u32>,
    sessions_declared: Option<u16>,
    data_tracks_scrambled: bool,
    cdtext_length_declared: Option<u32>,
    catalog: Option<String>,
    entries: Vec<TocEntry>,
    cdtext: Vec<u8>,
}

fn parse_number(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Some(hex) = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        i64::from_str_radix(hex, 16).ok()
    } else {
        value.parse().ok()
    }
}

fn parse_u8(value: &str) -> Option<u8> {
    parse_number(value).and_then(|v| u8::try_from(v).ok())
}

fn parse_descriptor(text: &str) -> ImageResult<Descriptor> {
    let mut descriptor = Descriptor::default();
    let mut section = Section::None;
    let mut pending_entry: Option<TocEntry> = None;

    for raw_line in text.lines() {
        let line = raw_line.trim_start_matches('\u{feff}').trim();
        if line.is_empty() {
            continue;
        }

        if let Some(header) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            if let Some(entry) = pending_entry.take() {
                descriptor.entries.push(entry);
            }
            let header_lc = header.to_ascii_lowercase();
            section = if header_lc == "clonecd" {
                if section != Section::None {
                    return Err(ImageError::CorruptImage(
                        "[CloneCD] section after other sections",
                    ));
                }
                Section::CloneCd
            } else if header_lc == "disc" {
                Section::Disc
            } else if header_lc.starts_with("session") {
                Section::Session
            } else if header_lc.starts_with("entry") {
                pending_entry = Some(TocEntry::default());
                Section::Entry
            } else if header_lc.starts_with("track") {
                Section::Track
            } else if header_lc == "cdtext" {
                Section::CdText
            } else {
                log::debug!("CloneCD: unknown section [{header}]");
                Section::Unknown
            };
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(ImageError::CorruptImage(
                "descriptor line is neither section nor key=value",
            ));
        };
        let key = key.trim();
        let value = value.trim();

        match section {
            Section::CloneCd => {
                if key.eq_ignore_ascii_case("version") {
                    let version = parse_number(value).and_then(|v| u32::try_from(v).ok());
                    if let Some(v) = version {
                        if !KNOWN_VERSIONS.contains(&v) {
                            log::warn!("CloneCD: unknown descriptor version {v}, proceeding");
                        }
                        descriptor.version = Some(v);
                    }
                }
            }
            Section::Disc => match key.to_ascii_lowercase().as_str() {
                "tocentries" => {
                    descriptor.toc_entries_declared =
                        parse_number(value).and_then(|v| u32::try_from(v).ok());
                }
                "sessions" => {
                    descriptor.sessions_declared =
                        parse_number(value).and_then(|v| u16::try_from(v).ok());
                }
                "datatracksscrambled" => {
                    descriptor.data_tracks_scrambled = parse_number(value) == Some(1);
                }
                "cdtextlength" => {
                    descriptor.cdtext_length_declared =
                        parse_number(value).and_then(|v| u32::try_from(v).ok());
                }
                "catalog" => {
                    descriptor.catalog = Some(value.to_string());
                }
                other => {
                    log::debug!("CloneCD: ignoring [Disc] key {other}");
                }
            },
            Section::Entry => {
                let Some(entry) = pending_entry.as_mut() else {
                    return Err(ImageError::CorruptImage("entry value outside [Entry]"));
                };
                match key.to_ascii_lowercase().as_str() {
                    "session" => entry.session = parse_u8(value).unwrap_or(0),
                    "point" => entry.point = parse_u8(value).unwrap_or(0),
                    "adr" => entry.adr = parse_u8(value).unwrap_or(0),
                    "control" => entry.control = parse_u8(value).unwrap_or(0),
                    "trackno" => entry.tno = parse_u8(value).unwrap_or(0),
                    "amin" => entry.min = parse_u8(value).unwrap_or(0),
                    "asec" => entry.sec = parse_u8(value).unwrap_or(0),
                    "aframe" => entry.frame = parse_u8(value).unwrap_or(0),
                    "zero" => entry.zero = parse_u8(value).unwrap_or(0),
                    "pmin" => entry.pmin = parse_u8(value).unwrap_or(0),
                    "psec" => entry.psec = parse_u8(value).unwrap_or(0),
                    "pframe" => entry.pframe = parse_u8(value).unwrap_or(0),
                    // Redundant pre-computed addresses.
                    "alba" | "plba" => {}
                    other => {
                        log::debug!("CloneCD: ignoring [Entry] key {other}");
                    }
                }
            }
            Section::CdText => {
                let key_lc = key.to_ascii_lowercase();
                // "Entries=N" declares the count; "Entry N=HH HH .." carries bytes.
                let is_entry = key_lc
                    .strip_prefix("entry")
                    .is_some_and(|rest| rest.trim().parse::<u32>().is_ok());
                if is_entry {
                    for byte in value.split_ascii_whitespace() {
                        match u8::from_str_radix(byte, 16) {
                            Ok(b) => descriptor.cdtext.push(b),
                            Err(_) => {
                                return Err(ImageError::CorruptImage(
                                    "CD-Text entry holds a non-hex byte",
                                ));
                            }
                        }
                    }
                } else if key_lc != "entries" {
                    log::debug!("CloneCD: ignoring [CDText] key {key}");
                }
            }
            Section::Session | Section::Track | Section::Unknown => {
                log::debug!("CloneCD: ignoring key {key} in auxiliary section");
            }
            Section::None => {
                return Err(ImageError::CorruptImage(
                    "key=value before the first section",
                ));
            }
        }
    }

    if let Some(entry) = pending_entry.take() {
        descriptor.entries.push(entry);
    }

    if descriptor.entries.is_empty() {
        return Err(ImageError::CorruptImage("descriptor has no TOC entries"));
    }
    if let Some(declared) = descriptor.toc_entries_declared {
        if declared as usize != descriptor.entries.len() {
            log::warn!(
                "CloneCD: descriptor declares {declared} TOC entries, found {}",
                descriptor.entries.len()
            );
        }
    }
    if let Some(declared) = descriptor.cdtext_length_declared {
        if declared as usize != descriptor.cdtext.len() {
            log::warn!(
                "CloneCD: descriptor declares {declared} CD-Text bytes, found {}",
                descriptor.cdtext.len()
            );
        }
    }

    Ok(descriptor)
}

// ---------------------------------------------------------------------------
// Image
// ---------------------------------------------------------------------------

/// An opened CloneCD image.
pub struct CloneCdImage {
    data: Filter,
    sub: Option<Filter>,

    info: ImageInfo,
    tracks: Vec<Track>,
    sessions: Vec<Session>,
    partitions: Vec<Partition>,
    full_toc: Vec<u8>,
    cdtext: Vec<u8>,
    scrambled: bool,
}

impl CloneCdImage {
    /// Open from already-resolved forks. The descriptor filter is fully
    /// consumed here; the image owns only the data and subchannel forks.
    pub fn open_parts(
        descriptor: &mut Filter,
        data: Filter,
        sub: Option<Filter>,
    ) -> ImageResult<Self> {
        let text_bytes = descriptor.read_fork_to_vec()?;
        let text = String::from_utf8_lossy(&text_bytes);
        let parsed = parse_descriptor(&text)?;

        let mut image = Self {
            data,
            sub,
            info: ImageInfo::default(),
            tracks: Vec::new(),
            sessions: Vec::new(),
            partitions: Vec::new(),
            full_toc: build_full_toc(&parsed.entries),
            cdtext: parsed.cdtext.clone(),
            scrambled: parsed.data_tracks_scrambled,
        };
        image.build(&parsed)?;
        Ok(image)
    }

    fn build(&mut self, parsed: &Descriptor) -> ImageResult<()> {
        let mut entries = parsed.entries.clone();
        entries.sort_by_key(|e| (e.session, e.point));

        // Pass 1: per-session lead-outs and disc-wide identity.
        let mut lead_outs: Vec<(u8, i64)> = Vec::new();
        let mut media_serial = None;
        let mut media_manufacturer = None;
        for entry in &entries {
            match entry.adr {
                1 | 4 if entry.point == 0xA2 => {
                    lead_outs.push((
                        entry.session,
                        msf::msf_to_lba(entry.phour(), entry.pmin, entry.psec, entry.pframe),
                    ));
                }
                5 if entry.point == 0xC0 && entry.pmin == 97 => {
                    let frame = entry.pframe - entry.pframe % 10;
                    media_manufacturer = Some(format!("97:{:02}:{:02}", entry.psec, frame));
                }
                6 => {
                    let value = (u32::from(entry.min) << 16)
                        | (u32::from(entry.sec) << 8)
                        | u32::from(entry.frame);
                    media_serial = Some(format!("{value:06X}"));
                }
                _ => {}
            }
        }
        let lead_out_for = |session: u8| -> ImageResult<u64> {
            lead_outs
                .iter()
                .find(|(s, _)| *s == session)
                .map(|&(_, lba)| lba)
                .filter(|&lba| lba > 0)
                .map(|lba| lba as u64)
                .ok_or(ImageError::CorruptImage("session has no lead-out entry"))
        };

        // Pass 2: track starts; a track ends where the next one begins,
        // or at its session's lead-out.
        let sub_present = self.sub.is_some();
        let mut tracks: Vec<Track> = Vec::new();
        let mut data_flags: Vec<bool> = Vec::new();
        for entry in &entries {
            if !matches!(entry.adr, 1 | 4) || !(0x01..=0x63).contains(&entry.point) {
                continue;
            }
            let start =
                msf::msf_to_lba(entry.phour(), entry.pmin, entry.psec, entry.pframe);
            if start < 0 {
                return Err(ImageError::CorruptImage("track starts before LBA 0"));
            }
            let start = start as u64;

            if let Some(previous) = tracks.last_mut() {
                if previous.session == u16::from(entry.session) {
                    if start == 0 {
                        return Err(ImageError::CorruptImage("tracks out of order"));
                    }
                    previous.end_sector = start - 1;
                } else {
                    let lead_out = lead_out_for(previous.session as u8)?;
                    previous.end_sector = lead_out - 1;
                }
            }

            let is_data = matches!(entry.control & 0x0D, 0x04 | 0x05);
            tracks.push(Track {
                sequence: u32::from(entry.point),
                session: u16::from(entry.session),
                start_sector: start,
                end_sector: start, // patched by the next entry or lead-out
                raw_bytes_per_sector: RAW_SECTOR_SIZE as u32,
                bytes_per_sector: TrackType::Audio.cooked_size(),
                track_type: if is_data {
                    TrackType::CdMode1 // refined by autodetection below
                } else {
                    TrackType::Audio
                },
                file_offset: start * RAW_SECTOR_SIZE as u64,
                subchannel: if sub_present {
                    SubchannelKind::RawInterleaved
                } else {
                    SubchannelKind::None
                },
                subchannel_offset: start * SUBCHANNEL_SIZE as u64,
            });
            data_flags.push(is_data);
        }
        if let Some(last) = tracks.last_mut() {
            let lead_out = lead_out_for(last.session as u8)?;
            last.end_sector = lead_out - 1;
        }
        if tracks.is_empty() {
            return Err(ImageError::CorruptImage("descriptor describes no tracks"));
        }

        // Pass 3: autodetect data-track sector modes from the fork.
        for (track, &is_data) in tracks.iter_mut().zip(&data_flags) {
            if is_data {
                track.track_type = self.detect_mode(track)?;
            }
            track.bytes_per_sector = track.track_type.cooked_size();
        }

        self.tracks = tracks;
        self.build_sessions();
        if let Some(declared) = parsed.sessions_declared {
            if usize::from(declared) != self.sessions.len() {
                log::warn!(
                    "CloneCD: descriptor declares {declared} sessions, found {}",
                    self.sessions.len()
                );
            }
        }
        self.build_partitions();
        self.build_info(parsed, media_serial, media_manufacturer);
        Ok(())
    }

    /// Classify a data track by its first raw record.
    fn detect_mode(&mut self, track: &Track) -> ImageResult<TrackType> {
        let mut record = vec![0u8; RAW_SECTOR_SIZE];
        self.data
            .read_at(track.file_offset, &mut record)
            .map_err(|_| ImageError::CorruptImage("data fork shorter than its TOC"))?;
        if self.scrambled {
            scramble::descramble(&mut record);
        }

        if record[..12] != CD_SYNC_PATTERN {
            log::warn!(
                "CloneCD: data track {} has no sync mark, serving raw records",
                track.sequence
            );
            return Ok(TrackType::Audio);
        }

        match record[15] {
            1 => Ok(TrackType::CdMode1),
            2 => {
                let subheader = &record[16..20];
                let repeated = &record[20..24];
                if subheader == repeated {
                    let nonzero = subheader.iter().any(|&b| b != 0);
                    if nonzero && record[18] & 0x20 != 0 {
                        Ok(TrackType::CdMode2Form2)
                    } else {
                        Ok(TrackType::CdMode2Form1)
                    }
                } else {
                    Ok(TrackType::CdMode2Formless)
                }
            }
            other => {
                log::warn!(
                    "CloneCD: track {} has unknown mode byte {other:#04x}",
                    track.sequence
                );
                Ok(TrackType::CdMode2Formless)
            }
        }
    }

    fn build_sessions(&mut self) {
        let mut sessions: Vec<Session> = Vec::new();
        for track in &self.tracks {
            match sessions.iter_mut().find(|s| s.sequence == track.session) {
                Some(session) => {
                    session.first_track = session.first_track.min(track.sequence);
                    session.last_track = session.last_track.max(track.sequence);
                    session.start_sector = session.start_sector.min(track.start_sector);
                    session.end_sector = session.end_sector.max(track.end_sector);
                }
                None => sessions.push(Session {
                    sequence: track.session,
                    first_track: track.sequence,
                    last_track: track.sequence,
                    start_sector: track.start_sector,
                    end_sector: track.end_sector,
                }),
            }
        }
        sessions.sort_by_key(|s| s.sequence);
        self.sessions = sessions;
    }

    fn build_partitions(&mut self) {
        self.partitions = self
            .tracks
            .iter()
            .enumerate()
            .map(|(i, track)| Partition {
                sequence: i as u32,
                start_sector: track.start_sector,
                sectors: track.sectors(),
                offset: track.start_sector * RAW_SECTOR_SIZE as u64,
                size: track.sectors() * u64::from(track.raw_bytes_per_sector),
                kind: describe(track.track_type).to_string(),
            })
            .collect();
    }

    fn build_info(
        &mut self,
        parsed: &Descriptor,
        media_serial: Option<String>,
        media_manufacturer: Option<String>,
    ) {
        let tracks = &self.tracks;
        let is_mode2 = |t: TrackType| {
            matches!(
                t,
                TrackType::CdMode2Form1 | TrackType::CdMode2Form2 | TrackType::CdMode2Formless
            )
        };
        let any_data = tracks.iter().any(|t| t.track_type.is_data());
        let any_audio = tracks.iter().any(|t| t.track_type == TrackType::Audio);
        let any_mode2 = tracks.iter().any(|t| is_mode2(t.track_type));
        let first_audio = tracks
            .first()
            .is_some_and(|t| t.track_type == TrackType::Audio);
        let first_data = tracks.first().is_some_and(|t| t.track_type.is_data());
        let later_data = tracks
            .iter()
            .skip(1)
            .any(|t| t.track_type.is_data());

        let media_type = if !any_data {
            MediaType::CdDa
        } else if first_audio && later_data && self.sessions.len() > 1 && any_mode2 {
            MediaType::CdPlus
        } else if (first_data && any_audio) || any_mode2 {
            MediaType::CdRomXa
        } else if !any_audio {
            MediaType::CdRom
        } else {
            MediaType::Cd
        };

        let mut sector_tags = Vec::new();
        for tag in [
            SectorTagKind::Sync,
            SectorTagKind::Header,
            SectorTagKind::SubHeader,
            SectorTagKind::Edc,
            SectorTagKind::Ecc,
            SectorTagKind::EccP,
            SectorTagKind::EccQ,
        ] {
            if tracks
                .iter()
                .any(|t| tag_layout(t.track_type, tag).is_some())
            {
                sector_tags.push(tag);
            }
        }
        if self.sub.is_some() {
            sector_tags.push(SectorTagKind::Subchannel);
        }

        let mut media_tags = vec![MediaTagKind::FullToc];
        if !self.cdtext.is_empty() {
            media_tags.push(MediaTagKind::CdText);
        }
        if parsed.catalog.is_some() {
            media_tags.push(MediaTagKind::Mcn);
        }

        self.info = ImageInfo {
            sectors: tracks.iter().map(|t| t.end_sector + 1).max().unwrap_or(0),
            sector_size: tracks.iter().map(|t| t.bytes_per_sector).max().unwrap_or(0),
            media_type,
            xml_media_type: XmlMediaType::OpticalDisc,
            image_size: self.data.length(),
            application: Some("CloneCD".to_string()),
            application_version: parsed.version.map(|v| v.to_string()),
            creation_time: self.data.creation_time(),
            last_modification_time: self.data.last_write_time(),
            media_serial_number: media_serial,
            media_manufacturer,
            media_catalogue_number: parsed.catalog.clone(),
            readable_sector_tags: sector_tags,
            readable_media_tags: media_tags,
            ..ImageInfo::default()
        };
    }

    fn track_containing(&self, lba: u64) -> ImageResult<&Track> {
        self.tracks
            .iter()
            .find(|t| t.contains(lba))
            .ok_or(ImageError::OutOfBounds {
                lba,
                sectors: self.info.sectors,
            })
    }

    fn track_by_sequence(&self, sequence: u32) -> ImageResult<&Track> {
        self.tracks
            .iter()
            .find(|t| t.sequence == sequence)
            .ok_or(ImageError::OutOfBounds {
                lba: u64::from(sequence),
                sectors: self.tracks.len() as u64,
            })
    }

    /// Read one raw record, descrambling data tracks when the image was
    /// dumped scrambled.
    fn read_record(&mut self, track_type: TrackType, lba: u64) -> ImageResult<Vec<u8>> {
        let mut record = vec![0u8; RAW_SECTOR_SIZE];
        let offset = lba
            .checked_mul(RAW_SECTOR_SIZE as u64)
            .ok_or(ImageError::OffsetOverflow)?;
        self.data
            .read_at(offset, &mut record)
            .map_err(|_| ImageError::CorruptImage("data fork shorter than its TOC"))?;
        if self.scrambled && track_type.is_data() {
            scramble::descramble(&mut record);
        }
        Ok(record)
    }

    fn read_cooked_range(
        &mut self,
        track: &Track,
        lba: u64,
        count: u32,
    ) -> ImageResult<Vec<u8>> {
        let end = lba + u64::from(count) - 1;
        if !track.contains(lba) || !track.contains(end) {
            return Err(ImageError::OutOfBounds {
                lba: end,
                sectors: track.end_sector + 1,
            });
        }

        let cooked_offset = track.track_type.cooked_offset() as usize;
        let cooked_size = track.track_type.cooked_size() as usize;

        // Whole-record tracks read contiguously; payload extraction goes
        // record by record.
        if cooked_offset == 0 && cooked_size == RAW_SECTOR_SIZE && !self.scrambled {
            let offset = lba
                .checked_mul(RAW_SECTOR_SIZE as u64)
                .ok_or(ImageError::OffsetOverflow)?;
            let mut out = vec![0u8; count as usize * RAW_SECTOR_SIZE];
            self.data
                .read_at(offset, &mut out)
                .map_err(|_| ImageError::CorruptImage("data fork shorter than its TOC"))?;
            return Ok(out);
        }

        let mut out = Vec::with_capacity(count as usize * cooked_size);
        for sector in lba..=end {
            let record = self.read_record(track.track_type, sector)?;
            out.extend_from_slice(&record[cooked_offset..cooked_offset + cooked_size]);
        }
        Ok(out)
    }

    fn read_subchannel_range(&mut self, lba: u64, count: u32) -> ImageResult<Vec<u8>> {
        let Some(sub) = self.sub.as_mut() else {
            return Err(ImageError::FeatureNotPresent("subchannel fork"));
        };
        let offset = lba
            .checked_mul(SUBCHANNEL_SIZE as u64)
            .ok_or(ImageError::OffsetOverflow)?;
        let mut out = vec![0u8; count as usize * SUBCHANNEL_SIZE];
        sub.read_at(offset, &mut out)
            .map_err(|_| ImageError::CorruptImage("subchannel fork shorter than its TOC"))?;
        Ok(out)
    }

    fn check_bounds(&self, lba: u64, count: u32) -> ImageResult<()> {
        let end = lba
            .checked_add(u64::from(count))
            .ok_or(ImageError::OffsetOverflow)?;
        if end > self.info.sectors {
            return Err(ImageError::OutOfBounds {
                lba: end.saturating_sub(1),
                sectors: self.info.sectors,
            });
        }
        Ok(())
    }
}

fn describe(track_type: TrackType) -> &'static str {
    match track_type {
        TrackType::Audio => "Audio",
        TrackType::CdMode1 => "CD Mode 1",
        TrackType::CdMode2Form1 => "CD Mode 2 Form 1",
        TrackType::CdMode2Form2 => "CD Mode 2 Form 2",
        TrackType::CdMode2Formless => "CD Mode 2",
        TrackType::Data => "Data",
    }
}

impl BaseImage for CloneCdImage {
    fn info(&self) -> &ImageInfo {
        &self.info
    }

    fn read_sector(&mut self, lba: u64) -> ImageResult<Vec<u8>> {
        self.read_sectors(lba, 1)
    }

    /// Cooked reads span track boundaries; each sector contributes its
    /// own track's effective payload.
    fn read_sectors(&mut self, lba: u64, count: u32) -> ImageResult<Vec<u8>> {
        self.check_bounds(lba, count)?;
        let mut out = Vec::new();
        let mut cursor = lba;
        let end = lba + u64::from(count);
        while cursor < end {
            let track = self.track_containing(cursor)?.clone();
            let run = (track.end_sector + 1 - cursor).min(end - cursor) as u32;
            out.extend(self.read_cooked_range(&track, cursor, run)?);
            cursor += u64::from(run);
        }
        Ok(out)
    }

    fn read_sector_long(&mut self, lba: u64) -> ImageResult<Vec<u8>> {
        self.read_sectors_long(lba, 1)
    }

    fn read_sectors_long(&mut self, lba: u64, count: u32) -> ImageResult<Vec<u8>> {
        self.check_bounds(lba, count)?;
        let mut out = Vec::with_capacity(count as usize * RAW_SECTOR_SIZE);
        for sector in lba..lba + u64::from(count) {
            let track_type = self.track_containing(sector)?.track_type;
            out.extend(self.read_record(track_type, sector)?);
        }
        Ok(out)
    }

    fn read_sector_tag(&mut self, lba: u64, tag: SectorTagKind) -> ImageResult<Vec<u8>> {
        self.read_sectors_tag(lba, 1, tag)
    }

    fn read_sectors_tag(
        &mut self,
        lba: u64,
        count: u32,
        tag: SectorTagKind,
    ) -> ImageResult<Vec<u8>> {
        self.check_bounds(lba, count)?;
        if tag == SectorTagKind::Subchannel {
            return self.read_subchannel_range(lba, count);
        }
        let mut out = Vec::new();
        for sector in lba..lba + u64::from(count) {
            let track = self.track_containing(sector)?.clone();
            let layout = tag_layout(track.track_type, tag).ok_or(
                ImageError::TagNotSupportedForTrack {
                    tag,
                    track: track.sequence,
                },
            )?;
            let record = self.read_record(track.track_type, sector)?;
            out.extend_from_slice(&record[layout.offset..layout.offset + layout.size]);
        }
        Ok(out)
    }

    fn read_media_tag(&mut self, tag: MediaTagKind) -> ImageResult<Vec<u8>> {
        match tag {
            MediaTagKind::FullToc => Ok(self.full_toc.clone()),
            MediaTagKind::CdText => {
                if self.cdtext.is_empty() {
                    Err(ImageError::FeatureNotPresent("CD-Text"))
                } else {
                    Ok(self.cdtext.clone())
                }
            }
            MediaTagKind::Mcn => self
                .info
                .media_catalogue_number
                .as_ref()
                .map(|mcn| mcn.as_bytes().to_vec())
                .ok_or(ImageError::FeatureNotPresent("media catalogue number")),
            MediaTagKind::Atip => Err(ImageError::FeatureNotPresent("ATIP")),
        }
    }

    fn verify_sector(&mut self, lba: u64) -> ImageResult<Option<bool>> {
        self.check_bounds(lba, 1)?;
        let track_type = self.track_containing(lba)?.track_type;
        let record = self.read_record(track_type, lba)?;
        Ok(edc::verify_record(&record, track_type))
    }
}

impl OpticalImage for CloneCdImage {
    fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    fn read_sector_in_track(&mut self, lba: u64, track: u32) -> ImageResult<Vec<u8>> {
        self.read_sectors_in_track(lba, 1, track)
    }

    fn read_sectors_in_track(
        &mut self,
        lba: u64,
        count: u32,
        track: u32,
    ) -> ImageResult<Vec<u8>> {
        let track = self.track_by_sequence(track)?.clone();
        self.read_cooked_range(&track, lba, count)
    }

    fn read_sector_long_in_track(&mut self, lba: u64, track: u32) -> ImageResult<Vec<u8>> {
        let track = self.track_by_sequence(track)?.clone();
        if !track.contains(lba) {
            return Err(ImageError::OutOfBounds {
                lba,
                sectors: track.end_sector + 1,
            });
        }
        self.read_record(track.track_type, lba)
    }

    fn read_sector_tag_in_track(
        &mut self,
        lba: u64,
        track: u32,
        tag: SectorTagKind,
    ) -> ImageResult<Vec<u8>> {
        let track = self.track_by_sequence(track)?.clone();
        if !track.contains(lba) {
            return Err(ImageError::OutOfBounds {
                lba,
                sectors: track.end_sector + 1,
            });
        }
        if tag == SectorTagKind::Subchannel {
            return self.read_subchannel_range(lba, 1);
        }
        let layout =
            tag_layout(track.track_type, tag).ok_or(ImageError::TagNotSupportedForTrack {
                tag,
                track: track.sequence,
            })?;
        let record = self.read_record(track.track_type, lba)?;
        Ok(record[layout.offset..layout.offset + layout.size].to_vec())
    }

    fn verify_sector_in_track(&mut self, lba: u64, track: u32) -> ImageResult<Option<bool>> {
        let track = self.track_by_sequence(track)?.clone();
        if !track.contains(lba) {
            return Err(ImageError::OutOfBounds {
                lba,
                sectors: track.end_sector + 1,
            });
        }
        let record = self.read_record(track.track_type, lba)?;
        Ok(edc::verify_record(&record, track.track_type))
    }
}
