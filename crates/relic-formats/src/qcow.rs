//! QCOW version 1 sparse block images.
//!
//! A QCOW v1 image maps a logical byte range onto clusters through two
//! levels of big-endian tables: an in-memory L1 table whose entries point
//! at on-disk L2 tables, whose entries point at data clusters. A zero
//! entry at either level is a hole and reads back as zeros. An L2 entry
//! with the high bit set addresses a zlib-compressed cluster; the
//! compressed byte length (minus one) is packed into the entry's high
//! `cluster_bits` bits.
//!
//! The decoder keeps three bounded LRU caches (L2 tables, clusters,
//! cooked 512-byte sectors) sharing one byte budget per kind. Caching is
//! transparent: cold and warm reads return identical bytes.

use std::num::NonZeroUsize;

use flate2::{Decompress, FlushDecompress, Status};
use lru::LruCache;
use relic_filters::Filter;
use relic_image::{
    BaseImage, Geometry, ImageError, ImageInfo, ImageResult, MediaType, XmlMediaType,
};
use relic_util::dates;
use relic_util::endian::{be_u32, be_u64};

use crate::registry::{FormatPlugin, OpenedImage};

pub const QCOW_MAGIC: u32 = 0x5146_49FB;
const QCOW_VERSION: u32 = 1;
const HEADER_LEN: usize = 48;

const SECTOR_SIZE: usize = 512;
const COMPRESSED_FLAG: u64 = 1 << 63;

/// Byte budget per cache kind.
const MAX_CACHE_SIZE: u64 = 16 * 1024 * 1024;

/// Synthesized geometry of block images without a real one.
const HEADS: u64 = 16;
const SECTORS_PER_TRACK: u64 = 63;

/// Format plugin for QCOW v1.
pub struct QcowFormat;

impl FormatPlugin for QcowFormat {
    fn name(&self) -> &'static str {
        "QCOW"
    }

    fn identify(&self, filter: &mut Filter) -> bool {
        let mut head = [0u8; 8];
        if filter.read_at(0, &mut head).is_err() {
            return false;
        }
        u32::from_be_bytes([head[0], head[1], head[2], head[3]]) == QCOW_MAGIC
            && u32::from_be_bytes([head[4], head[5], head[6], head[7]]) == QCOW_VERSION
    }

    fn open(&self, filter: Filter) -> ImageResult<OpenedImage> {
        Ok(OpenedImage::Block(Box::new(QcowImage::open(filter)?)))
    }
}

struct QcowHeader {
    mtime: u32,
    size: u64,
    cluster_bits: u32,
    l2_bits: u32,
    l1_table_offset: u64,
}

impl QcowHeader {
    fn parse(filter: &mut Filter) -> ImageResult<Self> {
        if filter.length() < HEADER_LEN as u64 {
            return Err(ImageError::CorruptImage("qcow header truncated"));
        }
        let mut raw = [0u8; HEADER_LEN];
        filter.read_at(0, &mut raw)?;

        let magic = be_u32(&raw[0..4]);
        let version = be_u32(&raw[4..8]);
        let backing_file_offset = be_u64(&raw[8..16]);
        let mtime = be_u32(&raw[20..24]);
        let size = be_u64(&raw[24..32]);
        let cluster_bits = u32::from(raw[32]);
        let l2_bits = u32::from(raw[33]);
        // raw[34..36] is padding.
        let crypt_method = be_u32(&raw[36..40]);
        let l1_table_offset = be_u64(&raw[40..48]);

        if magic != QCOW_MAGIC {
            return Err(ImageError::CorruptImage("qcow magic mismatch"));
        }
        if version != QCOW_VERSION {
            return Err(ImageError::CorruptImage("qcow version is not 1"));
        }
        if crypt_method != 0 {
            return Err(ImageError::FeatureNotImplemented("qcow AES encryption"));
        }
        if backing_file_offset != 0 {
            return Err(ImageError::FeatureNotImplemented(
                "qcow differencing (backing file)",
            ));
        }
        if !(9..=16).contains(&cluster_bits) {
            return Err(ImageError::CorruptImage("qcow cluster_bits out of range"));
        }
        if !(6..=13).contains(&l2_bits) {
            return Err(ImageError::CorruptImage("qcow l2_bits out of range"));
        }
        let shift = cluster_bits + l2_bits;
        if size > u64::MAX - (1u64 << shift) {
            return Err(ImageError::CorruptImage("qcow size overflows addressing"));
        }
        if size == 0 || !size.is_multiple_of(SECTOR_SIZE as u64) {
            return Err(ImageError::CorruptImage(
                "qcow size is not a multiple of the sector size",
            ));
        }

        Ok(Self {
            mtime,
            size,
            cluster_bits,
            l2_bits,
            l1_table_offset,
        })
    }
}

/// An opened QCOW v1 image.
pub struct QcowImage {
    filter: Filter,
    info: ImageInfo,

    sectors: u64,
    cluster_size: u64,
    l2_size: u64,
    l1_shift: u32,
    l1_mask: u64,
    l2_mask: u64,
    sector_mask: u64,
    comp_mask: u64,
    cluster_bits: u32,

    l1: Vec<u64>,

    /// L2 tables keyed by L1 index.
    l2_cache: LruCache<u64, Vec<u64>>,
    /// Decoded clusters keyed by their L2 entry.
    cluster_cache: LruCache<u64, Vec<u8>>,
    /// Cooked sectors keyed by sector address.
    sector_cache: LruCache<u64, Vec<u8>>,
}

impl QcowImage {
    pub fn open(mut filter: Filter) -> ImageResult<Self> {
        let header = QcowHeader::parse(&mut filter)?;

        let shift = header.cluster_bits + header.l2_bits;
        let cluster_size = 1u64 << header.cluster_bits;
        let l2_size = 1u64 << header.l2_bits;
        let l1_size = header.size.div_ceil(1u64 << shift);

        let l1_bytes = l1_size
            .checked_mul(8)
            .ok_or(ImageError::OffsetOverflow)?;
        let l1_entries: usize = l1_size
            .try_into()
            .map_err(|_| ImageError::CorruptImage("qcow l1 table too large"))?;
        let l1_bytes_usize: usize = l1_bytes
            .try_into()
            .map_err(|_| ImageError::CorruptImage("qcow l1 table too large"))?;
        let l1_end = header
            .l1_table_offset
            .checked_add(l1_bytes)
            .ok_or(ImageError::OffsetOverflow)?;
        if l1_end > filter.length() {
            return Err(ImageError::CorruptImage("qcow l1 table truncated"));
        }

        let mut l1_raw = Vec::new();
        l1_raw
            .try_reserve_exact(l1_bytes_usize)
            .map_err(|_| ImageError::CorruptImage("qcow l1 table too large"))?;
        l1_raw.resize(l1_bytes_usize, 0);
        filter.read_at(header.l1_table_offset, &mut l1_raw)?;

        let mut l1 = Vec::new();
        l1.try_reserve_exact(l1_entries)
            .map_err(|_| ImageError::CorruptImage("qcow l1 table too large"))?;
        for chunk in l1_raw.chunks_exact(8) {
            l1.push(be_u64(chunk));
        }

        let sectors = header.size / SECTOR_SIZE as u64;
        let geometry = Geometry {
            cylinders: (sectors / HEADS / SECTORS_PER_TRACK) as u32,
            heads: HEADS as u32,
            sectors_per_track: SECTORS_PER_TRACK as u32,
        };

        let info = ImageInfo {
            sectors,
            sector_size: SECTOR_SIZE as u32,
            media_type: MediaType::GenericHdd,
            xml_media_type: XmlMediaType::BlockMedia,
            image_size: filter.length(),
            application: Some("QEMU".to_string()),
            last_modification_time: dates::from_unix_seconds(header.mtime)
                .or(filter.last_write_time()),
            creation_time: filter.creation_time(),
            geometry: Some(geometry),
            ..ImageInfo::default()
        };

        let l2_cache_cap = cache_entries(MAX_CACHE_SIZE, l2_size * 8)?;
        let cluster_cache_cap = cache_entries(MAX_CACHE_SIZE, cluster_size)?;
        let sector_cache_cap = cache_entries(MAX_CACHE_SIZE, SECTOR_SIZE as u64)?;

        Ok(Self {
            filter,
            info,
            sectors,
            cluster_size,
            l2_size,
            l1_shift: shift,
            l1_mask: !((1u64 << shift) - 1),
            l2_mask: (l2_size - 1) << header.cluster_bits,
            sector_mask: cluster_size - 1,
            comp_mask: (cluster_size - 1) << (63 - header.cluster_bits),
            cluster_bits: header.cluster_bits,
            l1,
            l2_cache: LruCache::new(l2_cache_cap),
            cluster_cache: LruCache::new(cluster_cache_cap),
            sector_cache: LruCache::new(sector_cache_cap),
        })
    }

    /// Consume the image and return the backing filter.
    pub fn into_filter(self) -> Filter {
        self.filter
    }

    fn read_exact_at(
        &mut self,
        offset: u64,
        buf: &mut [u8],
        ctx: &'static str,
    ) -> ImageResult<()> {
        match self.filter.read_at(offset, buf) {
            Ok(()) => Ok(()),
            Err(relic_filters::FilterError::OutOfBounds { .. }) => {
                Err(ImageError::CorruptImage(ctx))
            }
            Err(e) => Err(ImageError::Io(e)),
        }
    }

    fn ensure_l2_cached(&mut self, l1_index: u64) -> ImageResult<()> {
        if self.l2_cache.get(&l1_index).is_some() {
            return Ok(());
        }
        let l2_offset = self.l1[l1_index as usize];
        let l2_bytes: usize = (self.l2_size * 8)
            .try_into()
            .map_err(|_| ImageError::OffsetOverflow)?;
        let mut raw = Vec::new();
        raw.try_reserve_exact(l2_bytes)
            .map_err(|_| ImageError::CorruptImage("qcow l2 table too large"))?;
        raw.resize(l2_bytes, 0);
        self.read_exact_at(l2_offset, &mut raw, "qcow l2 table truncated")?;

        let mut table = Vec::new();
        table
            .try_reserve_exact(l2_bytes / 8)
            .map_err(|_| ImageError::CorruptImage("qcow l2 table too large"))?;
        for chunk in raw.chunks_exact(8) {
            table.push(be_u64(chunk));
        }
        self.l2_cache.push(l1_index, table);
        Ok(())
    }

    /// Decode the cluster behind an L2 entry, through the cluster cache.
    fn load_cluster(&mut self, entry: u64) -> ImageResult<()> {
        if self.cluster_cache.get(&entry).is_some() {
            return Ok(());
        }
        let cluster_size: usize = self
            .cluster_size
            .try_into()
            .map_err(|_| ImageError::OffsetOverflow)?;

        let cluster = if entry & COMPRESSED_FLAG != 0 {
            let comp_size = ((entry & self.comp_mask) >> (63 - self.cluster_bits)) + 1;
            let real_offset = entry & !self.comp_mask & !COMPRESSED_FLAG;
            let comp_size_usize: usize = comp_size
                .try_into()
                .map_err(|_| ImageError::OffsetOverflow)?;
            let mut compressed = vec![0u8; comp_size_usize];
            self.read_exact_at(real_offset, &mut compressed, "qcow compressed cluster truncated")?;
            inflate_cluster(&compressed, cluster_size)?
        } else {
            let mut cluster = vec![0u8; cluster_size];
            self.read_exact_at(entry, &mut cluster, "qcow data cluster truncated")?;
            cluster
        };

        self.cluster_cache.push(entry, cluster);
        Ok(())
    }

    fn read_sector_uncached(&mut self, sector: u64) -> ImageResult<Vec<u8>> {
        let byte_addr = sector
            .checked_mul(SECTOR_SIZE as u64)
            .ok_or(ImageError::OffsetOverflow)?;

        let l1_index = (byte_addr & self.l1_mask) >> self.l1_shift;
        if l1_index as usize >= self.l1.len() {
            return Err(ImageError::CorruptImage("qcow l1 index out of range"));
        }
        if self.l1[l1_index as usize] == 0 {
            return Ok(vec![0u8; SECTOR_SIZE]);
        }

        self.ensure_l2_cached(l1_index)?;
        let l2_index = (byte_addr & self.l2_mask) >> self.cluster_bits;
        let entry = {
            let table = self
                .l2_cache
                .get(&l1_index)
                .ok_or(ImageError::CorruptImage("qcow l2 cache missing"))?;
            *table
                .get(l2_index as usize)
                .ok_or(ImageError::CorruptImage("qcow l2 index out of range"))?
        };
        if entry == 0 {
            return Ok(vec![0u8; SECTOR_SIZE]);
        }

        self.load_cluster(entry)?;
        let cluster = self
            .cluster_cache
            .get(&entry)
            .ok_or(ImageError::CorruptImage("qcow cluster cache missing"))?;
        let within = (byte_addr & self.sector_mask) as usize;
        Ok(cluster[within..within + SECTOR_SIZE].to_vec())
    }
}

fn cache_entries(budget: u64, entry_size: u64) -> ImageResult<NonZeroUsize> {
    let entries = (budget / entry_size).max(1);
    let entries: usize = entries.try_into().map_err(|_| ImageError::OffsetOverflow)?;
    NonZeroUsize::new(entries).ok_or(ImageError::CorruptImage("cache bound is zero"))
}

/// Raw-deflate a compressed cluster into exactly `cluster_size` bytes.
fn inflate_cluster(input: &[u8], cluster_size: usize) -> ImageResult<Vec<u8>> {
    let mut out = vec![0u8; cluster_size];
    let mut decoder = Decompress::new(false);
    loop {
        let in_pos = decoder.total_in() as usize;
        let out_pos = decoder.total_out() as usize;
        let status = decoder
            .decompress(&input[in_pos..], &mut out[out_pos..], FlushDecompress::Finish)
            .map_err(|_| ImageError::CorruptImage("qcow compressed cluster is not deflate"))?;
        if decoder.total_out() as usize == cluster_size {
            return Ok(out);
        }
        let stalled = decoder.total_in() as usize == in_pos
            && decoder.total_out() as usize == out_pos;
        if status == Status::StreamEnd || stalled {
            return Err(ImageError::CorruptImage(
                "qcow compressed cluster expands to the wrong size",
            ));
        }
    }
}

impl BaseImage for QcowImage {
    fn info(&self) -> &ImageInfo {
        &self.info
    }

    fn read_sector(&mut self, lba: u64) -> ImageResult<Vec<u8>> {
        if lba >= self.sectors {
            return Err(ImageError::OutOfBounds {
                lba,
                sectors: self.sectors,
            });
        }
        if let Some(sector) = self.sector_cache.get(&lba) {
            return Ok(sector.clone());
        }
        let sector = self.read_sector_uncached(lba)?;
        self.sector_cache.push(lba, sector.clone());
        Ok(sector)
    }

    fn read_sectors(&mut self, lba: u64, count: u32) -> ImageResult<Vec<u8>> {
        let end = lba
            .checked_add(u64::from(count))
            .ok_or(ImageError::OffsetOverflow)?;
        if end > self.sectors {
            return Err(ImageError::OutOfBounds {
                lba: end.saturating_sub(1),
                sectors: self.sectors,
            });
        }
        let mut out = Vec::new();
        out.try_reserve_exact(count as usize * SECTOR_SIZE)
            .map_err(|_| ImageError::AllocationLimit)?;
        for sector in lba..end {
            out.extend_from_slice(&self.read_sector(sector)?);
        }
        Ok(out)
    }
}
