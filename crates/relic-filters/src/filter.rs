use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::source::{FileSource, FilterSource, MemSource};
use crate::{FilterError, Result, applesingle, macbinary};

/// A byte window into the underlying source. Position 0 of the fork maps
/// to `offset`; reads past `offset + len` are truncated or rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ForkWindow {
    pub offset: u64,
    pub len: u64,
}

impl ForkWindow {
    pub(crate) fn whole(len: u64) -> Self {
        Self { offset: 0, len }
    }
}

/// Fork layout and metadata recovered by a container probe.
pub(crate) struct ContainerLayout {
    pub data: ForkWindow,
    pub resource: Option<ForkWindow>,
    pub creation_time: Option<SystemTime>,
    pub last_write_time: Option<SystemTime>,
}

/// An opened artifact: a named, seekable data fork plus an optional
/// resource fork and timestamps. Immutable after open.
pub struct Filter {
    source: Box<dyn FilterSource>,
    base_path: PathBuf,
    data: ForkWindow,
    resource: Option<ForkWindow>,
    creation_time: Option<SystemTime>,
    last_write_time: Option<SystemTime>,
}

impl Filter {
    /// Open a path, unwrapping a recognized container if one is present.
    pub fn open(path: &Path) -> Result<Self> {
        let mut source = FileSource::open(path)?;

        let metadata = std::fs::metadata(path)?;
        let fs_created = metadata.created().ok();
        let fs_modified = metadata.modified().ok();

        let layout = probe_containers(&mut source)?;
        let len = source.len()?;
        Ok(match layout {
            Some(layout) => {
                log::debug!("{}: container forks unwrapped", path.display());
                Self {
                    source: Box::new(source),
                    base_path: path.to_path_buf(),
                    data: layout.data,
                    resource: layout.resource,
                    creation_time: layout.creation_time.or(fs_created),
                    last_write_time: layout.last_write_time.or(fs_modified),
                }
            }
            None => Self {
                source: Box::new(source),
                base_path: path.to_path_buf(),
                data: ForkWindow::whole(len),
                resource: None,
                creation_time: fs_created,
                last_write_time: fs_modified,
            },
        })
    }

    /// Open an owned byte blob under a display name.
    pub fn from_bytes(name: &str, bytes: Vec<u8>) -> Result<Self> {
        let mut source = MemSource::new(bytes);
        let layout = probe_containers(&mut source)?;
        let len = source.len()?;
        let (data, resource, creation_time, last_write_time) = match layout {
            Some(l) => (l.data, l.resource, l.creation_time, l.last_write_time),
            None => (ForkWindow::whole(len), None, None, None),
        };
        Ok(Self {
            source: Box::new(source),
            base_path: PathBuf::from(name),
            data,
            resource,
            creation_time,
            last_write_time,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn filename(&self) -> Option<&str> {
        self.base_path.file_name().and_then(|n| n.to_str())
    }

    pub fn parent_folder(&self) -> Option<&Path> {
        self.base_path.parent()
    }

    /// Data fork length in bytes.
    pub fn length(&self) -> u64 {
        self.data.len
    }

    pub fn creation_time(&self) -> Option<SystemTime> {
        self.creation_time
    }

    pub fn last_write_time(&self) -> Option<SystemTime> {
        self.last_write_time
    }

    pub fn has_resource_fork(&self) -> bool {
        self.resource.is_some()
    }

    pub fn resource_fork_length(&self) -> u64 {
        self.resource.map(|r| r.len).unwrap_or(0)
    }

    /// Read exactly `buf.len()` bytes of the data fork at `offset`.
    pub fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        read_window(self.source.as_mut(), self.data, offset, buf)
    }

    /// Read up to `buf.len()` bytes of the data fork at `offset`,
    /// truncating at the fork end. Returns the number of bytes read.
    pub fn read_at_most(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        if offset >= self.data.len {
            return Ok(0);
        }
        let avail = (self.data.len - offset).min(buf.len() as u64) as usize;
        read_window(self.source.as_mut(), self.data, offset, &mut buf[..avail])?;
        Ok(avail)
    }

    /// Read the whole data fork. Intended for small text descriptors.
    pub fn read_fork_to_vec(&mut self) -> Result<Vec<u8>> {
        let len: usize = self
            .data
            .len
            .try_into()
            .map_err(|_| FilterError::OffsetOverflow)?;
        let mut out = vec![0u8; len];
        read_window(self.source.as_mut(), self.data, 0, &mut out)?;
        Ok(out)
    }

    /// Read exactly `buf.len()` bytes of the resource fork at `offset`.
    pub fn read_resource_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let window = self.resource.ok_or(FilterError::NoResourceFork)?;
        read_window(self.source.as_mut(), window, offset, buf)
    }

    /// Release the underlying source.
    pub fn close(self) {}
}

fn read_window(
    source: &mut dyn FilterSource,
    window: ForkWindow,
    offset: u64,
    buf: &mut [u8],
) -> Result<()> {
    let end = offset
        .checked_add(buf.len() as u64)
        .ok_or(FilterError::OffsetOverflow)?;
    if end > window.len {
        return Err(FilterError::OutOfBounds {
            offset,
            len: buf.len(),
            fork_len: window.len,
        });
    }
    let abs = window
        .offset
        .checked_add(offset)
        .ok_or(FilterError::OffsetOverflow)?;
    source.read_at(abs, buf)
}

fn probe_containers(source: &mut dyn FilterSource) -> Result<Option<ContainerLayout>> {
    if let Some(layout) = applesingle::probe(source)? {
        return Ok(Some(layout));
    }
    if let Some(layout) = macbinary::probe(source)? {
        return Ok(Some(layout));
    }
    Ok(None)
}
