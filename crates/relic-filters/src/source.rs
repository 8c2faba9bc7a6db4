use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::{FilterError, Result};

/// A read-only, byte-addressed backing store for an opened artifact.
///
/// Positionless by design: every read names its offset, so container
/// probing never disturbs a shared cursor.
pub trait FilterSource {
    /// Total length in bytes.
    fn len(&mut self) -> Result<u64>;

    fn is_empty(&mut self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Read exactly `buf.len()` bytes at `offset`.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()>;
}

/// A source backed by a regular file.
pub struct FileSource {
    file: File,
    len: u64,
}

impl FileSource {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| FilterError::CannotOpen(format!("{}: {e}", path.display())))?;
        let len = file
            .metadata()
            .map_err(|e| FilterError::CannotOpen(format!("{}: {e}", path.display())))?
            .len();
        Ok(Self { file, len })
    }
}

impl FilterSource for FileSource {
    fn len(&mut self) -> Result<u64> {
        Ok(self.len)
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let end = offset
            .checked_add(buf.len() as u64)
            .ok_or(FilterError::OffsetOverflow)?;
        if end > self.len {
            return Err(FilterError::OutOfBounds {
                offset,
                len: buf.len(),
                fork_len: self.len,
            });
        }
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)?;
        Ok(())
    }
}

/// In-memory source used for byte-blob opens and tests.
#[derive(Clone, Debug, Default)]
pub struct MemSource {
    data: Vec<u8>,
}

impl MemSource {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl FilterSource for MemSource {
    fn len(&mut self) -> Result<u64> {
        Ok(self.data.len() as u64)
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let offset_usize: usize = offset.try_into().map_err(|_| FilterError::OffsetOverflow)?;
        let end = offset_usize
            .checked_add(buf.len())
            .ok_or(FilterError::OffsetOverflow)?;
        if end > self.data.len() {
            return Err(FilterError::OutOfBounds {
                offset,
                len: buf.len(),
                fork_len: self.data.len() as u64,
            });
        }
        buf.copy_from_slice(&self.data[offset_usize..end]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mem_source_bounds() {
        let mut src = MemSource::new(vec![1, 2, 3, 4]);
        let mut buf = [0u8; 2];
        src.read_at(1, &mut buf).unwrap();
        assert_eq!(buf, [2, 3]);
        assert!(matches!(
            src.read_at(3, &mut buf),
            Err(FilterError::OutOfBounds { .. })
        ));
    }
}
