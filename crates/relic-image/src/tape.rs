use crate::image::BaseImage;

/// One file on a tape: an ordered run of blocks between file marks.
///
/// Block size may differ from file to file; within a file, blocks are
/// randomly addressable by index. Traversal across files is sequential.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TapeFile {
    /// 0-based position on the tape.
    pub file_number: u64,
    pub first_block: u64,
    /// Inclusive.
    pub last_block: u64,
}

/// Capabilities of sequential, file/block-structured media.
///
/// "Sector" in the [`BaseImage`] operations means "block" here.
pub trait TapeImage: BaseImage {
    fn files(&self) -> &[TapeFile];

    /// Block size of the file containing `block`, in bytes.
    fn block_size(&self, block: u64) -> Option<u32>;
}
