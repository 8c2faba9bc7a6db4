use thiserror::Error;

pub type Result<T> = std::result::Result<T, FilterError>;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("cannot open {0}")]
    CannotOpen(String),

    #[error("out of bounds: offset={offset} len={len} fork_len={fork_len}")]
    OutOfBounds {
        offset: u64,
        len: usize,
        fork_len: u64,
    },

    #[error("corrupt container: {0}")]
    CorruptContainer(&'static str),

    #[error("artifact has no resource fork")]
    NoResourceFork,

    #[error("integer overflow while computing byte offsets")]
    OffsetOverflow,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
