//! Byte-source layer for the relic image suite.
//!
//! Every container decoder consumes a [`Filter`]: an opened artifact with a
//! seekable data fork, an optional resource fork, and timestamps. Opening a
//! path (or an owned byte blob) probes the known *container* formats —
//! AppleSingle and MacBinary wrap a Mac file's forks and metadata inside a
//! single flat file — and, when one matches, remaps the fork windows so the
//! rest of the stack only ever sees the logical data fork.
//!
//! The layer is read-only. A `Filter` owns its source and is immutable
//! after open; dropping it (or calling [`Filter::close`]) releases the
//! underlying file handle.

mod applesingle;
mod error;
mod filter;
mod macbinary;
mod source;

pub use applesingle::is_applesingle;
pub use error::{FilterError, Result};
pub use filter::Filter;
pub use macbinary::is_macbinary;
pub use source::{FileSource, FilterSource, MemSource};
