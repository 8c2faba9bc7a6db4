//! Low-level primitives shared by the relic image crates.
//!
//! Disk image containers are fixed-layout binary records with an explicit
//! byte order, frequently produced on platforms with their own timestamp
//! epochs. This crate provides:
//!
//! - [`endian`]: bounds-checked big/little-endian slice readers and a
//!   cursor ([`endian::Reader`]) that consumes exactly the size of the
//!   record it decodes
//! - [`dates`]: Mac (1904), Unix (1970, signed and unsigned) and DOS
//!   packed date-time conversion to [`std::time::SystemTime`]

pub mod dates;
pub mod endian;

pub use endian::{Reader, Truncated};
