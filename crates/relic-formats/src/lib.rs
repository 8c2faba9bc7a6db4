//! Container decoders and the format registry.
//!
//! Each decoder is a [`FormatPlugin`]: a cheap `identify` sniff over a
//! [`relic_filters::Filter`] plus a full `open` that parses metadata and
//! yields an [`OpenedImage`]. The [`Registry`] probes plugins in
//! registration order and the first claim wins.
//!
//! Two decoders ship in-tree:
//!
//! - [`clonecd`]: CloneCD optical images (`.ccd` text descriptor +
//!   `.img` raw data fork + optional `.sub` subchannel fork)
//! - [`qcow`]: QCOW version 1 sparse block images (two-level cluster
//!   indirection, optional zlib cluster compression)

pub mod clonecd;
pub mod qcow;
mod registry;

pub use clonecd::CloneCdFormat;
pub use qcow::QcowFormat;
pub use registry::{FormatPlugin, OpenedImage, Registry, plausible_text};
