use std::path::Path;

use relic_filters::Filter;
use relic_image::{BaseImage, ImageError, ImageResult, OpticalImage, TapeImage};

use crate::clonecd::CloneCdFormat;
use crate::qcow::QcowFormat;

/// An opened image, dispatched by role.
pub enum OpenedImage {
    Optical(Box<dyn OpticalImage>),
    Block(Box<dyn BaseImage>),
    Tape(Box<dyn TapeImage>),
}

impl std::fmt::Debug for OpenedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Optical(_) => f.write_str("OpenedImage::Optical(..)"),
            Self::Block(_) => f.write_str("OpenedImage::Block(..)"),
            Self::Tape(_) => f.write_str("OpenedImage::Tape(..)"),
        }
    }
}

impl OpenedImage {
    pub fn base(&self) -> &dyn BaseImage {
        match self {
            Self::Optical(i) => &**i,
            Self::Block(i) => &**i,
            Self::Tape(i) => &**i,
        }
    }

    pub fn base_mut(&mut self) -> &mut dyn BaseImage {
        match self {
            Self::Optical(i) => &mut **i,
            Self::Block(i) => &mut **i,
            Self::Tape(i) => &mut **i,
        }
    }

    pub fn as_optical_mut(&mut self) -> Option<&mut dyn OpticalImage> {
        match self {
            Self::Optical(i) => Some(&mut **i),
            _ => None,
        }
    }
}

/// One container format: a cheap sniff and a full parse.
///
/// `identify` must be side-effect-free with respect to the filter (all
/// filter reads are positionless, so this holds by construction) and
/// must never crash on hostile input: textual formats guard with
/// [`plausible_text`] before scanning, binary formats bounds-check
/// every read.
pub trait FormatPlugin {
    fn name(&self) -> &'static str;
    fn identify(&self, filter: &mut Filter) -> bool;
    fn open(&self, filter: Filter) -> ImageResult<OpenedImage>;
}

/// Ordered set of format plugins.
pub struct Registry {
    plugins: Vec<Box<dyn FormatPlugin>>,
}

impl Registry {
    pub fn empty() -> Self {
        Self {
            plugins: Vec::new(),
        }
    }

    pub fn register(&mut self, plugin: Box<dyn FormatPlugin>) {
        self.plugins.push(plugin);
    }

    pub fn plugins(&self) -> impl Iterator<Item = &dyn FormatPlugin> {
        self.plugins.iter().map(|p| &**p)
    }

    /// Probe plugins in registration order; first claim wins.
    pub fn detect(&self, filter: &mut Filter) -> Option<&dyn FormatPlugin> {
        self.plugins
            .iter()
            .map(|p| &**p)
            .find(|p| p.identify(filter))
    }

    /// Detect and open in one step.
    pub fn open(&self, mut filter: Filter) -> ImageResult<OpenedImage> {
        let Some(plugin) = self.detect(&mut filter) else {
            return Err(ImageError::NotIdentified);
        };
        log::debug!("{}: identified as {}", filter.base_path().display(), plugin.name());
        plugin.open(filter)
    }

    pub fn open_path(&self, path: &Path) -> ImageResult<OpenedImage> {
        let filter = Filter::open(path).map_err(ImageError::Io)?;
        self.open(filter)
    }
}

impl Default for Registry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(CloneCdFormat));
        registry.register(Box::new(QcowFormat));
        registry
    }
}

/// Guard for textual plugins probing possibly-binary input.
///
/// Scans at most the first 512 bytes and rejects on two consecutive NUL
/// bytes or any control byte other than LF, CR or NUL.
pub fn plausible_text(head: &[u8]) -> bool {
    let head = &head[..head.len().min(512)];
    let mut previous_nul = false;
    for &byte in head {
        match byte {
            0x00 => {
                if previous_nul {
                    return false;
                }
                previous_nul = true;
            }
            b'\n' | b'\r' => previous_nul = false,
            b if b < 0x20 => return false,
            _ => previous_nul = false,
        }
    }
    true
}
