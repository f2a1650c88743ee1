//! Presentation template container.
//!
//! Reads a `.pptx` package, exposes the slides → shapes → text body →
//! paragraphs → runs hierarchy for in-place text edits, and writes the
//! package back out with only the edited run text changed.
//!
//! # Module Organization
//!
//! - [`package`] - zip container access and slide ordering
//! - [`slide`] - slide XML parsing and span-based text rewriting

pub mod package;
pub mod slide;

#[cfg(test)]
pub mod fixture;

pub use package::Package;
pub use slide::{Paragraph, Run, Shape, Slide, TextBody};

use log::debug;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Result type for template container operations.
pub type Result<T> = std::result::Result<T, PresentationError>;

/// Errors raised while reading or writing a presentation.
#[derive(Error, Debug)]
pub enum PresentationError {
    /// Container is not a readable zip archive
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Malformed part XML
    #[error("XML error: {0}")]
    Xml(String),

    /// A required part is absent
    #[error("Part not found: {0}")]
    MissingPart(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<quick_xml::Error> for PresentationError {
    fn from(err: quick_xml::Error) -> Self {
        PresentationError::Xml(err.to_string())
    }
}

/// An in-memory, independently editable presentation.
#[derive(Debug, Clone)]
pub struct Presentation {
    package: Package,
    slides: Vec<Slide>,
}

impl Presentation {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let package = Package::from_bytes(bytes)?;
        let slides = package
            .slide_parts()?
            .into_iter()
            .map(|name| {
                let xml = package.part_str(&name)?;
                Slide::parse(name, xml)
            })
            .collect::<Result<Vec<_>>>()?;
        debug!("Loaded presentation with {} slides", slides.len());
        Ok(Presentation { package, slides })
    }

    pub fn open(path: &Path) -> Result<Self> {
        Self::from_bytes(&fs::read(path)?)
    }

    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    pub fn slides_mut(&mut self) -> &mut [Slide] {
        &mut self.slides
    }

    /// Iterate every shape of every slide
    pub fn shapes_mut(&mut self) -> impl Iterator<Item = &mut Shape> {
        self.slides.iter_mut().flat_map(|s| s.shapes_mut().iter_mut())
    }

    /// Serialize the package, rewriting only slides that were edited
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let replaced: HashMap<&str, String> =
            self.slides.iter().filter(|s| s.is_modified()).map(|s| (s.part_name(), s.to_xml())).collect();
        debug!("Writing presentation with {} edited slides", replaced.len());
        self.package.to_bytes(&replaced)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_bytes()?)?;
        Ok(())
    }
}

/// Where each row's fresh copy of the template comes from.
pub trait TemplateSource {
    /// Produce a new, independent copy of the template
    fn load(&self) -> Result<Presentation>;
}

/// A template read from disk once; every `load` parses a fresh copy.
#[derive(Debug, Clone)]
pub struct TemplateFile {
    bytes: Vec<u8>,
}

impl TemplateFile {
    /// Read and validate the template
    pub fn open(path: &Path) -> Result<Self> {
        Self::from_bytes(fs::read(path)?)
    }

    /// Wrap template bytes, rejecting anything that does not parse
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Presentation::from_bytes(&bytes)?;
        Ok(TemplateFile { bytes })
    }
}

impl TemplateSource for TemplateFile {
    fn load(&self) -> Result<Presentation> {
        Presentation::from_bytes(&self.bytes)
    }
}
