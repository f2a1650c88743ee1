//! The zip container behind a presentation and slide-order resolution.

use super::{PresentationError, Result};
use log::debug;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;

const PRESENTATION_PART: &str = "ppt/presentation.xml";
const PRESENTATION_RELS: &str = "ppt/_rels/presentation.xml.rels";
const SLIDE_REL_TYPE_SUFFIX: &str = "/relationships/slide";

/// Every part of the package, decompressed, in archive order.
#[derive(Debug, Clone)]
pub struct Package {
    parts: Vec<(String, Vec<u8>)>,
}

impl Package {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            parts.push((name, data));
        }
        debug!("Read package with {} parts", parts.len());

        let package = Package { parts };
        if package.part(PRESENTATION_PART).is_none() {
            return Err(PresentationError::MissingPart(PRESENTATION_PART.to_string()));
        }
        Ok(package)
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts.iter().find(|(n, _)| n == name).map(|(_, d)| d.as_slice())
    }

    pub fn part_str(&self, name: &str) -> Result<String> {
        let data = self.part(name).ok_or_else(|| PresentationError::MissingPart(name.to_string()))?;
        String::from_utf8(data.to_vec()).map_err(|e| PresentationError::Xml(format!("{}: {}", name, e)))
    }

    /// Write the package back out, substituting `replaced` parts.
    pub fn to_bytes(&self, replaced: &HashMap<&str, String>) -> Result<Vec<u8>> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        for (name, data) in &self.parts {
            writer.start_file(name.as_str(), options)?;
            match replaced.get(name.as_str()) {
                Some(xml) => writer.write_all(xml.as_bytes())?,
                None => writer.write_all(data)?,
            }
        }

        Ok(writer.finish()?.into_inner())
    }

    /// Slide part names in presentation order.
    ///
    /// Follows `sldIdLst` in `ppt/presentation.xml` through the package
    /// relationships; if that yields nothing, falls back to every
    /// `ppt/slides/slideN.xml` sorted by N.
    pub fn slide_parts(&self) -> Result<Vec<String>> {
        let ordered = self.slide_parts_from_relationships()?;
        if !ordered.is_empty() {
            return Ok(ordered);
        }

        debug!("No slide relationships found, ordering slides by file name");
        let mut numbered: Vec<(u32, String)> = self
            .parts
            .iter()
            .filter_map(|(name, _)| {
                let n = name.strip_prefix("ppt/slides/slide")?.strip_suffix(".xml")?.parse().ok()?;
                Some((n, name.clone()))
            })
            .collect();
        numbered.sort();
        Ok(numbered.into_iter().map(|(_, name)| name).collect())
    }

    fn slide_parts_from_relationships(&self) -> Result<Vec<String>> {
        let Some(rels) = self.part(PRESENTATION_RELS) else {
            return Ok(Vec::new());
        };
        let targets = slide_targets(std::str::from_utf8(rels).map_err(|e| PresentationError::Xml(e.to_string()))?)?;
        let ids = slide_rel_ids(&self.part_str(PRESENTATION_PART)?)?;

        Ok(ids
            .iter()
            .filter_map(|id| targets.get(id))
            .map(|target| resolve_target("ppt", target))
            .filter(|name| self.part(name).is_some())
            .collect())
    }
}

/// Relationship id -> target for slide relationships
fn slide_targets(xml: &str) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_str(xml);
    let mut targets = HashMap::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let mut id = None;
                let mut target = None;
                let mut is_slide = false;
                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value).into_owned();
                    match attr.key.as_ref() {
                        b"Id" => id = Some(value),
                        b"Target" => target = Some(value),
                        b"Type" => is_slide = value.ends_with(SLIDE_REL_TYPE_SUFFIX),
                        _ => {}
                    }
                }
                if let (true, Some(id), Some(target)) = (is_slide, id, target) {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(targets)
}

/// `r:id` of every `sldId`, in document order
fn slide_rel_ids(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut ids = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sldId" => {
                let rel = e
                    .attributes()
                    .flatten()
                    .find(|a| a.key.prefix().is_some() && a.key.local_name().as_ref() == b"id");
                if let Some(attr) = rel {
                    ids.push(String::from_utf8_lossy(&attr.value).into_owned());
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(ids)
}

/// Resolve a relationship target relative to the source part's directory.
fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}
