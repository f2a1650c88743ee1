/// Result packaging
///
/// This module handles:
/// - Collecting the generated `.pptx` files from an output directory
/// - Leaving out inputs that happen to live there (template, data file)
/// - Bundling them as a zip or tar.gz archive
use crate::error::BatchError;
use clap::ValueEnum;
use flate2::Compression;
use flate2::write::GzEncoder;
use log::debug;
use serde::Deserialize;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;

/// Archive container for packaged results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArchiveFormat {
    Zip,
    TarGz,
    /// Leave the files loose in the output directory
    #[default]
    None,
}

impl ArchiveFormat {
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            ArchiveFormat::Zip => Some("zip"),
            ArchiveFormat::TarGz => Some("tar.gz"),
            ArchiveFormat::None => None,
        }
    }
}

/// Bundles the presentations found in one directory
pub struct ResultPackager {
    dir: PathBuf,
    format: ArchiveFormat,
    excluded: Vec<PathBuf>,
}

impl ResultPackager {
    pub fn new(dir: impl Into<PathBuf>, format: ArchiveFormat) -> Self {
        ResultPackager { dir: dir.into(), format, excluded: Vec::new() }
    }

    /// Never package `path`, even if it is a presentation in the directory
    pub fn exclude(mut self, path: impl AsRef<Path>) -> Self {
        self.excluded.push(normalize(path.as_ref()));
        self
    }

    /// Presentations that would be packaged, sorted by file name
    pub fn entries(&self) -> Result<Vec<PathBuf>, BatchError> {
        let listing = fs::read_dir(&self.dir)
            .map_err(|e| BatchError::Persistence(format!("Cannot list {}: {}", self.dir.display(), e)))?;

        let mut entries = Vec::new();
        for entry in listing {
            let path = entry.map_err(|e| BatchError::Persistence(e.to_string()))?.path();
            let is_pptx =
                path.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case("pptx"));
            if !is_pptx || !path.is_file() {
                continue;
            }
            if self.excluded.contains(&normalize(&path)) {
                debug!("Not packaging input file {:?}", path);
                continue;
            }
            entries.push(path);
        }

        entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(entries)
    }

    /// Build the archive in memory
    pub fn package(&self) -> Result<Vec<u8>, BatchError> {
        let entries = self.entries()?;
        debug!("Packaging {} presentations as {:?}", entries.len(), self.format);

        match self.format {
            ArchiveFormat::Zip => zip_entries(&entries),
            ArchiveFormat::TarGz => tar_gz_entries(&entries),
            ArchiveFormat::None => {
                Err(BatchError::Configuration("no archive format selected for packaging".to_string()))
            }
        }
    }

    /// Build the archive and write it to `path`; returns the number of files packaged
    pub fn write_to(&self, path: &Path) -> Result<usize, BatchError> {
        let count = self.entries()?.len();
        let bytes = self.package()?;
        fs::write(path, bytes)
            .map_err(|e| BatchError::Persistence(format!("Cannot write archive {}: {}", path.display(), e)))?;
        Ok(count)
    }
}

fn normalize(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn entry_name(path: &Path) -> Result<String, BatchError> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_string())
        .ok_or_else(|| BatchError::Persistence(format!("Unusable file name {:?}", path)))
}

fn zip_entries(entries: &[PathBuf]) -> Result<Vec<u8>, BatchError> {
    let persist = |e: zip::result::ZipError| BatchError::Persistence(format!("zip: {}", e));

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for path in entries {
        let data = fs::read(path).map_err(|e| BatchError::Persistence(format!("{}: {}", path.display(), e)))?;
        writer.start_file(entry_name(path)?, options).map_err(persist)?;
        writer.write_all(&data).map_err(|e| BatchError::Persistence(e.to_string()))?;
    }

    Ok(writer.finish().map_err(persist)?.into_inner())
}

fn tar_gz_entries(entries: &[PathBuf]) -> Result<Vec<u8>, BatchError> {
    let persist = |e: std::io::Error| BatchError::Persistence(format!("tar.gz: {}", e));

    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for path in entries {
        builder.append_path_with_name(path, entry_name(path)?).map_err(persist)?;
    }

    builder.into_inner().map_err(persist)?.finish().map_err(persist)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use tempfile::TempDir;

    fn populate(dir: &Path) {
        fs::write(dir.join("template.pptx"), b"template").unwrap();
        fs::write(dir.join("data.xlsx"), b"data").unwrap();
        fs::write(dir.join("S1.pptx"), b"one").unwrap();
        fs::write(dir.join("S2.PPTX"), b"two").unwrap();
        fs::write(dir.join("S3.pptx"), b"three").unwrap();
        fs::write(dir.join("notes.txt"), b"notes").unwrap();
    }

    #[test]
    fn test_only_generated_presentations_are_packaged() {
        let dir = TempDir::new().unwrap();
        populate(dir.path());

        let packager = ResultPackager::new(dir.path(), ArchiveFormat::Zip).exclude(dir.path().join("template.pptx"));
        let names: Vec<String> =
            packager.entries().unwrap().iter().map(|p| p.file_name().unwrap().to_string_lossy().into_owned()).collect();

        assert_eq!(names, vec!["S1.pptx", "S2.PPTX", "S3.pptx"]);
    }

    #[test]
    fn test_zip_archive_contents() {
        let dir = TempDir::new().unwrap();
        populate(dir.path());

        let bytes = ResultPackager::new(dir.path(), ArchiveFormat::Zip)
            .exclude(dir.path().join("template.pptx"))
            .package()
            .unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 3);
        let mut content = String::new();
        archive.by_name("S3.pptx").unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "three");
    }

    #[test]
    fn test_tar_gz_archive_contents() {
        let dir = TempDir::new().unwrap();
        populate(dir.path());

        let bytes = ResultPackager::new(dir.path(), ArchiveFormat::TarGz)
            .exclude(dir.path().join("template.pptx"))
            .package()
            .unwrap();

        let mut archive = tar::Archive::new(GzDecoder::new(Cursor::new(bytes)));
        let mut names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["S1.pptx", "S2.PPTX", "S3.pptx"]);
    }

    #[test]
    fn test_write_to_reports_count() {
        let dir = TempDir::new().unwrap();
        populate(dir.path());
        let target = dir.path().join("results.zip");

        let count = ResultPackager::new(dir.path(), ArchiveFormat::Zip)
            .exclude(dir.path().join("template.pptx"))
            .write_to(&target)
            .unwrap();

        assert_eq!(count, 3);
        assert!(target.exists());
    }

    #[test]
    fn test_missing_directory_is_persistence_error() {
        let result = ResultPackager::new("/nonexistent/deckmill-out", ArchiveFormat::Zip).package();
        assert!(matches!(result, Err(BatchError::Persistence(_))));
    }

    #[test]
    fn test_archive_extension() {
        assert_eq!(ArchiveFormat::TarGz.extension(), Some("tar.gz"));
        assert_eq!(ArchiveFormat::None.extension(), None);
    }
}
