//! PDF conversion of generated presentations.
//!
//! Conversion is delegated to an office suite running headless; the default
//! implementation shells out to LibreOffice's `soffice`.

use crate::types::{DeliveryOutcome, PostProcessReport, StepKind};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("failed to launch {binary}: {source}")]
    Launch { binary: String, source: std::io::Error },

    #[error("converter exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("converter reported success but {0} was not written")]
    MissingOutput(PathBuf),
}

/// Turns one document into a PDF inside `out_dir`
pub trait Converter {
    fn convert(&self, input: &Path, out_dir: &Path) -> Result<PathBuf, ConvertError>;
}

/// LibreOffice in headless mode
#[derive(Debug, Clone)]
pub struct SofficeConverter {
    binary: PathBuf,
}

impl Default for SofficeConverter {
    fn default() -> Self {
        SofficeConverter { binary: PathBuf::from("soffice") }
    }
}

impl SofficeConverter {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        SofficeConverter { binary: binary.into() }
    }
}

impl Converter for SofficeConverter {
    fn convert(&self, input: &Path, out_dir: &Path) -> Result<PathBuf, ConvertError> {
        debug!("Converting {:?} to PDF with {:?}", input, self.binary);

        let mut cmd = Command::new(&self.binary);
        cmd.arg("--headless").arg("--convert-to").arg("pdf").arg("--outdir").arg(out_dir).arg(input);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let output = cmd
            .output()
            .map_err(|source| ConvertError::Launch { binary: self.binary.display().to_string(), source })?;

        if !output.status.success() {
            return Err(ConvertError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stem = input.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let pdf = out_dir.join(format!("{}.pdf", stem));
        if !pdf.is_file() {
            return Err(ConvertError::MissingOutput(pdf));
        }
        Ok(pdf)
    }
}

/// Convert every input, recording one step per file; failures do not stop the rest
pub fn convert_all(converter: &dyn Converter, inputs: &[PathBuf], out_dir: &Path, report: &mut PostProcessReport) {
    for input in inputs {
        let target = input.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let outcome = match converter.convert(input, out_dir) {
            Ok(pdf) => DeliveryOutcome::Delivered(pdf.display().to_string()),
            Err(e) => {
                warn!("PDF conversion of {} failed: {}", target, e);
                DeliveryOutcome::Failed(e.to_string())
            }
        };
        report.record(StepKind::ConvertPdf, target, outcome);
    }
}
