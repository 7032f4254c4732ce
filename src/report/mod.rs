use std::path::PathBuf;

use serde::Serialize;

use crate::{
    DigestResult, ElaReport, MetadataReport, SignatureVerdict, SteganographyVerdict,
    error::Result,
};

/// Outcome of every detector for one image, each kept independently.
#[derive(Debug)]
pub struct SessionReport {
    pub path: PathBuf,
    pub byte_len: u64,
    pub signature: Result<SignatureVerdict>,
    pub digest: Result<DigestResult>,
    pub ela: Result<ElaReport>,
    pub metadata: Result<MetadataReport>,
    pub steganography: Result<SteganographyVerdict>,
}

/// A detector section: either its result or the error message it produced.
#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section<T> {
    Ok(T),
    Error(String),
}

impl<T> Section<T> {
    fn from_result<U>(result: &Result<U>, render: impl FnOnce(&U) -> T) -> Self {
        match result {
            Ok(value) => Section::Ok(render(value)),
            Err(e) => Section::Error(e.to_string()),
        }
    }
}

#[derive(Serialize)]
pub struct JsonReport {
    pub path: String,
    pub byte_len: u64,
    pub signature: Section<SignatureReportSection>,
    pub digest: Section<DigestReportSection>,
    pub ela_analysis: Section<ElaReportSection>,
    pub metadata: Section<MetadataReport>,
    pub steganography: Section<SteganographyVerdict>,
}

#[derive(Serialize)]
pub struct SignatureReportSection {
    pub declared: String,
    pub detected: String,
    pub matches: bool,
    pub message: String,
}

#[derive(Serialize)]
pub struct DigestReportSection {
    pub algorithm: String,
    pub hex: String,
}

#[derive(Serialize)]
pub struct ElaReportSection {
    pub artifact: Option<PathBuf>,
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    pub threshold: u8,
    pub max_difference: f64,
    pub flagged_ratio: f64,
}

impl From<&SignatureVerdict> for SignatureReportSection {
    fn from(verdict: &SignatureVerdict) -> Self {
        Self {
            declared: verdict.declared.clone(),
            detected: verdict.detected.to_string(),
            matches: verdict.matches,
            message: verdict.to_string(),
        }
    }
}

impl From<&DigestResult> for DigestReportSection {
    fn from(digest: &DigestResult) -> Self {
        Self {
            algorithm: digest.algorithm.to_string(),
            hex: digest.hex.clone(),
        }
    }
}

impl From<&ElaReport> for ElaReportSection {
    fn from(ela: &ElaReport) -> Self {
        Self {
            artifact: ela.artifact.clone(),
            width: ela.mask.width(),
            height: ela.mask.height(),
            quality: ela.quality,
            threshold: ela.threshold,
            max_difference: ela.max_difference,
            flagged_ratio: ela.flagged_ratio,
        }
    }
}

impl From<&SessionReport> for JsonReport {
    fn from(report: &SessionReport) -> Self {
        Self {
            path: report.path.display().to_string(),
            byte_len: report.byte_len,
            signature: Section::from_result(&report.signature, |v| SignatureReportSection::from(v)),
            digest: Section::from_result(&report.digest, |d| DigestReportSection::from(d)),
            ela_analysis: Section::from_result(&report.ela, |e| ElaReportSection::from(e)),
            metadata: Section::from_result(&report.metadata, |m| m.clone()),
            steganography: Section::from_result(&report.steganography, |v| v.clone()),
        }
    }
}

impl JsonReport {
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AnalysisConfig, ForensicsSession};
    use image::{Rgb, RgbImage};

    #[test]
    fn test_json_report_keeps_failures_per_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.jpeg");
        RgbImage::from_fn(24, 24, |x, y| Rgb([(x * 10) as u8, (y * 10) as u8, 90]))
            .save_with_format(&path, image::ImageFormat::Jpeg)
            .unwrap();

        let config = AnalysisConfig::default().with_ela_output(dir.path().join("missing").join("ela.png"));
        let mut session = ForensicsSession::with_config(config);
        session.load(&path).unwrap();

        let report = session.full_report().unwrap();
        assert!(report.ela.is_err());
        assert!(report.signature.as_ref().unwrap().matches);

        let json = JsonReport::from(&report).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["signature"]["ok"]["detected"], "jpg");
        assert_eq!(value["signature"]["ok"]["matches"], true);
        assert_eq!(value["digest"]["ok"]["algorithm"], "SHA-1");
        assert!(value["ela_analysis"]["error"].as_str().unwrap().starts_with("IO error"));
        assert_eq!(value["metadata"]["ok"]["entries"].as_array().unwrap().len(), 0);
        assert!(value["steganography"]["ok"]["statistic"].is_number());
    }
}
