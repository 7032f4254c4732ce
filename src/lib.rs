use std::{
    fmt,
    fs::File,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use image::{DynamicImage, GrayImage, ImageReader, Limits};
use parking_lot::Mutex;
use serde::Serialize;

use crate::{
    analysis::{
        ela::ElaAnalyzer,
        hashing::{ContentHasher, DigestAlgorithm},
        signature::{FormatTag, SignatureClassifier},
        steganography::{MeanIntensityHeuristic, StegoAnalyzer},
    },
    error::{ForensicsError, Result},
    metadata::exif::ExifExtractor,
    report::SessionReport,
};

pub mod error;
pub mod image_utils;
pub mod analysis;
pub mod metadata;
pub mod report;

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub ela_quality: u8,
    pub ela_threshold: u8,
    pub ela_output: PathBuf,
    pub digest: DigestAlgorithm,
    pub steganography_threshold: f64,
    pub max_input_bytes: u64,
    pub max_dimension: u32,
    pub parallel: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            ela_quality: 90,
            ela_threshold: 30,
            ela_output: PathBuf::from("ela_result.png"),
            digest: DigestAlgorithm::Sha1,
            steganography_threshold: 128.0,
            max_input_bytes: 256 * 1024 * 1024,
            max_dimension: 16_384,
            parallel: true,
        }
    }
}

impl AnalysisConfig {
    pub fn with_ela_output<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.ela_output = path.into();
        self
    }

    pub fn with_digest(mut self, digest: DigestAlgorithm) -> Self {
        self.digest = digest;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.ela_quality) {
            return Err(ForensicsError::InvalidParameter(format!(
                "ELA quality must be within 1..=100, got {}",
                self.ela_quality
            )));
        }
        if self.max_dimension == 0 {
            return Err(ForensicsError::InvalidParameter("max_dimension must be positive".into()));
        }
        Ok(())
    }
}

/// A loaded source file. Immutable once opened; pixels are decoded on first use.
#[derive(Debug)]
pub struct ImageHandle {
    path: PathBuf,
    byte_len: u64,
    header: Vec<u8>,
    pixels: OnceLock<DynamicImage>,
}

impl ImageHandle {
    /// Opening only requires the file to be readable; undecodable or
    /// unrecognized content is reported later by the individual detectors.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let byte_len = file.metadata()?.len();
        let header = SignatureClassifier::read_header_from(file)?;

        Ok(Self {
            path,
            byte_len,
            header,
            pixels: OnceLock::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn byte_len(&self) -> u64 {
        self.byte_len
    }

    pub fn header(&self) -> &[u8] {
        &self.header
    }

    pub fn pixels(&self, config: &AnalysisConfig) -> Result<&DynamicImage> {
        if let Some(image) = self.pixels.get() {
            return Ok(image);
        }

        if self.byte_len > config.max_input_bytes {
            return Err(ForensicsError::InputTooLarge {
                size: self.byte_len,
                limit: config.max_input_bytes,
            });
        }

        let mut limits = Limits::default();
        limits.max_image_width = Some(config.max_dimension);
        limits.max_image_height = Some(config.max_dimension);

        let mut reader = ImageReader::open(&self.path)?.with_guessed_format()?;
        reader.limits(limits);
        let image = reader.decode()?;

        log::debug!(
            "decoded {} as {}x{} {:?}",
            self.path.display(),
            image.width(),
            image.height(),
            image.color()
        );

        Ok(self.pixels.get_or_init(|| image))
    }
}

/// Session façade: owns the current image and runs one detector per call.
///
/// Detectors never depend on each other; a failure in one leaves the others
/// usable. Calls are serialized so at most one analysis runs per image.
pub struct ForensicsSession {
    config: AnalysisConfig,
    current: Option<ImageHandle>,
    stego: Box<dyn StegoAnalyzer>,
    in_flight: Mutex<()>,
}

impl ForensicsSession {
    pub fn new() -> Self {
        Self::with_config(AnalysisConfig::default())
    }

    pub fn with_config(config: AnalysisConfig) -> Self {
        let stego = Box::new(MeanIntensityHeuristic::new(config.steganography_threshold));
        Self {
            config,
            current: None,
            stego,
            in_flight: Mutex::new(()),
        }
    }

    pub fn with_stego_analyzer(mut self, analyzer: Box<dyn StegoAnalyzer>) -> Self {
        self.stego = analyzer;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Replaces any previously loaded image.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<&ImageHandle> {
        self.config.validate()?;
        let handle = ImageHandle::open(path)?;
        log::info!("loaded {} ({} bytes)", handle.path().display(), handle.byte_len());
        Ok(self.current.insert(handle))
    }

    pub fn handle(&self) -> Result<&ImageHandle> {
        self.current.as_ref().ok_or(ForensicsError::NoImageLoaded)
    }

    pub fn hash(&self) -> Result<DigestResult> {
        let handle = self.handle()?;
        let _guard = self.in_flight.lock();

        let digest = ContentHasher::new(self.config.digest).hash_file(handle.path())?;
        log::info!("{} {}", digest.algorithm, digest.hex);
        Ok(digest)
    }

    pub fn check_signature(&self) -> Result<SignatureVerdict> {
        let handle = self.handle()?;
        let _guard = self.in_flight.lock();

        let declared = SignatureClassifier::declared_extension(handle.path());
        let verdict = SignatureClassifier::verify(&declared, handle.header());
        log::info!("signature check: {}", verdict);
        Ok(verdict)
    }

    pub fn perform_ela(&self) -> Result<ElaReport> {
        let handle = self.handle()?;
        let _guard = self.in_flight.lock();

        let image = handle.pixels(&self.config)?;
        ElaAnalyzer::new(self.config.ela_quality)
            .with_threshold(self.config.ela_threshold)
            .with_parallel(self.config.parallel)
            .analyze(image, &self.config.ela_output)
            .inspect_err(|e| log::warn!("ELA failed: {}", e))
    }

    pub fn extract_metadata(&self) -> Result<MetadataReport> {
        let handle = self.handle()?;
        let _guard = self.in_flight.lock();

        ExifExtractor::new(self.config.max_input_bytes)
            .extract(handle.path())
            .inspect_err(|e| log::warn!("metadata extraction failed: {}", e))
    }

    pub fn check_steganography(&self) -> Result<SteganographyVerdict> {
        let handle = self.handle()?;
        let _guard = self.in_flight.lock();

        let image = handle.pixels(&self.config)?;
        Ok(self.stego.analyze(image))
    }

    /// Runs every detector, keeping each outcome separately.
    pub fn full_report(&self) -> Result<SessionReport> {
        let handle = self.handle()?;

        Ok(SessionReport {
            path: handle.path().to_path_buf(),
            byte_len: handle.byte_len(),
            signature: self.check_signature(),
            digest: self.hash(),
            ela: self.perform_ela(),
            metadata: self.extract_metadata(),
            steganography: self.check_steganography(),
        })
    }
}

impl Default for ForensicsSession {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SignatureStatus {
    Match,
    Mismatch { expected: String, found: String },
    UnknownFormat,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignatureVerdict {
    pub declared: String,
    pub detected: FormatTag,
    pub matches: bool,
    pub status: SignatureStatus,
}

impl fmt::Display for SignatureVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            SignatureStatus::Match => write!(f, "Signature is valid."),
            SignatureStatus::Mismatch { expected, found } => write!(
                f,
                "Signature is invalid: expected .{} but found .{}",
                expected, found
            ),
            SignatureStatus::UnknownFormat => {
                write!(f, "Unknown file format or unsupported image type.")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DigestResult {
    pub algorithm: DigestAlgorithm,
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub hex: String,
}

impl fmt::Display for DigestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hash: {}", self.algorithm, self.hex)
    }
}

#[derive(Debug, Clone)]
pub struct ElaReport {
    /// Binary mask: every pixel is 0 or 255.
    pub mask: GrayImage,
    pub artifact: Option<PathBuf>,
    /// Largest luma difference before normalization.
    pub max_difference: f64,
    pub flagged_ratio: f64,
    pub quality: u8,
    pub threshold: u8,
}

impl fmt::Display for ElaReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.artifact {
            Some(path) => write!(f, "ELA result saved as {}", path.display()),
            None => write!(f, "ELA computed ({:.1}% flagged)", self.flagged_ratio * 100.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataEntry {
    pub tag: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MetadataReport {
    pub entries: Vec<MetadataEntry>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub software: Option<String>,
    pub date_time: Option<String>,
    pub gps_coordinates: Option<(f64, f64)>,
    pub indicators: Vec<String>,
    pub warnings: Vec<String>,
}

impl MetadataReport {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for MetadataReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "No EXIF data found.");
        }
        for entry in &self.entries {
            writeln!(f, "{}: {}", entry.tag, entry.value)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SteganographyVerdict {
    pub analyzer: String,
    pub flagged: bool,
    /// The value the verdict was derived from, e.g. mean sample intensity.
    pub statistic: f64,
    pub threshold: f64,
    pub caveat: String,
}

impl fmt::Display for SteganographyVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = if self.flagged {
            "Steganography detected!"
        } else {
            "No steganography detected."
        };
        write!(
            f,
            "{} ({} {:.2} vs {:.1}; {})",
            outcome, self.analyzer, self.statistic, self.threshold, self.caveat
        )
    }
}
