use std::{
    io::{BufWriter, Cursor, Write},
    path::Path,
};

use image::{
    DynamicImage, ExtendedColorType, GrayImage, ImageEncoder, ImageFormat, RgbImage,
    codecs::{jpeg::JpegEncoder, png::PngEncoder},
};
use imageproc::contrast::{ThresholdType, threshold};
use ndarray::Array2;
use rayon::prelude::*;
use tempfile::NamedTempFile;

use crate::{
    ElaReport,
    error::{ForensicsError, Result},
    image_utils::{array_to_gray, luma, max_value, normalize_to_u8},
};

/// Error Level Analysis: recompress once at a fixed JPEG quality and keep a
/// binary mask of where the recompression moved pixels the most.
pub struct ElaAnalyzer {
    quality: u8,
    threshold: u8,
    parallel: bool,
}

impl ElaAnalyzer {
    pub fn new(quality: u8) -> Self {
        Self {
            quality,
            threshold: 30,
            parallel: true,
        }
    }

    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Computes the mask and persists it as a PNG at `output`.
    pub fn analyze(&self, image: &DynamicImage, output: &Path) -> Result<ElaReport> {
        let mut report = self.compute(image)?;
        Self::write_artifact(&report.mask, output)?;
        report.artifact = Some(output.to_path_buf());

        log::info!("ELA mask written to {}", output.display());
        Ok(report)
    }

    /// In-memory part of the analysis; the returned report has no artifact.
    pub fn compute(&self, image: &DynamicImage) -> Result<ElaReport> {
        let original = image.to_rgb8();
        let recompressed = self.recompress_jpeg(&original)?;

        let difference = self.difference_luma(&original, &recompressed)?;
        let normalized = array_to_gray(&normalize_to_u8(&difference));
        let mask = threshold(&normalized, self.threshold, ThresholdType::Binary);

        let total = mask.len().max(1);
        let flagged = mask.iter().filter(|&&v| v == 255).count();

        Ok(ElaReport {
            max_difference: max_value(&difference),
            flagged_ratio: flagged as f64 / total as f64,
            quality: self.quality,
            threshold: self.threshold,
            mask,
            artifact: None,
        })
    }

    fn recompress_jpeg(&self, image: &RgbImage) -> Result<RgbImage> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut encoder = JpegEncoder::new_with_quality(&mut buffer, self.quality);
            encoder.encode_image(image)?;
        }

        let recompressed = image::load_from_memory_with_format(buffer.get_ref(), ImageFormat::Jpeg)?;

        Ok(recompressed.to_rgb8())
    }

    /// Per-channel absolute difference collapsed to luma, shaped `(height, width)`.
    fn difference_luma(&self, original: &RgbImage, recompressed: &RgbImage) -> Result<Array2<f64>> {
        if original.dimensions() != recompressed.dimensions() {
            return Err(ForensicsError::AnalysisFailed(format!(
                "recompressed image is {:?}, expected {:?}",
                recompressed.dimensions(),
                original.dimensions()
            )));
        }

        let (width, height) = original.dimensions();

        let values = if self.parallel {
            original
                .as_raw()
                .par_chunks_exact(3)
                .zip(recompressed.as_raw().par_chunks_exact(3))
                .map(pixel_difference)
                .collect::<Vec<_>>()
        } else {
            original
                .as_raw()
                .chunks_exact(3)
                .zip(recompressed.as_raw().chunks_exact(3))
                .map(pixel_difference)
                .collect::<Vec<_>>()
        };

        Array2::from_shape_vec((height as usize, width as usize), values)
            .map_err(|e| ForensicsError::AnalysisFailed(e.to_string()))
    }

    /// Stages the PNG next to `path` and renames it into place; the staged
    /// file is removed if encoding or the rename fails.
    fn write_artifact(mask: &GrayImage, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut staged = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(staged.as_file_mut());
            PngEncoder::new(&mut writer).write_image(
                mask.as_raw(),
                mask.width(),
                mask.height(),
                ExtendedColorType::L8,
            )?;
            writer.flush()?;
        }

        staged.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

fn pixel_difference((a, b): (&[u8], &[u8])) -> f64 {
    luma(a[0].abs_diff(b[0]), a[1].abs_diff(b[1]), a[2].abs_diff(b[2]))
}
