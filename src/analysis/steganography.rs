use std::borrow::Cow;

use image::DynamicImage;

use crate::{SteganographyVerdict, image_utils::sample_mean};

/// Capability seam for steganalysis so a real LSB or statistical analyzer can
/// replace the placeholder without changing the session API.
pub trait StegoAnalyzer: Send + Sync {
    fn analyze(&self, image: &DynamicImage) -> SteganographyVerdict;

    fn name(&self) -> &str;
}

/// Flags an image whose mean 8-bit sample value exceeds a fixed threshold.
///
/// This is not steganalysis. Any bright image is flagged and any dark image
/// passes regardless of payload; the verdict carries the statistic so callers
/// can see exactly what was measured.
pub struct MeanIntensityHeuristic {
    threshold: f64,
}

pub const MEAN_INTENSITY_CAVEAT: &str =
    "naive mean-intensity threshold; bright or dark images produce false results";

impl MeanIntensityHeuristic {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Every channel of every pixel, alpha included, at 8 bits per sample.
    fn samples(image: &DynamicImage) -> Cow<'_, [u8]> {
        match image {
            DynamicImage::ImageLuma8(_)
            | DynamicImage::ImageLumaA8(_)
            | DynamicImage::ImageRgb8(_)
            | DynamicImage::ImageRgba8(_) => Cow::Borrowed(image.as_bytes()),
            _ if image.color().has_alpha() => Cow::Owned(image.to_rgba8().into_raw()),
            _ => Cow::Owned(image.to_rgb8().into_raw()),
        }
    }
}

impl Default for MeanIntensityHeuristic {
    fn default() -> Self {
        Self::new(128.0)
    }
}

impl StegoAnalyzer for MeanIntensityHeuristic {
    fn analyze(&self, image: &DynamicImage) -> SteganographyVerdict {
        let mean = sample_mean(&Self::samples(image));
        let flagged = mean > self.threshold;

        log::debug!(
            "mean intensity {:.2} against threshold {:.1}: flagged={}",
            mean,
            self.threshold,
            flagged
        );

        SteganographyVerdict {
            analyzer: self.name().to_string(),
            flagged,
            statistic: mean,
            threshold: self.threshold,
            caveat: MEAN_INTENSITY_CAVEAT.to_string(),
        }
    }

    fn name(&self) -> &str {
        "mean-intensity"
    }
}
