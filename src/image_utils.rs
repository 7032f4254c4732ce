use image::{GrayImage, Luma};
use ndarray::Array2;

/// ITU-R BT.601 luma of one RGB triple, rounded to the nearest 8-bit level.
pub fn luma(r: u8, g: u8, b: u8) -> f64 {
    (0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64)
        .round()
        .min(255.0)
}

/// Min-max stretch into `[0, 255]`. A flat input (`max == min`) maps to all zeros.
pub fn normalize_to_u8(arr: &Array2<f64>) -> Array2<f64> {
    let min = arr.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = arr.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    if arr.is_empty() || range < 1e-10 {
        Array2::zeros(arr.dim())
    } else {
        arr.mapv(|v| ((v - min) * 255.0 / range).round())
    }
}

pub fn array_to_gray(arr: &Array2<f64>) -> GrayImage {
    let (height, width) = arr.dim();
    let mut image = GrayImage::new(width as u32, height as u32);

    for ((y, x), value) in arr.indexed_iter() {
        image.put_pixel(x as u32, y as u32, Luma([value.clamp(0.0, 255.0) as u8]));
    }

    image
}

pub fn max_value(arr: &Array2<f64>) -> f64 {
    arr.iter().cloned().fold(0.0f64, f64::max)
}

/// Arithmetic mean of raw 8-bit samples; zero for an empty buffer.
pub fn sample_mean(samples: &[u8]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|&v| v as u64).sum::<u64>() as f64 / samples.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_luma_weights() {
        assert_eq!(luma(0, 0, 0), 0.0);
        assert_eq!(luma(255, 255, 255), 255.0);
        assert_eq!(luma(255, 0, 0), 76.0);
        assert_eq!(luma(0, 255, 0), 150.0);
        assert_eq!(luma(0, 0, 255), 29.0);
    }

    #[test]
    fn test_normalize_stretches_range() {
        let arr = array![[2.0, 4.0], [6.0, 2.0]];
        let normalized = normalize_to_u8(&arr);
        assert_eq!(normalized, array![[0.0, 128.0], [255.0, 0.0]]);
    }

    #[test]
    fn test_normalize_flat_input_is_zero() {
        let arr = Array2::from_elem((4, 3), 7.0);
        let normalized = normalize_to_u8(&arr);
        assert!(normalized.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_array_to_gray_layout() {
        let arr = array![[0.0, 10.0, 20.0], [30.0, 40.0, 300.0]];
        let gray = array_to_gray(&arr);
        assert_eq!(gray.dimensions(), (3, 2));
        assert_eq!(gray.get_pixel(2, 0)[0], 20);
        assert_eq!(gray.get_pixel(2, 1)[0], 255);
    }

    #[test]
    fn test_sample_mean() {
        assert_eq!(sample_mean(&[]), 0.0);
        assert_eq!(sample_mean(&[0, 255]), 127.5);
    }
}
