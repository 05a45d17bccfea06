//! Peak signal-to-noise ratio over RGB samples

use crate::constants::PSNR_CAP;

/// Mean squared error across every channel sample
///
/// Both buffers must have the same length; the caller checks dimensions.
pub fn mean_squared_error(original: &[u8], compressed: &[u8]) -> f64 {
    debug_assert_eq!(original.len(), compressed.len());
    if original.is_empty() {
        return 0.0;
    }

    let sum: u64 = original
        .iter()
        .zip(compressed)
        .map(|(&a, &b)| {
            let diff = a as i64 - b as i64;
            (diff * diff) as u64
        })
        .sum();

    sum as f64 / original.len() as f64
}

/// PSNR in dB, 100 for identical buffers, clamped to [0, 100]
pub fn psnr(original: &[u8], compressed: &[u8]) -> f64 {
    let mse = mean_squared_error(original, compressed);
    if mse == 0.0 {
        return PSNR_CAP;
    }
    let value = 20.0 * (255.0 / mse.sqrt()).log10();
    value.clamp(0.0, PSNR_CAP)
}
