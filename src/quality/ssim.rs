//! Windowed structural similarity on luminance
//!
//! The image is split into non-overlapping square windows whose edge is the
//! smaller image side capped at 8 pixels. Partial windows at the right and
//! bottom edges are skipped.

use crate::constants::SSIM_MAX_WINDOW;

const C1: f64 = (0.01 * 255.0) * (0.01 * 255.0);
const C2: f64 = (0.03 * 255.0) * (0.03 * 255.0);

/// Smallest window that still yields a variance estimate
const MIN_WINDOW: u32 = 2;

/// Window edge for an image of `width` x `height`, `None` if nothing fits
pub fn window_size(width: u32, height: u32) -> Option<u32> {
    let edge = width.min(height).min(SSIM_MAX_WINDOW);
    (edge >= MIN_WINDOW).then_some(edge)
}

/// Rec. 601 luma for an interleaved RGB buffer
pub fn luma_plane(rgb: &[u8]) -> Vec<f64> {
    rgb.chunks_exact(3)
        .map(|px| 0.299 * px[0] as f64 + 0.587 * px[1] as f64 + 0.114 * px[2] as f64)
        .collect()
}

/// Mean SSIM over all windows, 1.0 when no window fits
pub fn ssim(original: &[f64], compressed: &[f64], width: u32, height: u32) -> f64 {
    debug_assert_eq!(original.len(), compressed.len());
    debug_assert_eq!(original.len(), (width as usize) * (height as usize));

    let Some(edge) = window_size(width, height) else {
        return 1.0;
    };

    let stride = width as usize;
    let edge = edge as usize;
    let mut total = 0.0;
    let mut windows = 0usize;

    let mut y = 0;
    while y + edge <= height as usize {
        let mut x = 0;
        while x + edge <= stride {
            total += window_ssim(original, compressed, stride, x, y, edge);
            windows += 1;
            x += edge;
        }
        y += edge;
    }

    if windows == 0 {
        1.0
    } else {
        total / windows as f64
    }
}

fn window_ssim(a: &[f64], b: &[f64], stride: usize, x0: usize, y0: usize, edge: usize) -> f64 {
    let n = (edge * edge) as f64;

    let (mut sum_a, mut sum_b) = (0.0, 0.0);
    for y in y0..y0 + edge {
        let row = y * stride;
        for x in x0..x0 + edge {
            sum_a += a[row + x];
            sum_b += b[row + x];
        }
    }
    let mean_a = sum_a / n;
    let mean_b = sum_b / n;

    let (mut var_a, mut var_b, mut cov) = (0.0, 0.0, 0.0);
    for y in y0..y0 + edge {
        let row = y * stride;
        for x in x0..x0 + edge {
            let da = a[row + x] - mean_a;
            let db = b[row + x] - mean_b;
            var_a += da * da;
            var_b += db * db;
            cov += da * db;
        }
    }
    var_a /= n;
    var_b /= n;
    cov /= n;

    let numerator = (2.0 * mean_a * mean_b + C1) * (2.0 * cov + C2);
    let denominator = (mean_a * mean_a + mean_b * mean_b + C1) * (var_a + var_b + C2);
    if denominator == 0.0 {
        1.0
    } else {
        numerator / denominator
    }
}
