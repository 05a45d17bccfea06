//! Target-size convergence search
//!
//! Encodes repeatedly, adjusting quality by the square root of the size
//! ratio, until the output lands within tolerance of the target. The search
//! always returns something: when attempts run out the last one is handed
//! back with `converged == false`.

use crate::codec::QualityBounds;
use crate::config::TargetSizeConfig;
use crate::constants::{TARGET_GROW_FACTOR_CAP, TARGET_SHRINK_FACTOR_CAP};
use crate::error::CompressionError;

use super::deadline::Deadline;

/// Search parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetSizePolicy {
    pub initial_quality: u8,
    pub bounds: QualityBounds,
    pub max_iterations: u32,
    /// Relative error accepted on any attempt
    pub tolerance: f64,
    /// Relative error accepted from the second attempt on
    pub relaxed_tolerance: f64,
}

impl TargetSizePolicy {
    pub fn from_config(config: &TargetSizeConfig) -> Self {
        Self {
            initial_quality: config.initial_quality,
            bounds: QualityBounds::new(config.min_quality, config.max_quality),
            max_iterations: config.max_iterations.max(1),
            tolerance: config.tolerance,
            relaxed_tolerance: config.relaxed_tolerance,
        }
    }

    pub fn with_bounds(mut self, bounds: QualityBounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    fn accepts(&self, error: f64, iteration: u32) -> bool {
        error < self.tolerance || (iteration > 1 && error < self.relaxed_tolerance)
    }
}

impl Default for TargetSizePolicy {
    fn default() -> Self {
        Self::from_config(&TargetSizeConfig::default())
    }
}

/// Accepted (or best-effort) attempt
#[derive(Debug)]
pub struct SearchOutcome<A> {
    pub artifact: A,
    pub quality: u8,
    pub size: u64,
    pub iterations: u32,
    pub converged: bool,
}

/// |size - target| / target
pub fn relative_error(size: u64, target: u64) -> f64 {
    (size as f64 - target as f64).abs() / target as f64
}

/// Next quality to try after an attempt of `size` bytes at `quality`
///
/// Too large shrinks by `min(0.9, sqrt(target/size))`, too small grows by
/// `min(1.1, sqrt(target/size))`. The result stays within `bounds`.
pub fn next_quality(quality: u8, size: u64, target: u64, bounds: QualityBounds) -> u8 {
    let ratio = if size == 0 {
        f64::INFINITY
    } else {
        target as f64 / size as f64
    };
    let factor = if size > target {
        ratio.sqrt().min(TARGET_SHRINK_FACTOR_CAP)
    } else {
        ratio.sqrt().min(TARGET_GROW_FACTOR_CAP)
    };

    let next = (quality as f64 * factor).round().clamp(0.0, u8::MAX as f64) as u8;
    bounds.clamp(next)
}

/// Run the search, calling `attempt(quality)` for each try
///
/// `attempt` returns an artifact and its size. Artifacts of rejected attempts
/// are dropped as soon as a newer attempt replaces them, so scratch-file
/// artifacts never pile up.
pub fn search<A, F>(
    target: u64,
    policy: &TargetSizePolicy,
    deadline: &Deadline,
    mut attempt: F,
) -> Result<SearchOutcome<A>, CompressionError>
where
    F: FnMut(u8) -> Result<(A, u64), CompressionError>,
{
    if target == 0 {
        return Err(CompressionError::invalid_param(
            "target_size",
            "must be a positive number of bytes",
        ));
    }

    let mut quality = policy.bounds.clamp(policy.initial_quality);
    let mut last: Option<SearchOutcome<A>> = None;

    for iteration in 1..=policy.max_iterations.max(1) {
        deadline.check()?;

        let (artifact, size) = attempt(quality)?;
        let error = relative_error(size, target);
        tracing::debug!(
            iteration = iteration,
            quality = quality,
            size = size,
            target = target,
            error = error,
            "Target-size attempt"
        );

        if policy.accepts(error, iteration) {
            return Ok(SearchOutcome {
                artifact,
                quality,
                size,
                iterations: iteration,
                converged: true,
            });
        }

        let next = next_quality(quality, size, target, policy.bounds);
        last = Some(SearchOutcome {
            artifact,
            quality,
            size,
            iterations: iteration,
            converged: false,
        });

        // Pinned at a bound: another attempt would repeat this one
        if next == quality {
            break;
        }
        quality = next;
    }

    let outcome = last.ok_or_else(|| {
        CompressionError::invalid_param("max_iterations", "search made no attempts")
    })?;
    tracing::warn!(
        target = target,
        size = outcome.size,
        quality = outcome.quality,
        iterations = outcome.iterations,
        "Target size not reached, returning best effort"
    );
    Ok(outcome)
}
