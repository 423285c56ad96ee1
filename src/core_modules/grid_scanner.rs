// THEORY:
// The `GridScanner` is the heart of the detector. It walks a regular grid over the
// image, judges every sample against every colour profile, and collects the samples
// that look like holds.
//
// Key architectural principles:
// 1.  **Subsampling**: Only every `step`-th column of every `step`-th row is read
//     (row-major, y then x). A 4000x3000 photo at step 5 is 480 000 samples instead of
//     12 million, which bounds the cost of a scan on a phone-sized upload.
// 2.  **Registry Order**: At each sample the profiles are tried in registry order and
//     each match is offered to the candidate set.
// 3.  **Global Dedup**: The `CandidateSet` refuses a candidate when ANY accepted
//     candidate, of any colour, lies within `dedup_radius` on both axes
//     (`|dx| < r && |dy| < r`, a square and not a circle). The first colour to fire on
//     a region therefore claims it for all colours, and a differently coloured hold
//     right next to an accepted one is never reported.
// 4.  **Exclusive Ownership**: The candidate set is created by one scan call, filled
//     by it alone, and handed back by value when the scan ends. Nothing is shared
//     between scans, so concurrent scans never interact.
// 5.  **Cancellation**: An optional `CancelFlag` is checked before each sampled row.
//
// The accepted list, in acceptance order, IS the result. Two scans of the same image
// with the same configuration produce identical lists.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use crate::core_modules::color_profile::ColorProfileRegistry;
use crate::core_modules::pixel::pixel::{Coordinate, Pixel};
use crate::core_modules::smart_pixel::smart_pixel::{Confidence, SmartPixel};
use crate::core_modules::utils::image_helper::Raster;
use crate::error::DetectionError;

/// Grid stride used when none is configured.
pub const DEFAULT_STEP: u32 = 5;
/// Per-axis distance under which two candidates count as the same hold.
pub const DEFAULT_DEDUP_RADIUS: u32 = 20;

/// A proposed hold location.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HoldCandidate {
    pub x: Coordinate,
    pub y: Coordinate,
    /// Name of the colour profile that matched.
    pub color: String,
    /// Match quality in [0, 100].
    pub confidence: Confidence,
}

/// Tunable scan parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanConfig {
    /// Grid stride in pixels, on both axes. Must be at least 1.
    pub step: u32,
    /// Dedup neighbourhood half-width in pixels. Must be at least 1.
    pub dedup_radius: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            step: DEFAULT_STEP,
            dedup_radius: DEFAULT_DEDUP_RADIUS,
        }
    }
}

impl ScanConfig {
    pub fn with_step(step: u32) -> Self {
        Self {
            step,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), DetectionError> {
        if self.step == 0 {
            return Err(DetectionError::InvalidConfig(
                "scan step must be at least 1".to_string(),
            ));
        }
        if self.dedup_radius == 0 {
            return Err(DetectionError::InvalidConfig(
                "dedup radius must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// A shareable "stop scanning" signal.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The accepted candidates of one scan, in acceptance order.
///
/// Lookups go through a bucket grid with cells of `radius` pixels: two points closer
/// than `radius` on both axes always sit in the same or adjacent cells, so only the
/// 3x3 cells around a point need checking.
#[derive(Debug)]
pub struct CandidateSet {
    radius: u32,
    accepted: Vec<HoldCandidate>,
    buckets: HashMap<(u32, u32), Vec<usize>>,
}

impl CandidateSet {
    pub fn new(radius: u32) -> Self {
        Self {
            radius: radius.max(1),
            accepted: Vec::new(),
            buckets: HashMap::new(),
        }
    }

    fn bucket_of(&self, x: Coordinate, y: Coordinate) -> (u32, u32) {
        (x / self.radius, y / self.radius)
    }

    /// Whether an accepted candidate already covers `(x, y)`.
    pub fn is_claimed(&self, x: Coordinate, y: Coordinate) -> bool {
        let (bucket_x, bucket_y) = self.bucket_of(x, y);
        for neighbour_y in bucket_y.saturating_sub(1)..=bucket_y.saturating_add(1) {
            for neighbour_x in bucket_x.saturating_sub(1)..=bucket_x.saturating_add(1) {
                let Some(indices) = self.buckets.get(&(neighbour_x, neighbour_y)) else {
                    continue;
                };
                let hit = indices.iter().any(|&index| {
                    let other = &self.accepted[index];
                    other.x.abs_diff(x) < self.radius && other.y.abs_diff(y) < self.radius
                });
                if hit {
                    return true;
                }
            }
        }
        false
    }

    /// Accepts `candidate` unless its neighbourhood is already claimed.
    pub fn try_insert(&mut self, candidate: HoldCandidate) -> bool {
        if self.is_claimed(candidate.x, candidate.y) {
            return false;
        }
        let bucket = self.bucket_of(candidate.x, candidate.y);
        self.buckets
            .entry(bucket)
            .or_default()
            .push(self.accepted.len());
        self.accepted.push(candidate);
        true
    }

    pub fn len(&self) -> usize {
        self.accepted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }

    pub fn as_slice(&self) -> &[HoldCandidate] {
        &self.accepted
    }

    pub fn into_candidates(self) -> Vec<HoldCandidate> {
        self.accepted
    }
}

/// Grid-samples rasters against a colour registry.
#[derive(Debug, Clone)]
pub struct GridScanner {
    registry: ColorProfileRegistry,
    config: ScanConfig,
}

impl GridScanner {
    pub fn new(registry: ColorProfileRegistry, config: ScanConfig) -> Result<Self, DetectionError> {
        config.validate()?;
        Ok(Self { registry, config })
    }

    pub fn registry(&self) -> &ColorProfileRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn scan<R: Raster + ?Sized>(&self, image: &R) -> Vec<HoldCandidate> {
        match self.run(image, None) {
            Ok(candidates) => candidates,
            // without a flag the scan has no way to stop early
            Err(_) => Vec::new(),
        }
    }

    pub fn scan_with_cancel<R: Raster + ?Sized>(
        &self,
        image: &R,
        cancel: &CancelFlag,
    ) -> Result<Vec<HoldCandidate>, DetectionError> {
        self.run(image, Some(cancel))
    }

    fn run<R: Raster + ?Sized>(
        &self,
        image: &R,
        cancel: Option<&CancelFlag>,
    ) -> Result<Vec<HoldCandidate>, DetectionError> {
        let (width, height) = (image.width(), image.height());
        let step = self.config.step as usize;
        let mut candidates = CandidateSet::new(self.config.dedup_radius);
        let mut samples = 0usize;

        for y in (0..height).step_by(step) {
            if cancel.is_some_and(CancelFlag::is_cancelled) {
                warn!(row = y, accepted = candidates.len(), "hold scan cancelled");
                return Err(DetectionError::Cancelled);
            }

            for x in (0..width).step_by(step) {
                samples += 1;
                let sample = SmartPixel::new(Pixel::new(x, y, image.rgb_at(x, y)));

                for profile in &self.registry {
                    if !sample.matches(profile) || candidates.is_claimed(x, y) {
                        continue;
                    }
                    candidates.try_insert(HoldCandidate {
                        x,
                        y,
                        color: profile.name.to_string(),
                        confidence: sample.confidence(profile),
                    });
                }
            }
        }

        debug!(
            width,
            height,
            step = self.config.step,
            samples,
            accepted = candidates.len(),
            "hold scan finished"
        );
        Ok(candidates.into_candidates())
    }
}

/// Scans `image` with the default dedup radius and the given stride.
pub fn scan<R: Raster + ?Sized>(
    image: &R,
    registry: &ColorProfileRegistry,
    step: u32,
) -> Result<Vec<HoldCandidate>, DetectionError> {
    let scanner = GridScanner::new(registry.clone(), ScanConfig::with_step(step))?;
    Ok(scanner.scan(image))
}
