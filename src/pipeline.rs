// THEORY:
// The `pipeline` module is the top-level API of the hold detector. It strings the
// stages together for one uploaded photograph:
//
//   Stage 1: decode the upload into an RGB raster   (utils::image_helper)
//   Stage 2: grid-scan it against the colour table  (grid_scanner)
//   Stage 3: group the accepted candidates by colour (hold_grouper)
//
// Failure policy: an upload that cannot be decoded is NOT an error at the service
// boundary. `detect` logs the failure and answers with an empty result, exactly like
// a photo with no holds in it. The difference is kept for callers that care:
// `generate_report` returns a `Report` that says which of the two happened, and
// `try_detect` returns the underlying `DetectionError`.

use std::path::Path;

use tracing::{error, warn};

use crate::core_modules::color_profile::ColorProfileRegistry;
use crate::core_modules::grid_scanner::{CancelFlag, GridScanner, ScanConfig};
use crate::core_modules::hold_grouper::{DetectionResult, group};
use crate::core_modules::utils::image_helper::{self, Raster};
use crate::error::DetectionError;

/// Configuration for the DetectionPipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionConfig {
    pub scan: ScanConfig,
    /// Hold colours in dedup priority order.
    pub registry: ColorProfileRegistry,
}

impl DetectionConfig {
    pub fn with_step(step: u32) -> Self {
        Self {
            scan: ScanConfig::with_step(step),
            ..Self::default()
        }
    }
}

/// The outcome of one detection run.
#[derive(Debug)]
pub enum Report {
    /// At least one hold was found.
    Detected(DetectionResult),
    /// The image was read but no sample matched any colour.
    NothingFound,
    /// The image could not be read or the scan was cancelled.
    Failed(DetectionError),
}

impl Report {
    fn from_scan(result: Result<DetectionResult, DetectionError>) -> Self {
        match result {
            Ok(result) if result.is_empty() => Report::NothingFound,
            Ok(result) => Report::Detected(result),
            Err(err) => Report::Failed(err),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Report::Failed(_))
    }

    /// Collapses the report into what clients see: failures become empty results.
    pub fn into_result(self) -> DetectionResult {
        match self {
            Report::Detected(result) => result,
            Report::NothingFound | Report::Failed(_) => DetectionResult::empty(),
        }
    }
}

/// The main, top-level struct for the hold detector.
#[derive(Debug, Clone)]
pub struct DetectionPipeline {
    scanner: GridScanner,
}

impl DetectionPipeline {
    pub fn new(config: DetectionConfig) -> Result<Self, DetectionError> {
        Ok(Self {
            scanner: GridScanner::new(config.registry, config.scan)?,
        })
    }

    pub fn scanner(&self) -> &GridScanner {
        &self.scanner
    }

    /// Scans an already decoded raster. Cannot fail.
    pub fn detect_raster<R: Raster + ?Sized>(&self, image: &R) -> DetectionResult {
        group(&self.scanner.scan(image))
    }

    pub fn try_detect(&self, bytes: &[u8]) -> Result<DetectionResult, DetectionError> {
        let image = image_helper::decode(bytes)?;
        Ok(self.detect_raster(&image))
    }

    pub fn try_detect_with_cancel(
        &self,
        bytes: &[u8],
        cancel: &CancelFlag,
    ) -> Result<DetectionResult, DetectionError> {
        let image = image_helper::decode(bytes)?;
        let candidates = self.scanner.scan_with_cancel(&image, cancel)?;
        Ok(group(&candidates))
    }

    pub fn try_detect_path(&self, path: &Path) -> Result<DetectionResult, DetectionError> {
        let image = image_helper::open(path)?;
        Ok(self.detect_raster(&image))
    }

    /// Runs the pipeline on an uploaded buffer and says how it went.
    pub fn generate_report(&self, bytes: &[u8]) -> Report {
        let report = Report::from_scan(self.try_detect(bytes));
        log_failure(&report);
        report
    }

    pub fn generate_report_with_cancel(&self, bytes: &[u8], cancel: &CancelFlag) -> Report {
        let report = Report::from_scan(self.try_detect_with_cancel(bytes, cancel));
        log_failure(&report);
        report
    }

    /// Fail-soft detection: undecodable input yields an empty result.
    pub fn detect(&self, bytes: &[u8]) -> DetectionResult {
        self.generate_report(bytes).into_result()
    }

    pub fn detect_path(&self, path: &Path) -> DetectionResult {
        let report = Report::from_scan(self.try_detect_path(path));
        log_failure(&report);
        report.into_result()
    }
}

fn log_failure(report: &Report) {
    match report {
        Report::Failed(DetectionError::Cancelled) => warn!("hold detection cancelled"),
        Report::Failed(err) => error!(error = %err, "error detecting holds"),
        Report::Detected(_) | Report::NothingFound => {}
    }
}
