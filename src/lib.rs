// THEORY:
// This file is the main entry point for the `hold_vision` library crate.
// It exposes two independent engines behind a small public API:
//
// - The hold detector (`pipeline::DetectionPipeline`, `parallel_pipeline::ScanPool`):
//   decodes a wall photograph, grid-samples it in HSV space against an ordered table
//   of hold colours, and returns the candidate holds grouped by colour.
// - The launch-data verifier (`core_modules::launch_verifier::LaunchDataVerifier`):
//   checks the HMAC signature of the `initData` payload handed over by the Telegram
//   client before any identity claim in it is trusted.
//
// The building blocks live in `core_modules` and stay usable on their own (a caller
// with an already decoded raster can drive the scanner directly), but the pipeline
// types are the intended entry points for services.

pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;

pub use core_modules::color_profile::{ColorProfile, ColorProfileRegistry};
pub use core_modules::grid_scanner::{CancelFlag, HoldCandidate, ScanConfig};
pub use core_modules::hold_grouper::{DetectionResult, HoldGroup, HoldPoint};
pub use core_modules::launch_data::{LaunchPayload, UserId, UserProfile};
pub use core_modules::launch_verifier::LaunchDataVerifier;
pub use error::{DetectionError, VerificationError};
pub use parallel_pipeline::ScanPool;
pub use pipeline::{DetectionConfig, DetectionPipeline, Report};
