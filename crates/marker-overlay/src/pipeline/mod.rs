//! Per-tick AR overlay pipeline.
//!
//! This module wires frame capture, luminance conversion, marker detection,
//! pose mapping and the two-pass render into one single-threaded tick.

mod clock;
mod error;
mod params;
mod report;
mod state;
mod synchronizer;

pub use clock::FrameClock;
pub use error::{StartupError, TickError};
pub use params::PipelineSettings;
pub use report::TickReport;
pub use state::PipelineState;
pub use synchronizer::{select_resolution, OverlayPipeline};
