//! Hedgehog Simulation Library
//!
//! Drives a robot around the field, renders what a fiducial camera would
//! report (both planar-pose solutions per marker) and replays it through
//! the localizer.

pub mod localize;
pub mod params;
pub mod path;
pub mod scenario;
pub mod sensor;

// Re-export main types
pub use localize::{characterize_run, error_stats, run_localizer, ErrorStats, LocalizeResult, MarkerCountStats};
pub use params::*;
pub use path::{simulate_path, PathConfig, PathResult};
pub use scenario::{simulate, SimConfig, SimRun};
pub use sensor::{generate_frames, CameraConfig, FrameData, OdometryConfig};
