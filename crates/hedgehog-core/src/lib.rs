//! # Hedgehog Core
//!
//! Field localization from square fiducial markers at known positions.
//! One frame of raw detections goes through:
//! - Detection filter (decode quality and id checks)
//! - Candidate solver (both planar-pose solutions per marker)
//! - Ambiguity resolver (two-anchor nearest-neighbour consensus)
//! - Pose aggregator (mean pose plus a dispersion heuristic)
//!
//! The previous frame's pose is carried in an explicit [`LocalizerState`].

pub mod aggregate;
pub mod candidate;
pub mod detection;
pub mod error;
pub mod field;
pub mod localizer;
pub mod resolver;
pub mod telemetry;
pub mod transform;
pub mod tuning;

// Re-export core types
pub use aggregate::{AggregatePose, Dispersion};
pub use candidate::{AmbiguousPose, CandidateGroup, Choice};
pub use detection::{DecodeQuality, RawDetection};
pub use error::FieldMapError;
pub use field::{FieldLayout, FieldMap, KnownMarker, MarkerSpec};
pub use localizer::{Characterization, FrameReport, Localizer, LocalizerState};
pub use resolver::{PoseSample, Priors, Strategy};
pub use telemetry::{FieldBounds, PosePacket, PublishedPose};
pub use transform::{RigidTransform, Rotation, Scalar, Translation};
pub use tuning::{Axis, FusionTuning, SingleMarkerFallback};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
