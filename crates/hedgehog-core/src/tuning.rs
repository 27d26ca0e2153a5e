use crate::transform::{RigidTransform, Scalar, Translation};
use serde::{Deserialize, Serialize};

/// Translation axis selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn component(self, t: Translation) -> Scalar {
        match self {
            Axis::X => t.x,
            Axis::Y => t.y,
            Axis::Z => t.z,
        }
    }
}

/// How a lone marker is disambiguated when there is no position prior.
///
/// None of these has a geometric basis. `SignOfAxis` keeps the primary
/// candidate unless its coordinate on `axis` is negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum SingleMarkerFallback {
    SignOfAxis { axis: Axis },
    Primary,
    Secondary,
}

impl Default for SingleMarkerFallback {
    fn default() -> Self {
        Self::SignOfAxis { axis: Axis::Y }
    }
}

/// Thresholds and constants for the fusion pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionTuning {
    /// Detections with more corrected bits than this are dropped.
    pub max_hamming: u32,
    /// Detections with a decision margin below this are dropped.
    pub min_decision_margin: Scalar,
    /// Per-axis dispersion reported when only one marker contributed.
    pub single_marker_dispersion: Scalar,
    /// Per-axis dispersion reported when nothing usable was seen.
    pub no_estimate_dispersion: Scalar,
    /// Multiplier on the mean absolute deviation for multi-marker frames.
    pub dispersion_scale: Scalar,
    pub fallback: SingleMarkerFallback,
    /// Camera frame expressed in the robot frame.
    pub camera_mount: RigidTransform,
}

impl Default for FusionTuning {
    fn default() -> Self {
        Self {
            max_hamming: 0,
            min_decision_margin: 0.7,
            single_marker_dispersion: 1.0,
            no_estimate_dispersion: 999.0,
            dispersion_scale: 4.0,
            fallback: SingleMarkerFallback::default(),
            camera_mount: RigidTransform::identity(),
        }
    }
}
