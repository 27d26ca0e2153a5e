//! Averages resolved samples into the frame's field pose.

use crate::resolver::PoseSample;
use crate::transform::{RigidTransform, Scalar, Translation};
use crate::tuning::FusionTuning;
use serde::Serialize;

/// Per-axis spread heuristic. Larger means less trustworthy.
///
/// This is not a covariance: one marker gets a fixed constant, several get
/// their scaled mean absolute deviation divided by the marker count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Dispersion {
    pub x: Scalar,
    pub y: Scalar,
    pub z: Scalar,
}

impl Dispersion {
    pub const fn uniform(v: Scalar) -> Self {
        Self { x: v, y: v, z: v }
    }

    /// Largest per-axis value.
    pub fn scalar(&self) -> Scalar {
        self.x.max(self.y).max(self.z)
    }
}

impl From<Translation> for Dispersion {
    fn from(t: Translation) -> Self {
        Self {
            x: t.x,
            y: t.y,
            z: t.z,
        }
    }
}

/// The frame's fused output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatePose {
    pub pose: RigidTransform,
    pub dispersion: Dispersion,
    /// Markers that contributed, in detection order. Empty means no estimate.
    pub marker_ids: Vec<u32>,
}

impl AggregatePose {
    pub fn no_estimate(tuning: &FusionTuning) -> Self {
        Self {
            pose: RigidTransform::identity(),
            dispersion: Dispersion::uniform(tuning.no_estimate_dispersion),
            marker_ids: Vec::new(),
        }
    }

    pub fn has_estimate(&self) -> bool {
        !self.marker_ids.is_empty()
    }

    pub fn sample_count(&self) -> usize {
        self.marker_ids.len()
    }
}

pub fn aggregate(samples: &[PoseSample], tuning: &FusionTuning) -> AggregatePose {
    let poses: Vec<RigidTransform> = samples.iter().map(|s| s.pose).collect();
    let Some(mean) = RigidTransform::average(&poses) else {
        return AggregatePose::no_estimate(tuning);
    };

    let dispersion = match poses.len() {
        1 => Dispersion::uniform(tuning.single_marker_dispersion),
        n => {
            let spread = RigidTransform::mean_abs_deviation(&poses, mean);
            (spread * tuning.dispersion_scale / n as Scalar).into()
        }
    };

    AggregatePose {
        pose: mean,
        dispersion,
        marker_ids: samples.iter().map(|s| s.marker_id).collect(),
    }
}
