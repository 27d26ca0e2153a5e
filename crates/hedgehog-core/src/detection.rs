//! Raw marker detections and the quality/identity gate in front of fusion.

use crate::candidate::AmbiguousPose;
use crate::field::{FieldMap, KnownMarker};
use crate::transform::{RigidTransform, Scalar};
use crate::tuning::FusionTuning;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Decoder confidence for one detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecodeQuality {
    /// Bits corrected while decoding the id.
    pub hamming: u32,
    pub decision_margin: Scalar,
}

impl DecodeQuality {
    /// An error-free decode with the largest possible margin.
    pub const CLEAN: Self = Self {
        hamming: 0,
        decision_margin: Scalar::MAX,
    };
}

/// What the fiducial detector reports for one marker in one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub id: u32,
    pub quality: DecodeQuality,
    /// The marker frame expressed in the camera frame, both planar-pose
    /// solutions.
    pub solutions: AmbiguousPose<RigidTransform>,
}

impl RawDetection {
    pub fn new(id: u32, solutions: AmbiguousPose<RigidTransform>) -> Self {
        Self {
            id,
            quality: DecodeQuality::CLEAN,
            solutions,
        }
    }

    pub fn with_quality(mut self, hamming: u32, decision_margin: Scalar) -> Self {
        self.quality = DecodeQuality {
            hamming,
            decision_margin,
        };
        self
    }

    pub fn solutions_swapped(mut self) -> Self {
        self.solutions = self.solutions.swapped();
        self
    }
}

/// Why a detection did not make it into fusion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RejectReason {
    DecodeErrors(u32),
    LowMargin(Scalar),
    OutOfRange,
    NoMarker,
}

/// A detection paired with the field marker it refers to.
#[derive(Debug, Clone, Copy)]
pub struct AcceptedDetection<'a> {
    pub detection: &'a RawDetection,
    pub marker: &'a KnownMarker,
}

/// Checks one detection against the quality thresholds and the field map.
pub fn check<'a>(
    detection: &RawDetection,
    field: &'a FieldMap,
    tuning: &FusionTuning,
) -> Result<&'a KnownMarker, RejectReason> {
    let q = detection.quality;
    if q.hamming > tuning.max_hamming {
        return Err(RejectReason::DecodeErrors(q.hamming));
    }
    if q.decision_margin.is_nan() || q.decision_margin < tuning.min_decision_margin {
        return Err(RejectReason::LowMargin(q.decision_margin));
    }
    if detection.id as usize >= field.len() {
        return Err(RejectReason::OutOfRange);
    }
    field.get(detection.id).ok_or(RejectReason::NoMarker)
}

/// Keeps usable detections, in their original order.
pub fn filter_detections<'a>(
    detections: &'a [RawDetection],
    field: &'a FieldMap,
    tuning: &FusionTuning,
) -> Vec<AcceptedDetection<'a>> {
    detections
        .iter()
        .filter_map(|detection| match check(detection, field, tuning) {
            Ok(marker) => Some(AcceptedDetection { detection, marker }),
            Err(reason) => {
                trace!(id = detection.id, ?reason, "detection rejected");
                None
            }
        })
        .collect()
}
