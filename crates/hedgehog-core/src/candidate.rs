//! Per-marker candidate robot poses.
//!
//! A single square marker admits two rigid transforms that reproject onto
//! the same image corners. Both are carried forward as an [`AmbiguousPose`]
//! so the resolver can decide between them with cross-marker evidence.

use crate::detection::AcceptedDetection;
use crate::field::KnownMarker;
use crate::transform::RigidTransform;
use serde::{Deserialize, Serialize};

/// Which member of an ambiguous pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Choice {
    Primary,
    Secondary,
}

impl Choice {
    pub fn other(self) -> Self {
        match self {
            Choice::Primary => Choice::Secondary,
            Choice::Secondary => Choice::Primary,
        }
    }
}

/// Exactly two solutions. The detector's ordering carries no meaning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmbiguousPose<T> {
    pub primary: T,
    pub secondary: T,
}

impl<T> AmbiguousPose<T> {
    pub const fn new(primary: T, secondary: T) -> Self {
        Self { primary, secondary }
    }

    pub fn get(&self, choice: Choice) -> &T {
        match choice {
            Choice::Primary => &self.primary,
            Choice::Secondary => &self.secondary,
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> AmbiguousPose<U> {
        AmbiguousPose {
            primary: f(self.primary),
            secondary: f(self.secondary),
        }
    }

    pub fn swapped(self) -> Self {
        Self {
            primary: self.secondary,
            secondary: self.primary,
        }
    }
}

/// Both robot field-pose interpretations of one visible marker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateGroup {
    pub marker_id: u32,
    pub candidates: AmbiguousPose<RigidTransform>,
}

/// Robot field pose implied by seeing `marker` at `marker_in_camera`.
///
/// `camera_mount` is the camera frame in the robot frame; with the identity
/// mount the camera pose is the robot pose.
pub fn robot_pose(
    marker: &KnownMarker,
    marker_in_camera: RigidTransform,
    camera_mount: RigidTransform,
) -> RigidTransform {
    marker
        .pose
        .transform_by(marker_in_camera.inverse())
        .transform_by(camera_mount.inverse())
}

/// One candidate group per accepted detection, in detection order.
pub fn solve_candidates(
    accepted: &[AcceptedDetection<'_>],
    camera_mount: RigidTransform,
) -> Vec<CandidateGroup> {
    accepted
        .iter()
        .map(|a| CandidateGroup {
            marker_id: a.marker.id,
            candidates: a
                .detection
                .solutions
                .map(|sol| robot_pose(a.marker, sol, camera_mount)),
        })
        .collect()
}
