//! Frame-at-a-time localization: filter → candidates → resolve → aggregate.
//!
//! The pipeline is a pure function of the frame's detections and the
//! previous [`LocalizerState`]; callers own the state and thread it through.

use crate::aggregate::{aggregate, AggregatePose};
use crate::candidate::{solve_candidates, CandidateGroup};
use crate::detection::{filter_detections, RawDetection};
use crate::field::FieldMap;
use crate::resolver::{resolve, Priors, Resolution};
use crate::transform::{RigidTransform, Translation};
use crate::tuning::FusionTuning;
use tracing::debug;

/// What persists between frames.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LocalizerState {
    /// Most recent fused pose, `None` until the first marker is seen.
    pub last_known: Option<RigidTransform>,
    /// Consecutive frames without an estimate.
    pub frames_since_update: u32,
}

impl LocalizerState {
    fn advance(&self, estimate: &AggregatePose) -> Self {
        if estimate.has_estimate() {
            Self {
                last_known: Some(estimate.pose),
                frames_since_update: 0,
            }
        } else {
            Self {
                last_known: self.last_known,
                frames_since_update: self.frames_since_update.saturating_add(1),
            }
        }
    }
}

/// Everything computed for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub estimate: AggregatePose,
    pub resolution: Resolution,
    /// Detections rejected by the quality/identity gate.
    pub rejected: usize,
}

pub struct Localizer {
    field: FieldMap,
    tuning: FusionTuning,
}

impl Localizer {
    pub fn new(field: FieldMap, tuning: FusionTuning) -> Self {
        Self { field, tuning }
    }

    pub fn field(&self) -> &FieldMap {
        &self.field
    }

    pub fn tuning(&self) -> &FusionTuning {
        &self.tuning
    }

    /// Filters detections and expands each survivor into its candidate pair.
    pub fn candidate_groups(&self, detections: &[RawDetection]) -> Vec<CandidateGroup> {
        let accepted = filter_detections(detections, &self.field, &self.tuning);
        solve_candidates(&accepted, self.tuning.camera_mount)
    }

    fn estimate_groups(&self, groups: &[CandidateGroup], priors: &Priors) -> (AggregatePose, Resolution) {
        let resolution = resolve(groups, priors, self.tuning.fallback);
        let estimate = aggregate(&resolution.samples, &self.tuning);
        (estimate, resolution)
    }

    /// Runs one frame and returns the full report plus the next state.
    pub fn process_frame(
        &self,
        detections: &[RawDetection],
        state: &LocalizerState,
        odometry: Option<Translation>,
    ) -> (FrameReport, LocalizerState) {
        let groups = self.candidate_groups(detections);
        let priors = Priors {
            odometry,
            last_known: state.last_known,
        };
        let (estimate, resolution) = self.estimate_groups(&groups, &priors);
        debug!(
            detections = detections.len(),
            accepted = groups.len(),
            strategy = ?resolution.strategy,
            dispersion = estimate.dispersion.scalar(),
            "frame localized"
        );
        let next = state.advance(&estimate);
        let report = FrameReport {
            rejected: detections.len() - groups.len(),
            estimate,
            resolution,
        };
        (report, next)
    }

    /// Runs one frame, returning the fused pose and the next state.
    pub fn process(
        &self,
        detections: &[RawDetection],
        state: &LocalizerState,
        odometry: Option<Translation>,
    ) -> (AggregatePose, LocalizerState) {
        let (report, next) = self.process_frame(detections, state, odometry);
        (report.estimate, next)
    }

    /// Estimates from progressively fewer markers: first all accepted
    /// detections, then without the first one, and so on down to the last.
    ///
    /// Every step is resolved against the same priors. The state is not
    /// touched; clone the iterator to replay it.
    pub fn characterize(
        &self,
        detections: &[RawDetection],
        state: &LocalizerState,
        odometry: Option<Translation>,
    ) -> Characterization<'_> {
        Characterization {
            localizer: self,
            groups: self.candidate_groups(detections),
            priors: Priors {
                odometry,
                last_known: state.last_known,
            },
            start: 0,
        }
    }
}

/// Lazy sequence of estimates with a shrinking marker set.
#[derive(Clone)]
pub struct Characterization<'a> {
    localizer: &'a Localizer,
    groups: Vec<CandidateGroup>,
    priors: Priors,
    start: usize,
}

impl Iterator for Characterization<'_> {
    type Item = AggregatePose;

    fn next(&mut self) -> Option<Self::Item> {
        if self.start >= self.groups.len() {
            return None;
        }
        let (estimate, _) = self
            .localizer
            .estimate_groups(&self.groups[self.start..], &self.priors);
        self.start += 1;
        Some(estimate)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.groups.len() - self.start;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Characterization<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::AmbiguousPose;
    use crate::transform::Rotation;

    fn localizer() -> Localizer {
        Localizer::new(FieldMap::default(), FusionTuning::default())
    }

    /// Detection of `id` as seen from `camera`, paired with a decoy solution
    /// that places the camera at `decoy`.
    fn seen_from(
        loc: &Localizer,
        id: u32,
        camera: RigidTransform,
        decoy: RigidTransform,
    ) -> RawDetection {
        let marker = loc.field().get(id).unwrap().pose;
        let truth = camera.inverse().transform_by(marker);
        let wrong = decoy.inverse().transform_by(marker);
        RawDetection::new(id, AmbiguousPose::new(truth, wrong))
    }

    fn robot() -> RigidTransform {
        RigidTransform::new(
            Translation::new(3.0, 9.0, 0.0),
            Rotation::from_yaw_degrees(90.0),
        )
    }

    fn decoy(x: f64, y: f64) -> RigidTransform {
        RigidTransform::new(Translation::new(x, y, 0.0), Rotation::from_yaw_degrees(90.0))
    }

    #[test]
    fn test_empty_frame_keeps_prior_and_counts() {
        let loc = localizer();
        let state = LocalizerState {
            last_known: Some(robot()),
            frames_since_update: 2,
        };
        let (pose, next) = loc.process(&[], &state, None);
        assert!(!pose.has_estimate());
        assert_eq!(pose.dispersion.scalar(), 999.0);
        assert_eq!(next.last_known, Some(robot()));
        assert_eq!(next.frames_since_update, 3);
    }

    #[test]
    fn test_multi_marker_frame_recovers_pose() {
        let loc = localizer();
        let detections = [
            seen_from(&loc, 1, robot(), decoy(6.0, 2.0)),
            RawDetection::new(0, AmbiguousPose::new(robot(), robot())),
            seen_from(&loc, 2, robot(), decoy(0.5, 4.0)).solutions_swapped(),
            seen_from(&loc, 3, robot(), decoy(7.5, 1.0)),
        ];
        let (report, next) = loc.process_frame(&detections, &LocalizerState::default(), None);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.estimate.marker_ids, vec![1, 2, 3]);
        assert!(report.estimate.pose.approx_eq(robot(), 1e-9));
        assert!(report.estimate.dispersion.scalar() < 1e-9);
        assert_eq!(next.frames_since_update, 0);
        assert!(next.last_known.unwrap().approx_eq(robot(), 1e-9));
    }

    #[test]
    fn test_single_marker_uses_last_known() {
        let loc = localizer();
        let detections = [seen_from(&loc, 4, robot(), decoy(6.0, 14.0)).solutions_swapped()];
        let state = LocalizerState {
            last_known: Some(decoy(3.2, 8.5)),
            frames_since_update: 0,
        };
        let (pose, _) = loc.process(&detections, &state, None);
        assert!(pose.pose.approx_eq(robot(), 1e-9));
        assert_eq!(pose.dispersion.scalar(), 1.0);
    }

    #[test]
    fn test_odometry_beats_stale_prior() {
        let loc = localizer();
        let detections = [seen_from(&loc, 6, robot(), decoy(6.0, 3.0))];
        let state = LocalizerState {
            last_known: Some(decoy(6.0, 3.0)),
            frames_since_update: 0,
        };
        let (pose, _) = loc.process(&detections, &state, Some(Translation::new(3.1, 8.8, 0.0)));
        assert!(pose.pose.approx_eq(robot(), 1e-9));
    }

    #[test]
    fn test_characterize_drops_leading_markers() {
        let loc = localizer();
        let detections = [
            seen_from(&loc, 5, robot(), decoy(1.0, 1.0)),
            RawDetection::new(3, AmbiguousPose::new(robot(), robot())).with_quality(4, 50.0),
            seen_from(&loc, 6, robot(), decoy(7.0, 2.0)),
            seen_from(&loc, 7, robot(), decoy(2.0, 6.0)),
        ];
        let state = LocalizerState {
            last_known: Some(robot()),
            frames_since_update: 0,
        };
        let steps = loc.characterize(&detections, &state, None);
        assert_eq!(steps.len(), 3);
        let replay = steps.clone();
        let counts: Vec<Vec<u32>> = steps.map(|p| p.marker_ids).collect();
        assert_eq!(counts, vec![vec![5, 6, 7], vec![6, 7], vec![7]]);
        for pose in replay {
            assert!(pose.pose.approx_eq(robot(), 1e-9));
        }
    }

    #[test]
    fn test_characterize_nothing_visible() {
        let loc = localizer();
        let mut steps = loc.characterize(&[], &LocalizerState::default(), None);
        assert_eq!(steps.len(), 0);
        assert!(steps.next().is_none());
    }
}
