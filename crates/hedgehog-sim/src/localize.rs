use crate::path::PathResult;
use crate::sensor::FrameData;
use hedgehog_core::{AggregatePose, Localizer, LocalizerState, RigidTransform, Scalar, Strategy};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// Struct to hold the output of a localization replay.
#[derive(Debug, Clone, Serialize)]
pub struct LocalizeResult {
    pub time: Vec<Scalar>,
    pub truth: Vec<RigidTransform>,
    pub estimate: Vec<AggregatePose>,
    pub strategy: Vec<Strategy>,
    /// Detections the camera reported, before filtering.
    pub detections: Vec<usize>,
}

impl LocalizeResult {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Position error of frame `i`, if it had an estimate.
    pub fn position_error(&self, i: usize) -> Option<Scalar> {
        let estimate = self.estimate.get(i)?;
        if !estimate.has_estimate() {
            return None;
        }
        Some(estimate.pose.distance_to(self.truth[i]))
    }

    pub fn yaw_error_degrees(&self, i: usize) -> Option<Scalar> {
        let estimate = self.estimate.get(i)?;
        if !estimate.has_estimate() {
            return None;
        }
        Some(yaw_difference(
            estimate.pose.rotation.yaw_degrees(),
            self.truth[i].rotation.yaw_degrees(),
        ))
    }
}

fn yaw_difference(a: Scalar, b: Scalar) -> Scalar {
    let d = (a - b).rem_euclid(360.0);
    if d > 180.0 {
        360.0 - d
    } else {
        d
    }
}

/// Run the localizer over a rendered path, threading its state through
/// every frame.
pub fn run_localizer(path: &PathResult, frames: &FrameData, localizer: &Localizer) -> LocalizeResult {
    let n = path.len().min(frames.detections.len());
    let mut out = LocalizeResult {
        time: Vec::with_capacity(n),
        truth: Vec::with_capacity(n),
        estimate: Vec::with_capacity(n),
        strategy: Vec::with_capacity(n),
        detections: Vec::with_capacity(n),
    };

    let mut state = LocalizerState::default();
    for i in 0..n {
        let detections = &frames.detections[i];
        let odometry = frames.odometry.get(i).copied().flatten();
        let (report, next) = localizer.process_frame(detections, &state, odometry);
        state = next;

        out.time.push(path.time[i]);
        out.truth.push(path.pose[i]);
        out.strategy.push(report.resolution.strategy);
        out.estimate.push(report.estimate);
        out.detections.push(detections.len());
    }
    out
}

/// Summary of a localization replay against ground truth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ErrorStats {
    pub frames: usize,
    /// Frames that produced an estimate.
    pub estimated: usize,
    /// `estimated / frames`, zero for an empty run.
    pub availability: Scalar,
    pub rmse: Scalar,
    pub max_error: Scalar,
    pub rmse_yaw_degrees: Scalar,
    /// Estimates further than one meter from the truth.
    pub outliers: usize,
}

const OUTLIER_DISTANCE: Scalar = 1.0;

pub fn error_stats(result: &LocalizeResult) -> ErrorStats {
    let mut stats = ErrorStats {
        frames: result.len(),
        ..ErrorStats::default()
    };
    let mut sum_sq = 0.0;
    let mut sum_sq_yaw = 0.0;
    for i in 0..result.len() {
        let (Some(e), Some(yaw)) = (result.position_error(i), result.yaw_error_degrees(i)) else {
            continue;
        };
        stats.estimated += 1;
        sum_sq += e * e;
        sum_sq_yaw += yaw * yaw;
        stats.max_error = stats.max_error.max(e);
        if e > OUTLIER_DISTANCE {
            stats.outliers += 1;
        }
    }
    if stats.frames > 0 {
        stats.availability = stats.estimated as Scalar / stats.frames as Scalar;
    }
    if stats.estimated > 0 {
        stats.rmse = (sum_sq / stats.estimated as Scalar).sqrt();
        stats.rmse_yaw_degrees = (sum_sq_yaw / stats.estimated as Scalar).sqrt();
    }
    info!(
        frames = stats.frames,
        availability = stats.availability,
        rmse = stats.rmse,
        "localization replay scored"
    );
    stats
}

/// Error of estimates built from a given number of markers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarkerCountStats {
    pub markers: usize,
    pub samples: usize,
    pub rmse: Scalar,
    pub max_error: Scalar,
}

/// Replays the run like [`run_localizer`], and on every frame also
/// characterizes the estimate with progressively fewer markers. Results are
/// grouped by the number of markers that went into each estimate.
pub fn characterize_run(path: &PathResult, frames: &FrameData, localizer: &Localizer) -> Vec<MarkerCountStats> {
    let n = path.len().min(frames.detections.len());
    let mut buckets: BTreeMap<usize, (usize, Scalar, Scalar)> = BTreeMap::new();

    let mut state = LocalizerState::default();
    for i in 0..n {
        let detections = &frames.detections[i];
        let odometry = frames.odometry.get(i).copied().flatten();
        for estimate in localizer.characterize(detections, &state, odometry) {
            let e = estimate.pose.distance_to(path.pose[i]);
            let entry = buckets.entry(estimate.sample_count()).or_insert((0, 0.0, 0.0));
            entry.0 += 1;
            entry.1 += e * e;
            entry.2 = entry.2.max(e);
        }
        let (_, next) = localizer.process(detections, &state, odometry);
        state = next;
    }

    buckets
        .into_iter()
        .map(|(markers, (samples, sum_sq, max_error))| MarkerCountStats {
            markers,
            samples,
            rmse: (sum_sq / samples as Scalar).sqrt(),
            max_error,
        })
        .collect()
}
