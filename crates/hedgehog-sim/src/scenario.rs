//! One complete simulated run: path, sensors, localization and scoring.

use crate::localize::{error_stats, run_localizer, ErrorStats, LocalizeResult};
use crate::path::{simulate_path, PathConfig, PathResult};
use crate::sensor::{generate_frames, CameraConfig, FrameData, OdometryConfig};
use hedgehog_core::{FieldMap, FusionTuning, Localizer};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub path: PathConfig,
    pub camera: CameraConfig,
    pub odometry: OdometryConfig,
    pub tuning: FusionTuning,
}

impl SimConfig {
    /// A localizer for this run. It is given the simulated camera's true
    /// mount, whatever `tuning.camera_mount` says.
    pub fn localizer(&self, field: FieldMap) -> Localizer {
        let tuning = FusionTuning {
            camera_mount: self.camera.mount,
            ..self.tuning
        };
        Localizer::new(field, tuning)
    }
}

pub struct SimRun {
    pub path: PathResult,
    pub frames: FrameData,
    pub result: LocalizeResult,
    pub stats: ErrorStats,
}

pub fn simulate(config: &SimConfig, field: &FieldMap) -> SimRun {
    let path = simulate_path(&config.path);
    let frames = generate_frames(&path, field, &config.camera, &config.odometry);
    let localizer = config.localizer(field.clone());
    let result = run_localizer(&path, &frames, &localizer);
    let stats = error_stats(&result);
    SimRun {
        path,
        frames,
        result,
        stats,
    }
}
