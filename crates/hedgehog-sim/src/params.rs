//! Parameter definitions for sweeps and dashboard controls.

use serde::Serialize;

/// Parameter specification with bounds and step size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParamSpec {
    /// Human-readable label.
    pub label: &'static str,
    /// Minimum value.
    pub min: f64,
    /// Maximum value.
    pub max: f64,
    /// Step size for sliders.
    pub step: f64,
}

impl ParamSpec {
    /// Create a new parameter specification.
    pub const fn new(label: &'static str, min: f64, max: f64, step: f64) -> Self {
        Self {
            label,
            min,
            max,
            step,
        }
    }

    /// Pulls `value` into `[min, max]`. NaN maps to `min`.
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            self.min
        } else {
            value.clamp(self.min, self.max)
        }
    }

    /// `steps` evenly spaced values from `min` to `max` inclusive.
    pub fn sweep(&self, steps: usize) -> Vec<f64> {
        match steps {
            0 => Vec::new(),
            1 => vec![self.min],
            n => (0..n)
                .map(|i| self.min + (self.max - self.min) * i as f64 / (n - 1) as f64)
                .collect(),
        }
    }
}

/// Robot trajectory parameters.
pub mod trajectory {
    use super::ParamSpec;

    pub const SPEED: ParamSpec = ParamSpec::new("Speed (m/s)", 0.1, 5.0, 0.1);
    pub const RADIUS_X: ParamSpec = ParamSpec::new("Loop Radius X (m)", 0.5, 4.0, 0.1);
    pub const RADIUS_Y: ParamSpec = ParamSpec::new("Loop Radius Y (m)", 0.5, 8.0, 0.1);
    pub const FRAME_RATE: ParamSpec = ParamSpec::new("Frame Rate (Hz)", 1.0, 120.0, 1.0);
    pub const DURATION: ParamSpec = ParamSpec::new("Duration (s)", 1.0, 600.0, 1.0);
}

/// Camera model parameters.
pub mod camera {
    use super::ParamSpec;

    pub const HORIZONTAL_FOV: ParamSpec = ParamSpec::new("Horizontal FOV (°)", 20.0, 170.0, 1.0);
    pub const MAX_RANGE: ParamSpec = ParamSpec::new("Max Range (m)", 1.0, 15.0, 0.5);
    pub const MAX_INCIDENCE: ParamSpec = ParamSpec::new("Max Incidence (°)", 10.0, 89.0, 1.0);
    pub const NOISE_SCALE: ParamSpec = ParamSpec::new("Noise Scale", 0.0, 5.0, 0.25);
    pub const TRANSLATION_NOISE: ParamSpec = ParamSpec::new("Translation σ (m/m)", 0.0, 0.1, 0.001);
    pub const ROTATION_NOISE: ParamSpec = ParamSpec::new("Rotation σ (°)", 0.0, 10.0, 0.1);
    pub const CORRUPT_PROBABILITY: ParamSpec = ParamSpec::new("Corrupt Decode P", 0.0, 1.0, 0.01);
    pub const LOW_MARGIN_PROBABILITY: ParamSpec = ParamSpec::new("Low Margin P", 0.0, 1.0, 0.01);
    pub const PHANTOM_PROBABILITY: ParamSpec = ParamSpec::new("Unknown Id P", 0.0, 1.0, 0.01);
}

/// Odometry prior parameters.
pub mod odometry {
    use super::ParamSpec;

    pub const DRIFT: ParamSpec = ParamSpec::new("Drift σ (m/frame)", 0.0, 0.1, 0.001);
}

/// Fusion tuning parameters.
pub mod fusion {
    use super::ParamSpec;

    pub const MIN_DECISION_MARGIN: ParamSpec = ParamSpec::new("Min Decision Margin", 0.0, 100.0, 0.1);
    pub const MAX_HAMMING: ParamSpec = ParamSpec::new("Max Hamming", 0.0, 3.0, 1.0);
    pub const DISPERSION_SCALE: ParamSpec = ParamSpec::new("Dispersion Scale", 0.5, 10.0, 0.5);
}

/// Every tunable, keyed by the name used in config files and query strings.
pub const ALL_PARAMS: [(&str, ParamSpec); 18] = [
    ("speed", trajectory::SPEED),
    ("radius_x", trajectory::RADIUS_X),
    ("radius_y", trajectory::RADIUS_Y),
    ("frame_rate", trajectory::FRAME_RATE),
    ("duration", trajectory::DURATION),
    ("horizontal_fov_degrees", camera::HORIZONTAL_FOV),
    ("max_range", camera::MAX_RANGE),
    ("max_incidence_degrees", camera::MAX_INCIDENCE),
    ("noise_scale", camera::NOISE_SCALE),
    ("translation_noise_std", camera::TRANSLATION_NOISE),
    ("rotation_noise_std_degrees", camera::ROTATION_NOISE),
    ("corrupt_probability", camera::CORRUPT_PROBABILITY),
    ("low_margin_probability", camera::LOW_MARGIN_PROBABILITY),
    ("phantom_probability", camera::PHANTOM_PROBABILITY),
    ("drift_std", odometry::DRIFT),
    ("max_hamming", fusion::MAX_HAMMING),
    ("min_decision_margin", fusion::MIN_DECISION_MARGIN),
    ("dispersion_scale", fusion::DISPERSION_SCALE),
];

/// Look up a parameter spec by name.
pub fn param_spec(name: &str) -> Option<ParamSpec> {
    ALL_PARAMS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, spec)| *spec)
}
