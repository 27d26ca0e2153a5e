use crate::params::trajectory;
use core::f64::consts::PI;
use hedgehog_core::field::{FIELD_LENGTH, FIELD_WIDTH};
use hedgehog_core::{RigidTransform, Rotation, Scalar, Translation};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// A counter-clockwise elliptical loop driven at constant speed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    pub center_x: Scalar,     // m
    pub center_y: Scalar,     // m
    pub radius_x: Scalar,     // m
    pub radius_y: Scalar,     // m
    pub speed: Scalar,        // m/s along the path
    pub frame_rate: Scalar,   // Hz
    pub duration: Scalar,     // s
    pub start_angle_degrees: Scalar,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            center_x: FIELD_WIDTH / 2.0,
            center_y: FIELD_LENGTH / 2.0,
            radius_x: 2.5,
            radius_y: 6.0,
            speed: 1.5,
            frame_rate: 20.0,
            duration: 40.0,
            start_angle_degrees: 0.0,
        }
    }
}

impl PathConfig {
    /// Frames in `[0, duration]`, zero when the rate or duration is not positive.
    pub fn frame_count(&self) -> usize {
        if !(self.frame_rate > 0.0 && self.duration >= 0.0) {
            return 0;
        }
        ((self.duration * self.frame_rate).floor() as usize).saturating_add(1)
    }

    /// Same path with duration and frame rate pulled into the supported
    /// ranges. Configs from files or flags go through this before a run.
    pub fn bounded(self) -> Self {
        Self {
            frame_rate: trajectory::FRAME_RATE.clamp(self.frame_rate),
            duration: trajectory::DURATION.clamp(self.duration),
            ..self
        }
    }

    /// Ramanujan's approximation of the ellipse perimeter.
    pub fn perimeter(&self) -> Scalar {
        let (a, b) = (self.radius_x.abs(), self.radius_y.abs());
        PI * (3.0 * (a + b) - ((3.0 * a + b) * (a + 3.0 * b)).sqrt())
    }

    fn angle_at(&self, t: Scalar) -> Scalar {
        let perimeter = self.perimeter();
        let rate = if perimeter > 0.0 {
            2.0 * PI * self.speed / perimeter
        } else {
            0.0
        };
        self.start_angle_degrees.to_radians() + rate * t
    }

    /// Robot pose at time `t`. The heading follows the direction of travel.
    pub fn pose_at(&self, t: Scalar) -> RigidTransform {
        let phi = self.angle_at(t);
        let (s, c) = phi.sin_cos();
        let position = Translation::new(
            self.center_x + self.radius_x * c,
            self.center_y + self.radius_y * s,
            0.0,
        );
        let heading = (self.radius_y * c).atan2(-self.radius_x * s);
        RigidTransform::new(position, Rotation::from_yaw_degrees(heading.to_degrees()))
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathResult {
    pub time: Vec<Scalar>,
    pub pose: Vec<RigidTransform>,
}

impl PathResult {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

pub fn simulate_path(cfg: &PathConfig) -> PathResult {
    let n = cfg.frame_count();
    let dt = if n > 0 { 1.0 / cfg.frame_rate } else { 0.0 };
    let time: Vec<Scalar> = (0..n).map(|i| i as Scalar * dt).collect();
    let pose = time.iter().map(|&t| cfg.pose_at(t)).collect();
    PathResult { time, pose }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_count() {
        let cfg = PathConfig {
            frame_rate: 10.0,
            duration: 2.0,
            ..PathConfig::default()
        };
        assert_eq!(cfg.frame_count(), 21);
        let path = simulate_path(&cfg);
        assert_eq!(path.len(), 21);
        assert!((path.time[20] - 2.0).abs() < 1e-12);

        let stopped = PathConfig {
            frame_rate: 0.0,
            ..cfg
        };
        assert!(simulate_path(&stopped).is_empty());
    }

    #[test]
    fn test_unbounded_durations() {
        let endless = PathConfig {
            duration: f64::INFINITY,
            ..PathConfig::default()
        };
        assert_eq!(endless.frame_count(), usize::MAX);

        let bounded = endless.bounded();
        assert_eq!(bounded.duration, trajectory::DURATION.max);
        assert_eq!(bounded.frame_count(), 600 * 20 + 1);

        let sluggish = PathConfig {
            frame_rate: 1e-300,
            duration: f64::NAN,
            ..PathConfig::default()
        }
        .bounded();
        assert_eq!(sluggish.frame_rate, trajectory::FRAME_RATE.min);
        assert_eq!(sluggish.duration, trajectory::DURATION.min);
        assert_eq!(sluggish.frame_count(), 2);
    }

    #[test]
    fn test_circle_perimeter() {
        let cfg = PathConfig {
            radius_x: 2.0,
            radius_y: 2.0,
            ..PathConfig::default()
        };
        assert!((cfg.perimeter() - 4.0 * PI).abs() < 1e-9);
    }

    #[test]
    fn test_heading_follows_travel() {
        let cfg = PathConfig::default();
        // At angle 0 the robot is on the +x side heading up the field.
        let p0 = cfg.pose_at(0.0);
        assert!((p0.translation.x - (cfg.center_x + cfg.radius_x)).abs() < 1e-9);
        assert!((p0.rotation.yaw_degrees() - 90.0).abs() < 1e-9);

        let step = cfg.pose_at(0.01).translation - p0.translation;
        assert!(step.y > 0.0);
    }

    #[test]
    fn test_speed_on_circle() {
        let cfg = PathConfig {
            radius_x: 3.0,
            radius_y: 3.0,
            speed: 2.0,
            ..PathConfig::default()
        };
        let dt = 0.001;
        let step = cfg.pose_at(1.0 + dt).translation - cfg.pose_at(1.0).translation;
        assert!((step.norm() / dt - cfg.speed).abs() < 1e-3);
    }

    #[test]
    fn test_default_loop_stays_on_field() {
        let path = simulate_path(&PathConfig::default());
        for pose in &path.pose {
            let t = pose.translation;
            assert!(t.x > 0.0 && t.x < FIELD_WIDTH);
            assert!(t.y > 0.0 && t.y < FIELD_LENGTH);
        }
    }
}
