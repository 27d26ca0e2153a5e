use crate::path::PathResult;
use hedgehog_core::field::KnownMarker;
use hedgehog_core::transform::Vector3r;
use hedgehog_core::{AmbiguousPose, FieldMap, RawDetection, RigidTransform, Rotation, Scalar, Translation};
use nalgebra::UnitQuaternion;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Upper bound for the decision margin of a deliberately weak decode.
const WEAK_MARGIN_MAX: Scalar = 0.5;

/// Ids handed out to detections that match nothing on the field.
const PHANTOM_IDS: [u32; 4] = [0, 13, 27, 586];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Camera frame in the robot frame. The camera looks along its local +x.
    pub mount: RigidTransform,
    pub horizontal_fov_degrees: Scalar,
    pub max_range: Scalar, // m
    /// Markers seen more obliquely than this are not decoded.
    pub max_incidence_degrees: Scalar,
    pub noise_scale: Scalar,
    /// Translation noise per meter of range.
    pub translation_noise_std: Scalar,
    pub rotation_noise_std_degrees: Scalar,
    pub corrupt_probability: Scalar,
    pub low_margin_probability: Scalar,
    /// Chance per frame of an extra detection whose id is not on the field.
    pub phantom_probability: Scalar,
    pub seed: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            mount: RigidTransform::from_translation(Translation::new(0.25, 0.0, 0.5)),
            horizontal_fov_degrees: 90.0,
            max_range: 7.0,
            max_incidence_degrees: 75.0,
            noise_scale: 1.0,
            translation_noise_std: 0.01,
            rotation_noise_std_degrees: 1.0,
            corrupt_probability: 0.02,
            low_margin_probability: 0.03,
            phantom_probability: 0.02,
            seed: 42,
        }
    }
}

impl CameraConfig {
    /// A camera that reports exactly what it sees and nothing else.
    pub fn ideal() -> Self {
        Self {
            noise_scale: 0.0,
            corrupt_probability: 0.0,
            low_margin_probability: 0.0,
            phantom_probability: 0.0,
            ..Self::default()
        }
    }
}

/// Wheel odometry as a drifting position prior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OdometryConfig {
    pub enabled: bool,
    /// Random-walk step per frame, per horizontal axis (m).
    pub drift_std: Scalar,
}

impl Default for OdometryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            drift_std: 0.005,
        }
    }
}

/// What the robot's sensors reported, one entry per path sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameData {
    pub time: Vec<Scalar>,
    pub detections: Vec<Vec<RawDetection>>,
    pub odometry: Vec<Option<Translation>>,
}

/// The marker frame in the camera frame, when `marker` can be decoded from
/// `camera`. The printed face looks along the marker's local -y axis.
pub fn observe(marker: &KnownMarker, camera: RigidTransform, cfg: &CameraConfig) -> Option<RigidTransform> {
    let marker_in_camera = camera.inverse().transform_by(marker.pose);
    let p = marker_in_camera.translation;
    let range = p.norm();
    if p.x <= 0.0 || range > cfg.max_range {
        return None;
    }
    if p.y.atan2(p.x).abs().to_degrees() > cfg.horizontal_fov_degrees / 2.0 {
        return None;
    }
    let camera_in_marker = marker_in_camera.inverse().translation;
    if camera_in_marker.y >= 0.0 {
        return None;
    }
    let incidence = (-camera_in_marker.y / range).min(1.0).acos().to_degrees();
    (incidence <= cfg.max_incidence_degrees).then_some(marker_in_camera)
}

/// The other planar-pose solution: the camera reflected across the plane
/// through the marker's normal and vertical axis.
///
/// Reflecting the camera frame makes it left-handed, so its lateral axis is
/// flipped back. The viewing direction and up axis are plain mirror images.
pub fn mirrored(marker_in_camera: RigidTransform) -> RigidTransform {
    let camera = marker_in_camera.inverse();
    let t = camera.translation;
    let r = camera.rotation;
    // diag(-1, 1, 1) applied on both sides of the rotation
    let conjugated = Rotation {
        w: r.w,
        x: r.x,
        y: -r.y,
        z: -r.z,
    };
    let reflected = RigidTransform::new(
        Translation::new(-t.x, t.y, t.z),
        conjugated.compose(Rotation::from_yaw_degrees(180.0)),
    );
    reflected.inverse()
}

fn gaussian(rng: &mut StdRng, std: Scalar) -> Scalar {
    let n: Scalar = rng.sample(StandardNormal);
    n * std
}

fn chance(rng: &mut StdRng, p: Scalar) -> bool {
    rng.gen::<Scalar>() < p
}

fn perturb(rng: &mut StdRng, marker_in_camera: RigidTransform, cfg: &CameraConfig) -> RigidTransform {
    let t = marker_in_camera.translation;
    let t_std = cfg.noise_scale * cfg.translation_noise_std * t.norm();
    let r_std = cfg.noise_scale * cfg.rotation_noise_std_degrees.to_radians();
    let dt = Translation::new(gaussian(rng, t_std), gaussian(rng, t_std), gaussian(rng, t_std));
    let dr = UnitQuaternion::from_scaled_axis(Vector3r::new(
        gaussian(rng, r_std),
        gaussian(rng, r_std),
        gaussian(rng, r_std),
    ));
    RigidTransform::new(
        t + dt,
        Rotation::from_unit(dr).compose(marker_in_camera.rotation),
    )
}

fn decode(rng: &mut StdRng, id: u32, marker_in_camera: RigidTransform, cfg: &CameraConfig) -> RawDetection {
    let hamming = if chance(rng, cfg.corrupt_probability) {
        rng.gen_range(1..=2)
    } else {
        0
    };
    let margin = if chance(rng, cfg.low_margin_probability) {
        rng.gen_range(0.0..WEAK_MARGIN_MAX)
    } else {
        rng.gen_range(20.0..120.0)
    };
    let solutions = AmbiguousPose::new(marker_in_camera, mirrored(marker_in_camera));
    let detection = RawDetection::new(id, solutions).with_quality(hamming, margin);
    if rng.gen::<bool>() {
        detection.solutions_swapped()
    } else {
        detection
    }
}

/// Renders the detections and odometry the robot would have produced
/// along `path`. Runs are reproducible for a given `camera.seed`.
pub fn generate_frames(
    path: &PathResult,
    field: &FieldMap,
    camera: &CameraConfig,
    odometry: &OdometryConfig,
) -> FrameData {
    let mut rng = StdRng::seed_from_u64(camera.seed);

    let n = path.len();
    let mut data = FrameData {
        time: path.time.clone(),
        detections: Vec::with_capacity(n),
        odometry: Vec::with_capacity(n),
    };

    let mut drift = Translation::zero();
    for robot in &path.pose {
        let camera_pose = robot.transform_by(camera.mount);

        let mut frame: Vec<RawDetection> = field
            .markers()
            .filter_map(|marker| observe(marker, camera_pose, camera).map(|m| (marker.id, m)))
            .map(|(id, m)| {
                let noisy = perturb(&mut rng, m, camera);
                decode(&mut rng, id, noisy, camera)
            })
            .collect();

        if chance(&mut rng, camera.phantom_probability) {
            let id = PHANTOM_IDS[rng.gen_range(0..PHANTOM_IDS.len())];
            let fake = RigidTransform::from_translation(Translation::new(2.0, 0.0, 0.0));
            frame.push(decode(&mut rng, id, fake, camera));
        }
        frame.shuffle(&mut rng);
        debug!(visible = frame.len(), "frame rendered");
        data.detections.push(frame);

        let prior = if odometry.enabled {
            drift = drift
                + Translation::new(
                    gaussian(&mut rng, odometry.drift_std),
                    gaussian(&mut rng, odometry.drift_std),
                    0.0,
                );
            Some(robot.translation + drift)
        } else {
            None
        };
        data.odometry.push(prior);
    }

    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::{simulate_path, PathConfig};
    use hedgehog_core::candidate::robot_pose;

    fn facing_far_wall() -> RigidTransform {
        RigidTransform::new(Translation::new(2.5, 11.0, 0.0), Rotation::from_yaw_degrees(90.0))
    }

    #[test]
    fn test_observe_respects_facing() {
        let field = FieldMap::default();
        let cfg = CameraConfig::default();
        let camera = facing_far_wall();
        // Far-wall markers face down the field toward the camera.
        assert!(observe(field.get(2).unwrap(), camera, &cfg).is_some());
        // Near-wall markers are behind the camera.
        assert!(observe(field.get(7).unwrap(), camera, &cfg).is_none());

        // Seen from behind the wall the printed face points away.
        let behind = RigidTransform::new(Translation::new(2.5, 16.3, 0.4), Rotation::from_yaw_degrees(-90.0));
        assert!(observe(field.get(2).unwrap(), behind, &cfg).is_none());
    }

    #[test]
    fn test_observe_range_and_fov() {
        let field = FieldMap::default();
        let narrow = CameraConfig {
            horizontal_fov_degrees: 20.0,
            ..CameraConfig::default()
        };
        let camera = facing_far_wall();
        // Marker 2 sits almost straight ahead, marker 4 well off to the side.
        assert!(observe(field.get(2).unwrap(), camera, &narrow).is_some());
        assert!(observe(field.get(4).unwrap(), camera, &narrow).is_none());

        let short = CameraConfig {
            max_range: 2.0,
            ..CameraConfig::default()
        };
        assert!(observe(field.get(2).unwrap(), camera, &short).is_none());
    }

    #[test]
    fn test_mirrored_solution_reflects_camera() {
        let field = FieldMap::default();
        let marker = field.get(1).unwrap();
        let camera = RigidTransform::new(Translation::new(2.0, 12.0, 0.3), Rotation::from_yaw_degrees(100.0));
        let m_in_c = camera.inverse().transform_by(marker.pose);

        let decoy = robot_pose(marker, mirrored(m_in_c), RigidTransform::identity());
        // Marker 1 has yaw 0, so its local x is the field x.
        let mx = marker.pose.translation.x;
        assert!((decoy.translation.x - (2.0 * mx - 2.0)).abs() < 1e-9);
        assert!((decoy.translation.y - 12.0).abs() < 1e-9);
        assert!((decoy.translation.z - 0.3).abs() < 1e-9);
        assert!((decoy.rotation.yaw_degrees() - 80.0).abs() < 1e-6);

        assert!(mirrored(mirrored(m_in_c)).approx_eq(m_in_c, 1e-9));
    }

    #[test]
    fn test_ideal_camera_contains_truth() {
        let field = FieldMap::default();
        let cfg = CameraConfig::ideal();
        let odo = OdometryConfig {
            enabled: true,
            drift_std: 0.0,
        };
        let path = simulate_path(&PathConfig {
            duration: 10.0,
            ..PathConfig::default()
        });
        let frames = generate_frames(&path, &field, &cfg, &odo);
        assert_eq!(frames.detections.len(), path.len());

        let mut seen = 0;
        for ((robot, detections), prior) in path.pose.iter().zip(&frames.detections).zip(&frames.odometry) {
            assert_eq!(prior.unwrap(), robot.translation);
            for d in detections {
                let marker = field.get(d.id).unwrap();
                let a = robot_pose(marker, d.solutions.primary, cfg.mount);
                let b = robot_pose(marker, d.solutions.secondary, cfg.mount);
                assert!(a.approx_eq(*robot, 1e-9) || b.approx_eq(*robot, 1e-9));
                assert_eq!(d.quality.hamming, 0);
                seen += 1;
            }
        }
        assert!(seen > 0);
    }

    #[test]
    fn test_seed_reproducible() {
        let field = FieldMap::default();
        let path = simulate_path(&PathConfig {
            duration: 5.0,
            ..PathConfig::default()
        });
        let cfg = CameraConfig {
            phantom_probability: 0.5,
            ..CameraConfig::default()
        };
        let odo = OdometryConfig::default();
        let a = generate_frames(&path, &field, &cfg, &odo);
        let b = generate_frames(&path, &field, &cfg, &odo);
        assert_eq!(a, b);

        let c = generate_frames(&path, &field, &CameraConfig { seed: 7, ..cfg }, &odo);
        assert_ne!(a.odometry, c.odometry);
    }

    #[test]
    fn test_odometry_disabled() {
        let field = FieldMap::default();
        let path = simulate_path(&PathConfig {
            duration: 1.0,
            ..PathConfig::default()
        });
        let odo = OdometryConfig {
            enabled: false,
            ..OdometryConfig::default()
        };
        let frames = generate_frames(&path, &field, &CameraConfig::default(), &odo);
        assert!(frames.odometry.iter().all(Option::is_none));
    }
}
