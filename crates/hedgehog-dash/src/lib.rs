//! Hedgehog Dash - HTTP view of the field localizer
//!
//! Features:
//! - Latest published pose, fed by a replay worker
//! - On-demand simulation runs via API
//! - Chart series for position, error, dispersion and marker count
//! - Parameter bounds for building controls

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use hedgehog_core::{AggregatePose, FieldBounds, FieldMap, PublishedPose, RigidTransform};
use hedgehog_sim::{simulate, ErrorStats, ParamSpec, SimConfig, SimRun, ALL_PARAMS};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Name the pose is published under.
pub const POSE_NAME: &str = "vision";

/// Most recent pose that passed the publishing gate. One writer, many readers.
pub type PoseSlot = Arc<RwLock<Option<PublishedPose>>>;

#[derive(Clone)]
pub struct DashState {
    pub latest: PoseSlot,
    pub field: Arc<FieldMap>,
    pub bounds: FieldBounds,
}

impl DashState {
    pub fn new(field: FieldMap) -> Self {
        Self {
            latest: Arc::new(RwLock::new(None)),
            field: Arc::new(field),
            bounds: FieldBounds::DEFAULT,
        }
    }
}

/// Creates the Axum router with all routes
pub fn create_router(state: DashState) -> Router {
    Router::new()
        .route("/api/pose", get(handle_pose))
        .route("/api/simulate", get(handle_simulate))
        .route("/api/chart/{chart_type}", get(handle_chart_data))
        .route("/api/params", get(handle_params))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the dashboard and replays `config` into the pose slot until the
/// listener fails.
pub async fn serve(addr: SocketAddr, config: SimConfig, field: FieldMap) -> anyhow::Result<()> {
    let state = DashState::new(field);
    let _worker = spawn_replay(state.latest.clone(), config, (*state.field).clone(), state.bounds);
    let app = create_router(state);
    let listener = TcpListener::bind(addr).await?;
    info!("dashboard listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Publishing
// ---------------------------------------------------------------------------

/// Writes `estimate` into the slot if it passes the gate. A rejected frame
/// leaves the previous pose in place.
pub fn publish(slot: &PoseSlot, estimate: &AggregatePose, bounds: &FieldBounds) -> bool {
    match PublishedPose::from_aggregate(POSE_NAME, estimate, bounds) {
        Some(pose) => {
            *slot.write() = Some(pose);
            true
        }
        None => false,
    }
}

/// Replays a simulated run at its own frame rate, over and over, publishing
/// each frame's estimate.
pub fn spawn_replay(slot: PoseSlot, config: SimConfig, field: FieldMap, bounds: FieldBounds) -> JoinHandle<()> {
    let config = SimConfig {
        path: config.path.bounded(),
        ..config
    };
    tokio::spawn(async move {
        let run = simulate(&config, &field);
        if run.result.is_empty() {
            warn!("replay has no frames, nothing to publish");
            return;
        }
        let period = Duration::from_secs_f64(1.0 / config.path.frame_rate).max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval(period);
        info!(frames = run.result.len(), ?period, "replay started");
        loop {
            for estimate in &run.result.estimate {
                ticker.tick().await;
                publish(&slot, estimate, &bounds);
            }
        }
    })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `null` until something has been published.
async fn handle_pose(State(state): State<DashState>) -> Json<Option<PublishedPose>> {
    Json(state.latest.read().clone())
}

/// Handle simulation request
async fn handle_simulate(
    State(state): State<DashState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<SimulationResponse> {
    let config = parse_config(&params);
    let run = simulate(&config, &state.field);
    Json(SimulationResponse::new(config, &run))
}

/// Handle specific chart data requests. Unknown chart types are 404.
async fn handle_chart_data(
    State(state): State<DashState>,
    Path(chart_type): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ChartData>, StatusCode> {
    if !CHART_TYPES.contains(&chart_type.as_str()) {
        return Err(StatusCode::NOT_FOUND);
    }
    let config = parse_config(&params);
    let run = simulate(&config, &state.field);
    generate_chart_data(&chart_type, &run)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn handle_params() -> Json<Vec<NamedParam>> {
    Json(
        ALL_PARAMS
            .iter()
            .map(|(name, spec)| NamedParam {
                name: *name,
                spec: *spec,
            })
            .collect(),
    )
}

#[derive(Serialize)]
struct NamedParam {
    name: &'static str,
    #[serde(flatten)]
    spec: ParamSpec,
}

/// Parse config from query parameters
fn parse_config(params: &HashMap<String, String>) -> SimConfig {
    let mut config = SimConfig::default();

    macro_rules! parse_param {
        ($($field:ident).+, $name:expr, $type:ty) => {
            if let Some(val) = params.get($name).and_then(|v| v.parse::<$type>().ok()) {
                config.$($field).+ = val;
            }
        };
    }

    parse_param!(path.speed, "speed", f64);
    parse_param!(path.radius_x, "radius_x", f64);
    parse_param!(path.radius_y, "radius_y", f64);
    parse_param!(path.frame_rate, "frame_rate", f64);
    parse_param!(path.duration, "duration", f64);
    parse_param!(camera.horizontal_fov_degrees, "horizontal_fov_degrees", f64);
    parse_param!(camera.max_range, "max_range", f64);
    parse_param!(camera.max_incidence_degrees, "max_incidence_degrees", f64);
    parse_param!(camera.noise_scale, "noise_scale", f64);
    parse_param!(camera.translation_noise_std, "translation_noise_std", f64);
    parse_param!(camera.rotation_noise_std_degrees, "rotation_noise_std_degrees", f64);
    parse_param!(camera.corrupt_probability, "corrupt_probability", f64);
    parse_param!(camera.low_margin_probability, "low_margin_probability", f64);
    parse_param!(camera.phantom_probability, "phantom_probability", f64);
    parse_param!(camera.seed, "seed", u64);
    parse_param!(odometry.enabled, "odometry", bool);
    parse_param!(odometry.drift_std, "drift_std", f64);
    parse_param!(tuning.max_hamming, "max_hamming", u32);
    parse_param!(tuning.min_decision_margin, "min_decision_margin", f64);
    parse_param!(tuning.dispersion_scale, "dispersion_scale", f64);

    // Keep a query string from asking for an arbitrarily long run.
    config.path = config.path.bounded();

    config
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Full simulation response with all data
#[derive(Serialize)]
struct SimulationResponse {
    config: SimConfig,
    time: Vec<f64>,
    true_x: Vec<f64>,
    true_y: Vec<f64>,
    true_yaw: Vec<f64>,
    est_x: Vec<Option<f64>>,
    est_y: Vec<Option<f64>>,
    est_yaw: Vec<Option<f64>>,
    dispersion: Vec<f64>,
    markers: Vec<usize>,
    strategy: Vec<&'static str>,
    stats: ErrorStats,
}

impl SimulationResponse {
    fn new(config: SimConfig, run: &SimRun) -> Self {
        let r = &run.result;
        let est = |f: fn(&AggregatePose) -> f64| -> Vec<Option<f64>> {
            r.estimate
                .iter()
                .map(|e| e.has_estimate().then(|| f(e)))
                .collect()
        };
        Self {
            config,
            time: r.time.clone(),
            true_x: r.truth.iter().map(|p| p.translation.x).collect(),
            true_y: r.truth.iter().map(|p| p.translation.y).collect(),
            true_yaw: r.truth.iter().map(|p| p.rotation.yaw_degrees()).collect(),
            est_x: est(|e| e.pose.translation.x),
            est_y: est(|e| e.pose.translation.y),
            est_yaw: est(|e| e.pose.rotation.yaw_degrees()),
            dispersion: r.estimate.iter().map(|e| e.dispersion.scalar()).collect(),
            markers: r.estimate.iter().map(|e| e.sample_count()).collect(),
            strategy: r.strategy.iter().map(|s| s.label()).collect(),
            stats: run.stats,
        }
    }
}

/// Chart data response
#[derive(Serialize)]
struct ChartData {
    title: String,
    x_label: String,
    y_label: String,
    x: Vec<f64>,
    series: Vec<Series>,
}

#[derive(Serialize)]
struct Series {
    name: String,
    /// `None` where the frame had no estimate.
    y: Vec<Option<f64>>,
}

/// Chart names served under `/api/chart/`.
pub const CHART_TYPES: [&str; 4] = ["position", "error", "dispersion", "markers"];

fn generate_chart_data(chart_type: &str, run: &SimRun) -> Option<ChartData> {
    let r = &run.result;
    let chart = match chart_type {
        "position" => {
            let truth = |f: fn(&RigidTransform) -> f64| -> Vec<Option<f64>> { r.truth.iter().map(|p| Some(f(p))).collect() };
            let est = |f: fn(&RigidTransform) -> f64| -> Vec<Option<f64>> {
                r.estimate
                    .iter()
                    .map(|e| e.has_estimate().then(|| f(&e.pose)))
                    .collect()
            };
            ChartData {
                title: "Field Position vs Time".to_string(),
                x_label: "Time (s)".to_string(),
                y_label: "Position (m)".to_string(),
                x: r.time.clone(),
                series: vec![
                    Series {
                        name: "true_x".to_string(),
                        y: truth(|p| p.translation.x),
                    },
                    Series {
                        name: "true_y".to_string(),
                        y: truth(|p| p.translation.y),
                    },
                    Series {
                        name: "est_x".to_string(),
                        y: est(|p| p.translation.x),
                    },
                    Series {
                        name: "est_y".to_string(),
                        y: est(|p| p.translation.y),
                    },
                ],
            }
        }
        "dispersion" => ChartData {
            title: "Dispersion vs Time".to_string(),
            x_label: "Time (s)".to_string(),
            y_label: "Dispersion (m)".to_string(),
            x: r.time.clone(),
            series: vec![Series {
                name: "dispersion".to_string(),
                y: r.estimate
                    .iter()
                    .map(|e| e.has_estimate().then_some(e.dispersion.scalar()))
                    .collect(),
            }],
        },
        "markers" => ChartData {
            title: "Markers Used vs Time".to_string(),
            x_label: "Time (s)".to_string(),
            y_label: "Markers".to_string(),
            x: r.time.clone(),
            series: vec![Series {
                name: "markers".to_string(),
                y: r.estimate.iter().map(|e| Some(e.sample_count() as f64)).collect(),
            }],
        },
        "error" => ChartData {
            title: "Position Error vs Time".to_string(),
            x_label: "Time (s)".to_string(),
            y_label: "Error (m)".to_string(),
            x: r.time.clone(),
            series: vec![Series {
                name: "error".to_string(),
                y: (0..r.len()).map(|i| r.position_error(i)).collect(),
            }],
        },
        _ => return None,
    };
    Some(chart)
}
