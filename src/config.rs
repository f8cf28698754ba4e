//! Typed, centrally-pinned configuration. `EngineConfig::default()` matches
//! the urgency/clustering/refinement contract exactly; individual fields can
//! be overridden from the environment for deployment tuning.

use std::env;

use crate::domain::types::{Priority, ProblemSize, ProblemType};

pub mod constant {
    /// Earth radius used for haversine distance, in km.
    pub const EARTH_RADIUS_KM: f64 = 6371.0;

    /// DBSCAN neighborhood radius, in km.
    pub const DBSCAN_EPS_KM: f64 = 0.5;
    /// DBSCAN minimum neighbors (including the point itself) to seed a cluster.
    pub const DBSCAN_MIN_SAMPLES: usize = 2;

    /// 2-opt convergence threshold, in minutes.
    pub const TWO_OPT_EPSILON: f64 = 1e-6;
    /// 2-opt pass cap.
    pub const TWO_OPT_MAX_ITERS: usize = 50;

    /// Default shift budget, in hours.
    pub const DEFAULT_MAX_HOURS: f64 = 8.0;
    /// Default stop cap per route.
    pub const DEFAULT_MAX_POINTS: usize = 50;

    /// Maximum number of one-for-one emergency swaps the validator performs.
    pub const MAX_EMERGENCY_SWAPS: usize = 10;
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Urgency scoring weight tables. Exact constants are the contract: callers
/// must reproduce these values even if they centralize the table elsewhere.
#[derive(Debug, Clone, Copy)]
pub struct UrgencyWeights {
    pub affects_traffic: f64,
    pub near_critical_location: f64,
    pub main_road: f64,
    pub affects_commerce: f64,
    pub complaint_unit: f64,
    pub complaint_cap: u32,
}

impl Default for UrgencyWeights {
    fn default() -> Self {
        UrgencyWeights {
            affects_traffic: 150.0,
            near_critical_location: 100.0,
            main_road: 80.0,
            affects_commerce: 60.0,
            complaint_unit: 5.0,
            complaint_cap: 50,
        }
    }
}

pub fn priority_base(priority: Priority) -> f64 {
    match priority {
        Priority::Emergency => 1000.0,
        Priority::Urgent => 500.0,
        Priority::High => 200.0,
        Priority::Medium => 50.0,
        Priority::Low => 10.0,
    }
}

pub fn size_factor(size: Option<ProblemSize>) -> f64 {
    match size {
        Some(ProblemSize::Large) => 1.5,
        Some(ProblemSize::Medium) => 1.0,
        Some(ProblemSize::Small) => 0.7,
        None => 1.0,
    }
}

pub fn type_bonus(problem_type: ProblemType) -> f64 {
    match problem_type {
        ProblemType::ExposedWiring => 200.0,
        ProblemType::FaultyTrafficLight => 180.0,
        ProblemType::SewerLeak => 120.0,
        ProblemType::WaterLeak => 100.0,
        ProblemType::DarkLamp => 60.0,
        ProblemType::Pothole => 40.0,
        ProblemType::CloggedDrain => 40.0,
        ProblemType::BrokenSidewalk => 20.0,
    }
}

/// Every tunable named in the spec, constructed with contract defaults and
/// overridable per-field from the environment.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub urgency_weights: UrgencyWeights,
    pub earth_radius_km: f64,
    pub avg_speed_kmh: f64,
    pub dbscan_eps_km: f64,
    pub dbscan_min_samples: usize,
    pub two_opt_epsilon: f64,
    pub two_opt_max_iters: usize,
    pub default_max_hours: f64,
    pub default_max_points: usize,
    pub max_emergency_swaps: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            urgency_weights: UrgencyWeights::default(),
            earth_radius_km: constant::EARTH_RADIUS_KM,
            avg_speed_kmh: 30.0,
            dbscan_eps_km: constant::DBSCAN_EPS_KM,
            dbscan_min_samples: constant::DBSCAN_MIN_SAMPLES,
            two_opt_epsilon: constant::TWO_OPT_EPSILON,
            two_opt_max_iters: constant::TWO_OPT_MAX_ITERS,
            default_max_hours: constant::DEFAULT_MAX_HOURS,
            default_max_points: constant::DEFAULT_MAX_POINTS,
            max_emergency_swaps: constant::MAX_EMERGENCY_SWAPS,
        }
    }
}

impl EngineConfig {
    /// Starts from contract defaults, then lets deployment-specific
    /// environment variables override individual fields.
    pub fn from_env() -> Self {
        let defaults = EngineConfig::default();
        EngineConfig {
            avg_speed_kmh: env_f64("ROUTE_ENGINE_AVG_SPEED_KMH", defaults.avg_speed_kmh),
            dbscan_eps_km: env_f64("ROUTE_ENGINE_DBSCAN_EPS_KM", defaults.dbscan_eps_km),
            dbscan_min_samples: env_usize(
                "ROUTE_ENGINE_DBSCAN_MIN_SAMPLES",
                defaults.dbscan_min_samples,
            ),
            default_max_hours: env_f64("ROUTE_ENGINE_DEFAULT_MAX_HOURS", defaults.default_max_hours),
            default_max_points: env_usize(
                "ROUTE_ENGINE_DEFAULT_MAX_POINTS",
                defaults.default_max_points,
            ),
            ..defaults
        }
    }
}
