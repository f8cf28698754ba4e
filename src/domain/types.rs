use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Opaque stable ticket identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TicketId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemType {
    Pothole,
    WaterLeak,
    SewerLeak,
    DarkLamp,
    ExposedWiring,
    CloggedDrain,
    BrokenSidewalk,
    FaultyTrafficLight,
}

/// Ordered worst-to-best: `Emergency` ranks lowest so `#[derive(Ord)]` sorts it first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Emergency,
    Urgent,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrewType {
    Asphalt,
    Hydraulic,
    Electric,
    Sanitation,
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemSize {
    Small,
    Medium,
    Large,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Done,
    Cancelled,
}

/// One maintenance work item at a fixed location. Immutable for the
/// duration of one optimization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub lat: f64,
    pub lon: f64,
    pub problem_type: ProblemType,
    pub priority: Priority,
    pub crew_type: CrewType,
    pub problem_size: Option<ProblemSize>,
    pub estimated_service_minutes: u32,
    pub affects_traffic: bool,
    pub affects_commerce: bool,
    pub near_critical_location: bool,
    pub main_road: bool,
    pub complaints_count: u32,
    pub requires_road_block: bool,
    pub dependencies: BTreeSet<TicketId>,
    pub status: TicketStatus,
    /// Advisory cache from a previous run; the engine always recomputes
    /// urgency fresh and never trusts this value.
    pub urgency_score: Option<f64>,
    pub materials: Option<serde_json::Value>,
    pub photos: Option<serde_json::Value>,
    pub metadata: Option<serde_json::Value>,
}

impl Ticket {
    pub fn has_valid_coordinates(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }
}

/// A geographically dense subset of tickets produced by the clusterer,
/// or a singleton for a noise point.
#[derive(Debug, Clone)]
pub struct Cluster {
    pub ticket_ids: Vec<TicketId>,
    pub centroid_lat: f64,
    pub centroid_lon: f64,
    pub aggregate_priority: Priority,
    pub total_service_minutes: u32,
}

/// A cluster after nearest-neighbor construction and 2-opt refinement.
#[derive(Debug, Clone)]
pub struct ClusterTour {
    pub cluster: Cluster,
    /// Ticket ids in visit order; `entry`/`exit` are its first/last members.
    pub order: Vec<TicketId>,
}

impl ClusterTour {
    pub fn entry(&self) -> TicketId {
        self.order[0]
    }

    pub fn exit(&self) -> TicketId {
        *self.order.last().expect("cluster tour is never empty")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    Budget,
    DependencyMissing,
    DependencyCycle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DroppedTicket {
    pub ticket_id: TicketId,
    pub reason: DropReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitCode {
    Ok,
    NoCandidates,
    Partial,
    InvalidRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    UrgencyFirst,
    Geographic,
    Mixed,
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::Mixed
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedStop {
    pub ticket_id: TicketId,
    /// Minutes from shift start at which the crew arrives.
    pub arrival_offset_minutes: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteStats {
    pub clusters_served: usize,
    pub emergencies_covered: usize,
    pub skipped_due_to_budget: usize,
}

/// The optimization output: an ordered, budget-feasible visit plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub crew_type: CrewType,
    pub date: NaiveDate,
    pub stops: Vec<PlannedStop>,
    pub total_distance_km: f64,
    pub total_time_minutes: f64,
    pub stats: RouteStats,
    pub exit_code: ExitCode,
    pub dropped: Vec<DroppedTicket>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteId(pub i64);

/// Inputs to `EngineFacade::optimize`.
#[derive(Debug, Clone)]
pub struct OptimizeRequest {
    pub crew_type: CrewType,
    pub date: NaiveDate,
    pub max_hours: f64,
    pub max_points: usize,
    pub strategy: Strategy,
    pub deadline_ms: Option<u64>,
}

impl OptimizeRequest {
    pub fn max_minutes(&self) -> f64 {
        self.max_hours * 60.0
    }
}
