//! End-to-end tests against `EngineFacade::optimize`, covering the literal
//! scenarios from the testable-properties section that need the whole
//! pipeline (scoring through validation) rather than one component.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;

use crew_route_engine::domain::error::StoreError;
use crew_route_engine::store::TicketStore;
use crew_route_engine::{
    CrewType, EngineConfig, EngineFacade, OptimizeRequest, ProblemType, Route, RouteId, Strategy,
    Ticket, TicketId, TicketStatus,
};

/// An in-memory `TicketStore` so these tests don't need a SQLite file.
struct InMemoryTicketStore {
    tickets: Vec<Ticket>,
    saved_routes: Mutex<Vec<Route>>,
}

impl InMemoryTicketStore {
    fn new(tickets: Vec<Ticket>) -> Self {
        InMemoryTicketStore {
            tickets,
            saved_routes: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TicketStore for InMemoryTicketStore {
    async fn list_open_tickets(&self, crew_type: CrewType) -> Result<Vec<Ticket>, StoreError> {
        Ok(self
            .tickets
            .iter()
            .filter(|t| t.crew_type == crew_type && t.status == TicketStatus::Open)
            .cloned()
            .collect())
    }

    async fn get_ticket(&self, id: TicketId) -> Result<Ticket, StoreError> {
        self.tickets
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("ticket {id:?}")))
    }

    async fn save_route(&self, route: &Route) -> Result<RouteId, StoreError> {
        let mut saved = self.saved_routes.lock().unwrap();
        saved.push(route.clone());
        Ok(RouteId(saved.len() as i64))
    }
}

fn base_ticket(id: i64, lat: f64, lon: f64) -> Ticket {
    Ticket {
        id: TicketId(id),
        lat,
        lon,
        problem_type: ProblemType::Pothole,
        priority: crew_route_engine::Priority::Low,
        crew_type: CrewType::Asphalt,
        problem_size: None,
        estimated_service_minutes: 10,
        affects_traffic: false,
        affects_commerce: false,
        near_critical_location: false,
        main_road: false,
        complaints_count: 0,
        requires_road_block: false,
        dependencies: BTreeSet::new(),
        status: TicketStatus::Open,
        urgency_score: None,
        materials: None,
        photos: None,
        metadata: None,
    }
}

fn request() -> OptimizeRequest {
    OptimizeRequest {
        crew_type: CrewType::Asphalt,
        date: NaiveDate::from_ymd_opt(2026, 7, 31).unwrap(),
        max_hours: 8.0,
        max_points: 50,
        strategy: Strategy::Mixed,
        deadline_ms: None,
    }
}

#[tokio::test]
async fn scenario_s1_urgency_dominance() {
    let a = base_ticket(1, 0.0, 0.0); // priority=low
    let mut b = base_ticket(2, 1.0, 1.0);
    b.priority = crew_route_engine::Priority::Emergency;

    let store = Arc::new(InMemoryTicketStore::new(vec![a, b]));
    let facade = EngineFacade::new(store, None, EngineConfig::default());

    let route = facade.optimize(request()).await.unwrap();

    assert_eq!(route.stops.len(), 2);
    assert_eq!(route.stops[0].ticket_id, TicketId(2));
    assert_eq!(route.stops[1].ticket_id, TicketId(1));
    assert!((route.total_distance_km - 314.47).abs() < 1.0);
}

#[tokio::test]
async fn scenario_s3_dependency_reorders_despite_lower_urgency() {
    let t1 = base_ticket(1, 0.0, 0.0);
    let mut t2 = base_ticket(2, 0.0, 0.0001);
    t2.dependencies = BTreeSet::from([TicketId(1)]);
    t2.priority = crew_route_engine::Priority::Emergency;

    let store = Arc::new(InMemoryTicketStore::new(vec![t1, t2]));
    let facade = EngineFacade::new(store, None, EngineConfig::default());

    let route = facade.optimize(request()).await.unwrap();

    assert_eq!(route.stops.len(), 2);
    assert_eq!(route.stops[0].ticket_id, TicketId(1));
    assert_eq!(route.stops[1].ticket_id, TicketId(2));
}

#[tokio::test]
async fn scenario_s6_deadline_yields_partial_but_keeps_invariants() {
    let mut tickets = Vec::new();
    let centers = [(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (3.0, 3.0), (4.0, 4.0)];
    let mut id = 1;
    for &(clat, clon) in &centers {
        for offset in 0..20 {
            let jitter = offset as f64 * 0.0001;
            tickets.push(base_ticket(id, clat + jitter, clon + jitter));
            id += 1;
        }
    }

    let store = Arc::new(InMemoryTicketStore::new(tickets));
    let facade = EngineFacade::new(store, None, EngineConfig::default());

    let mut req = request();
    req.deadline_ms = Some(1);

    let route = facade.optimize(req).await.unwrap();

    assert_eq!(route.exit_code, crew_route_engine::ExitCode::Partial);
    // Invariant 1: every stop appears exactly once.
    let mut seen = std::collections::HashSet::new();
    for stop in &route.stops {
        assert!(seen.insert(stop.ticket_id));
    }
    // Invariant 3: within budget.
    assert!(route.total_time_minutes <= req_max_minutes());
}

fn req_max_minutes() -> f64 {
    request().max_minutes()
}

#[tokio::test]
async fn no_open_tickets_yields_no_candidates_exit_code() {
    let store = Arc::new(InMemoryTicketStore::new(Vec::new()));
    let facade = EngineFacade::new(store, None, EngineConfig::default());

    let route = facade.optimize(request()).await.unwrap();

    assert_eq!(route.exit_code, crew_route_engine::ExitCode::NoCandidates);
    assert!(route.stops.is_empty());
}
