//! Minimal ticket builder shared by unit tests across the crate. Not a
//! `#[cfg(test)]` module because it's also handy for doctests and the demo
//! binary; kept deliberately tiny.

use std::collections::BTreeSet;

use crate::domain::types::{
    CrewType, Priority, ProblemType, Ticket, TicketId, TicketStatus,
};

pub fn basic_ticket(id: i64, lat: f64, lon: f64) -> Ticket {
    Ticket {
        id: TicketId(id),
        lat,
        lon,
        problem_type: ProblemType::Pothole,
        priority: Priority::Medium,
        crew_type: CrewType::General,
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
