use crate::config::{priority_base, size_factor, type_bonus, UrgencyWeights};
use crate::domain::types::Ticket;

/// Computes the scalar urgency driving both ordering and cluster seeding.
/// Weights are fixed by contract; see `config::UrgencyWeights` for the table.
pub fn score(ticket: &Ticket, weights: &UrgencyWeights) -> f64 {
    let impact_bonus = weights.affects_traffic * bool_to_f64(ticket.affects_traffic)
        + weights.near_critical_location * bool_to_f64(ticket.near_critical_location)
        + weights.main_road * bool_to_f64(ticket.main_road)
        + weights.affects_commerce * bool_to_f64(ticket.affects_commerce);

    let complaint_bonus =
        ticket.complaints_count.min(weights.complaint_cap) as f64 * weights.complaint_unit;

    let base = priority_base(ticket.priority) + type_bonus(ticket.problem_type) + impact_bonus + complaint_bonus;

    base * size_factor(ticket.problem_size)
}

fn bool_to_f64(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{CrewType, Priority, ProblemSize, ProblemType, TicketId, TicketStatus};
    use std::collections::BTreeSet;

    fn base_ticket() -> Ticket {
        Ticket {
            id: TicketId(1),
            lat: 0.0,
            lon: 0.0,
            problem_type: ProblemType::Pothole,
            priority: Priority::Low,
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

    #[test]
    fn emergency_dominates_low_priority() {
        let weights = UrgencyWeights::default();
        let low = base_ticket();
        let mut emergency = base_ticket();
        emergency.priority = Priority::Emergency;

        assert!(score(&emergency, &weights) > score(&low, &weights) * 5.0);
    }

    #[test]
    fn pins_contract_constants() {
        let weights = UrgencyWeights::default();
        let mut t = base_ticket();
        t.priority = Priority::Emergency;
        t.problem_type = ProblemType::ExposedWiring;
        t.problem_size = Some(ProblemSize::Large);
        t.affects_traffic = true;
        t.near_critical_location = true;
        t.main_road = true;
        t.affects_commerce = true;
        t.complaints_count = 100;

        // (1000 + 200 + 150 + 100 + 80 + 60 + 250) * 1.5
        let expected = (1000.0 + 200.0 + 150.0 + 100.0 + 80.0 + 60.0 + 250.0) * 1.5;
        assert!((score(&t, &weights) - expected).abs() < 1e-9);
    }

    #[test]
    fn complaint_bonus_is_capped() {
        let weights = UrgencyWeights::default();
        let mut t = base_ticket();
        t.complaints_count = 1000;
        let mut t_capped = base_ticket();
        t_capped.complaints_count = 50;

        assert!((score(&t, &weights) - score(&t_capped, &weights)).abs() < 1e-9);
    }
}
