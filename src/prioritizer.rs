//! Component C — totally orders scored tickets with deterministic tie-breaks.

use crate::domain::types::Ticket;

/// A ticket paired with its freshly computed urgency, ready for ordering.
#[derive(Debug, Clone)]
pub struct ScoredTicket {
    pub ticket: Ticket,
    pub urgency: f64,
}

/// Orders tickets by: descending urgency, then priority rank (emergency
/// first), then descending complaint count, then ascending id. Stable and
/// deterministic given identical inputs.
pub fn order(mut scored: Vec<ScoredTicket>) -> Vec<ScoredTicket> {
    scored.sort_by(|a, b| {
        b.urgency
            .partial_cmp(&a.urgency)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.ticket.priority.cmp(&b.ticket.priority))
            .then_with(|| b.ticket.complaints_count.cmp(&a.ticket.complaints_count))
            .then_with(|| a.ticket.id.cmp(&b.ticket.id))
    });
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UrgencyWeights;
    use crate::domain::types::{CrewType, Priority, ProblemType, TicketId, TicketStatus};
    use crate::scoring;
    use std::collections::BTreeSet;

    fn ticket(id: i64, priority: Priority) -> ScoredTicket {
        let ticket = crate::domain::types::Ticket {
            id: TicketId(id),
            lat: 0.0,
            lon: 0.0,
            problem_type: ProblemType::Pothole,
            priority,
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
        };
        let urgency = scoring::score(&ticket, &UrgencyWeights::default());
        ScoredTicket { ticket, urgency }
    }

    #[test]
    fn orders_by_urgency_descending() {
        let input = vec![
            ticket(1, Priority::Low),
            ticket(2, Priority::Emergency),
            ticket(3, Priority::Medium),
        ];
        let ordered = order(input);
        assert_eq!(ordered[0].ticket.id, TicketId(2));
        assert_eq!(ordered[2].ticket.id, TicketId(1));
    }

    #[test]
    fn ties_break_on_id_ascending() {
        let a = ticket(5, Priority::Low);
        let b = ticket(2, Priority::Low);
        let ordered = order(vec![a, b]);
        assert_eq!(ordered[0].ticket.id, TicketId(2));
    }
}
