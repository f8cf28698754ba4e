//! Component G — feasibility validation: dependency-cycle resolution,
//! dependency repair (reorder before drop), a forward budget/point-cap
//! walk, and a bounded emergency-swap safeguard.

use std::collections::{HashMap, HashSet};

use crate::distance::DistanceMatrix;
use crate::domain::types::{DropReason, DroppedTicket, PlannedStop, Priority, Ticket, TicketId};

pub struct ValidationOutcome {
    pub stops: Vec<PlannedStop>,
    pub dropped: Vec<DroppedTicket>,
    pub total_distance_km: f64,
    pub total_time_minutes: f64,
}

/// Detects dependency cycles among `sequence` (restricted to dependencies
/// that are themselves present in `sequence`) via DFS, and drops the
/// largest ticket id in each cycle found, repeating until none remain.
fn resolve_cycles(
    sequence: &mut Vec<TicketId>,
    tickets_by_id: &HashMap<TicketId, &Ticket>,
    dropped: &mut Vec<DroppedTicket>,
) {
    loop {
        let present: HashSet<TicketId> = sequence.iter().copied().collect();
        if let Some(cycle) = find_cycle(sequence, tickets_by_id, &present) {
            let worst = *cycle.iter().max_by_key(|id| id.0).unwrap();
            sequence.retain(|id| *id != worst);
            dropped.push(DroppedTicket {
                ticket_id: worst,
                reason: DropReason::DependencyCycle,
            });
        } else {
            break;
        }
    }
}

/// Returns the member ids of one cycle in the dependency graph, if any.
fn find_cycle(
    sequence: &[TicketId],
    tickets_by_id: &HashMap<TicketId, &Ticket>,
    present: &HashSet<TicketId>,
) -> Option<Vec<TicketId>> {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Unvisited,
        InProgress,
        Done,
    }

    let mut state: HashMap<TicketId, State> = sequence.iter().map(|id| (*id, State::Unvisited)).collect();
    let mut stack: Vec<TicketId> = Vec::new();

    fn visit(
        node: TicketId,
        tickets_by_id: &HashMap<TicketId, &Ticket>,
        present: &HashSet<TicketId>,
        state: &mut HashMap<TicketId, State>,
        stack: &mut Vec<TicketId>,
    ) -> Option<Vec<TicketId>> {
        state.insert(node, State::InProgress);
        stack.push(node);

        for dep in tickets_by_id[&node].dependencies.iter().filter(|d| present.contains(d)) {
            match state.get(dep).copied().unwrap_or(State::Unvisited) {
                State::InProgress => {
                    let start = stack.iter().position(|id| id == dep).unwrap();
                    return Some(stack[start..].to_vec());
                }
                State::Unvisited => {
                    if let Some(cycle) = visit(*dep, tickets_by_id, present, state, stack) {
                        return Some(cycle);
                    }
                }
                State::Done => {}
            }
        }

        stack.pop();
        state.insert(node, State::Done);
        None
    }

    for node in sequence {
        if state.get(node).copied().unwrap_or(State::Unvisited) == State::Unvisited {
            if let Some(cycle) = visit(*node, tickets_by_id, present, &mut state, &mut stack) {
                return Some(cycle);
            }
        }
    }
    None
}

/// Moves any ticket that precedes one of its (in-sequence) dependencies to
/// the earliest position after all of them. Drops a ticket whose repair
/// would require moving it past the end of the sequence (only possible
/// once cycles have already been resolved, so this should rarely fire).
fn repair_dependency_order(
    sequence: &mut Vec<TicketId>,
    tickets_by_id: &HashMap<TicketId, &Ticket>,
    dropped: &mut Vec<DroppedTicket>,
) {
    let mut i = 0;
    while i < sequence.len() {
        let ticket = tickets_by_id[&sequence[i]];
        let present: HashSet<TicketId> = sequence.iter().copied().collect();
        let deps_in_sequence: Vec<TicketId> = ticket
            .dependencies
            .iter()
            .filter(|d| present.contains(d))
            .copied()
            .collect();

        let latest_dep_pos = deps_in_sequence
            .iter()
            .filter_map(|dep| sequence.iter().position(|id| id == dep))
            .max();

        match latest_dep_pos {
            Some(dep_pos) if dep_pos > i => {
                let moving = sequence.remove(i);
                let insert_at = dep_pos; // position shifts left by one after removal
                sequence.insert(insert_at, moving);
                // Re-check the ticket now sitting at `i`.
            }
            _ => i += 1,
        }
    }

    let _ = dropped; // repair never drops once cycles are already resolved
}

/// Forward walk accumulating `travel(prev, current) + service(current)`,
/// stopping before exceeding `max_minutes` or `max_points`.
fn walk_budget(
    sequence: &[TicketId],
    tickets_by_id: &HashMap<TicketId, &Ticket>,
    matrix: &DistanceMatrix,
    max_minutes: f64,
    max_points: usize,
) -> (Vec<PlannedStop>, Vec<TicketId>, f64, f64) {
    let mut accepted = Vec::new();
    let mut skipped = Vec::new();
    let mut elapsed = 0.0;
    let mut distance_km = 0.0;
    let mut prev: Option<TicketId> = None;

    for &id in sequence {
        if accepted.len() >= max_points {
            skipped.push(id);
            continue;
        }
        let travel_minutes = prev.map(|p| matrix.travel_minutes(p, id)).unwrap_or(0.0);
        let service_minutes = tickets_by_id[&id].estimated_service_minutes as f64;
        let candidate_elapsed = elapsed + travel_minutes + service_minutes;

        if candidate_elapsed > max_minutes {
            skipped.push(id);
            continue;
        }

        elapsed = candidate_elapsed;
        if let Some(p) = prev {
            distance_km += matrix.km(p, id);
        }
        accepted.push(PlannedStop {
            ticket_id: id,
            arrival_offset_minutes: elapsed - service_minutes,
        });
        prev = Some(id);
    }

    (accepted, skipped, distance_km, elapsed)
}

/// If an emergency ticket was skipped by the walk but a non-emergency
/// ticket was kept, swap them one-for-one as long as the swap keeps the
/// run within budget and respects dependencies. Bounded by
/// `max_emergency_swaps`.
fn emergency_safeguard(
    accepted_ids: &mut Vec<TicketId>,
    skipped_ids: &mut Vec<TicketId>,
    tickets_by_id: &HashMap<TicketId, &Ticket>,
    matrix: &DistanceMatrix,
    max_minutes: f64,
    max_emergency_swaps: usize,
) -> usize {
    let mut swaps_done = 0;

    while swaps_done < max_emergency_swaps {
        let emergency_skipped_pos = skipped_ids
            .iter()
            .position(|id| tickets_by_id[id].priority == Priority::Emergency);
        let Some(skip_pos) = emergency_skipped_pos else {
            break;
        };

        let weakest_kept_pos = accepted_ids
            .iter()
            .enumerate()
            .filter(|(_, id)| tickets_by_id[id].priority != Priority::Emergency)
            .max_by_key(|(_, id)| tickets_by_id[id].priority)
            .map(|(i, _)| i);
        let Some(kept_pos) = weakest_kept_pos else {
            break;
        };

        let mut candidate = accepted_ids.clone();
        candidate[kept_pos] = skipped_ids[skip_pos];

        if violates_dependency_order(&candidate, tickets_by_id) {
            break;
        }
        if tour_time(&candidate, tickets_by_id, matrix) > max_minutes {
            break;
        }

        let displaced = accepted_ids[kept_pos];
        let promoted = skipped_ids.remove(skip_pos);
        accepted_ids[kept_pos] = promoted;
        skipped_ids.push(displaced);
        swaps_done += 1;
    }

    swaps_done
}

fn violates_dependency_order(sequence: &[TicketId], tickets_by_id: &HashMap<TicketId, &Ticket>) -> bool {
    let position: HashMap<TicketId, usize> = sequence.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    for (i, id) in sequence.iter().enumerate() {
        for dep in &tickets_by_id[id].dependencies {
            if let Some(&dep_pos) = position.get(dep) {
                if dep_pos > i {
                    return true;
                }
            }
        }
    }
    false
}

fn tour_time(sequence: &[TicketId], tickets_by_id: &HashMap<TicketId, &Ticket>, matrix: &DistanceMatrix) -> f64 {
    let mut elapsed = 0.0;
    let mut prev: Option<TicketId> = None;
    for &id in sequence {
        if let Some(p) = prev {
            elapsed += matrix.travel_minutes(p, id);
        }
        elapsed += tickets_by_id[&id].estimated_service_minutes as f64;
        prev = Some(id);
    }
    elapsed
}

/// Runs the full §4.G pipeline over a stitched sequence.
pub fn validate(
    sequence: Vec<TicketId>,
    tickets_by_id: &HashMap<TicketId, &Ticket>,
    matrix: &DistanceMatrix,
    max_minutes: f64,
    max_points: usize,
    max_emergency_swaps: usize,
) -> ValidationOutcome {
    let mut sequence = sequence;
    let mut dropped = Vec::new();

    resolve_cycles(&mut sequence, tickets_by_id, &mut dropped);
    repair_dependency_order(&mut sequence, tickets_by_id, &mut dropped);

    let (stops, skipped, _, _) = walk_budget(&sequence, tickets_by_id, matrix, max_minutes, max_points);

    let mut accepted_ids: Vec<TicketId> = stops.iter().map(|s| s.ticket_id).collect();
    let mut skipped_ids = skipped;
    emergency_safeguard(
        &mut accepted_ids,
        &mut skipped_ids,
        tickets_by_id,
        matrix,
        max_minutes,
        max_emergency_swaps,
    );

    for id in &skipped_ids {
        dropped.push(DroppedTicket {
            ticket_id: *id,
            reason: DropReason::Budget,
        });
    }

    let mut elapsed = 0.0;
    let mut distance_km = 0.0;
    let mut prev: Option<TicketId> = None;
    let mut final_stops = Vec::with_capacity(accepted_ids.len());
    for id in accepted_ids {
        let travel_minutes = prev.map(|p| matrix.travel_minutes(p, id)).unwrap_or(0.0);
        let service_minutes = tickets_by_id[&id].estimated_service_minutes as f64;
        elapsed += travel_minutes + service_minutes;
        if let Some(p) = prev {
            distance_km += matrix.km(p, id);
        }
        final_stops.push(PlannedStop {
            ticket_id: id,
            arrival_offset_minutes: elapsed - service_minutes,
        });
        prev = Some(id);
    }

    // The crew's vehicle returns to its starting point at shift's end even
    // though the shift clock (and the budget it's checked against) stops at
    // the last service call; `total_distance_km` reports that full
    // round-trip mileage while `total_time_minutes` stays "service + travel"
    // for the working day only.
    if let (Some(first), Some(last)) = (final_stops.first(), final_stops.last()) {
        if first.ticket_id != last.ticket_id {
            distance_km += matrix.km(last.ticket_id, first.ticket_id);
        }
    }

    ValidationOutcome {
        stops: final_stops,
        dropped,
        total_distance_km: distance_km,
        total_time_minutes: elapsed,
    }
}
