//! Component F — inter-cluster stitching: minimum spanning tree over cluster
//! centroids (Prim's), depth-first preorder traversal, and tour
//! concatenation with entry rotation at each cluster boundary.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::distance::{DistanceMatrix, DistanceModel, HaversineModel};
use crate::domain::types::{ClusterTour, Priority, Ticket, TicketId};

/// One MST edge, directed parent -> child, with its weight in minutes.
struct TreeEdge {
    child: usize,
    weight_minutes: f64,
}

/// Builds the MST over cluster centroids and returns, for each node, its
/// tree children with edge weights (an adjacency list rooted implicitly).
fn build_mst(centroids: &[(f64, f64)], model: &HaversineModel) -> Vec<Vec<TreeEdge>> {
    let n = centroids.len();
    let mut adjacency: Vec<Vec<TreeEdge>> = (0..n).map(|_| Vec::new()).collect();
    if n <= 1 {
        return adjacency;
    }

    let mut in_tree = vec![false; n];
    let mut best_weight = vec![f64::INFINITY; n];
    let mut best_parent = vec![usize::MAX; n];
    best_weight[0] = 0.0;

    // Min-heap keyed on (weight, node); `Reverse` turns the max-heap
    // `BinaryHeap` into a min-heap, same trick as the tabu search's
    // excess-ordering heaps. Weights are always finite and non-negative,
    // so bit-pattern ordering matches numeric ordering.
    let mut heap: BinaryHeap<Reverse<(u64, usize)>> = BinaryHeap::new();
    heap.push(Reverse((0.0f64.to_bits(), 0)));

    while let Some(Reverse((_, u))) = heap.pop() {
        if in_tree[u] {
            continue;
        }
        in_tree[u] = true;

        for v in 0..n {
            if in_tree[v] || v == u {
                continue;
            }
            let (_, minutes) = model.compute(centroids[u], centroids[v]);
            if minutes < best_weight[v] {
                best_weight[v] = minutes;
                best_parent[v] = u;
                heap.push(Reverse((minutes.to_bits(), v)));
            }
        }
    }

    for v in 0..n {
        if best_parent[v] != usize::MAX {
            adjacency[best_parent[v]].push(TreeEdge {
                child: v,
                weight_minutes: best_weight[v],
            });
        }
    }
    adjacency
}

/// Depth-first preorder of the MST rooted at `root`. At each node, children
/// are visited in ascending edge weight, ties broken by descending
/// aggregate urgency of the child cluster.
fn preorder(
    adjacency: &mut [Vec<TreeEdge>],
    root: usize,
    aggregate_urgency: &[f64],
) -> Vec<usize> {
    for children in adjacency.iter_mut() {
        children.sort_by(|a, b| {
            a.weight_minutes
                .partial_cmp(&b.weight_minutes)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    aggregate_urgency[b.child]
                        .partial_cmp(&aggregate_urgency[a.child])
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
        });
    }

    let mut order = Vec::with_capacity(adjacency.len());
    let mut stack = vec![root];
    let mut visited = vec![false; adjacency.len()];
    while let Some(node) = stack.pop() {
        if visited[node] {
            continue;
        }
        visited[node] = true;
        order.push(node);
        for edge in adjacency[node].iter().rev() {
            if !visited[edge.child] {
                stack.push(edge.child);
            }
        }
    }
    order
}

/// Rotates `tour.order` so that its new first element minimizes travel time
/// from `exit`, without placing any ticket before a dependency that is also
/// in the tour. Falls back to the tour's original order if no valid
/// rotation point exists.
fn rotate_entry(
    tour: &ClusterTour,
    exit: TicketId,
    tickets_by_id: &HashMap<TicketId, &Ticket>,
    matrix: &DistanceMatrix,
) -> Vec<TicketId> {
    let n = tour.order.len();
    let members: std::collections::HashSet<TicketId> = tour.order.iter().copied().collect();

    let mut candidates: Vec<usize> = (0..n)
        .filter(|&i| {
            let candidate = tour.order[i];
            let ticket = tickets_by_id[&candidate];
            ticket
                .dependencies
                .iter()
                .filter(|dep| members.contains(dep))
                .all(|dep| {
                    let dep_pos = tour.order.iter().position(|id| id == dep).unwrap();
                    dep_pos < i
                })
        })
        .collect();

    candidates.sort_by(|&a, &b| {
        let ta = matrix.travel_minutes(exit, tour.order[a]);
        let tb = matrix.travel_minutes(exit, tour.order[b]);
        ta.partial_cmp(&tb).unwrap_or(std::cmp::Ordering::Equal)
    });

    match candidates.first() {
        Some(&best) => {
            let mut rotated = Vec::with_capacity(n);
            rotated.extend_from_slice(&tour.order[best..]);
            rotated.extend_from_slice(&tour.order[..best]);
            rotated
        }
        None => tour.order.clone(),
    }
}

/// Stitches solved cluster tours into one sequence: MST over centroids,
/// depth-first preorder rooted at the cluster holding the globally most
/// urgent ticket, entry rotation at every boundary.
pub fn stitch(
    tours: &[ClusterTour],
    tickets_by_id: &HashMap<TicketId, &Ticket>,
    urgency_of: &HashMap<TicketId, f64>,
    matrix: &DistanceMatrix,
    earth_radius_km: f64,
    avg_speed_kmh: f64,
) -> Vec<TicketId> {
    if tours.is_empty() {
        return Vec::new();
    }
    if tours.len() == 1 {
        return tours[0].order.clone();
    }

    let centroids: Vec<(f64, f64)> = tours
        .iter()
        .map(|t| (t.cluster.centroid_lat, t.cluster.centroid_lon))
        .collect();
    let aggregate_urgency: Vec<f64> = tours
        .iter()
        .map(|t| {
            t.order
                .iter()
                .map(|id| urgency_of.get(id).copied().unwrap_or(0.0))
                .fold(f64::MIN, f64::max)
        })
        .collect();

    let root = tours
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| {
            let ua = a
                .order
                .iter()
                .map(|id| urgency_of.get(id).copied().unwrap_or(0.0))
                .fold(f64::MIN, f64::max);
            let ub = b
                .order
                .iter()
                .map(|id| urgency_of.get(id).copied().unwrap_or(0.0))
                .fold(f64::MIN, f64::max);
            ua.partial_cmp(&ub).unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap_or(0);

    let model = HaversineModel {
        earth_radius_km,
        avg_speed_kmh,
    };
    let mut adjacency = build_mst(&centroids, &model);
    let visit_order = preorder(&mut adjacency, root, &aggregate_urgency);

    let mut sequence = Vec::new();
    let mut prev_exit: Option<TicketId> = None;
    for cluster_index in visit_order {
        let tour = &tours[cluster_index];
        let order = match prev_exit {
            None => tour.order.clone(),
            Some(exit) => rotate_entry(tour, exit, tickets_by_id, matrix),
        };
        prev_exit = order.last().copied();
        sequence.extend(order);
    }
    sequence
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Cluster;
    use crate::fixtures::test_support::basic_ticket;
    use std::collections::BTreeSet;

    fn matrix_for(tickets: &[Ticket]) -> DistanceMatrix {
        let model = HaversineModel {
            earth_radius_km: crate::config::constant::EARTH_RADIUS_KM,
            avg_speed_kmh: 30.0,
        };
        let ids: Vec<TicketId> = tickets.iter().map(|t| t.id).collect();
        let n = tickets.len();
        let mut data = vec![vec![(0.0, 0.0); n]; n];
        for i in 0..n {
            for j in 0..n {
                data[i][j] =
                    model.compute((tickets[i].lat, tickets[i].lon), (tickets[j].lat, tickets[j].lon));
            }
        }
        DistanceMatrix::new(&ids, data)
    }

    #[test]
    fn stitches_two_clusters_and_covers_every_ticket() {
        let tickets = vec![
            basic_ticket(1, 0.0, 0.0),
            basic_ticket(2, 0.0, 0.001),
            basic_ticket(3, 5.0, 5.0),
            basic_ticket(4, 5.0, 5.001),
        ];
        let matrix = matrix_for(&tickets);
        let tickets_by_id: HashMap<TicketId, &Ticket> =
            tickets.iter().map(|t| (t.id, t)).collect();
        let mut urgency_of = HashMap::new();
        urgency_of.insert(TicketId(1), 900.0);
        urgency_of.insert(TicketId(2), 10.0);
        urgency_of.insert(TicketId(3), 5.0);
        urgency_of.insert(TicketId(4), 5.0);

        let tours = vec![
            ClusterTour {
                cluster: Cluster {
                    ticket_ids: vec![TicketId(1), TicketId(2)],
                    centroid_lat: 0.0,
                    centroid_lon: 0.0005,
                    aggregate_priority: Priority::Emergency,
                    total_service_minutes: 20,
                },
                order: vec![TicketId(1), TicketId(2)],
            },
            ClusterTour {
                cluster: Cluster {
                    ticket_ids: vec![TicketId(3), TicketId(4)],
                    centroid_lat: 5.0,
                    centroid_lon: 5.0005,
                    aggregate_priority: Priority::Low,
                    total_service_minutes: 20,
                },
                order: vec![TicketId(3), TicketId(4)],
            },
        ];

        let sequence = stitch(&tours, &tickets_by_id, &urgency_of, &matrix, 6371.0, 30.0);
        assert_eq!(sequence.len(), 4);
        // The cluster holding the globally most urgent ticket is visited first.
        assert!(sequence[0] == TicketId(1) || sequence[0] == TicketId(2));
    }

    #[test]
    fn rotation_respects_dependencies() {
        let mut t3 = basic_ticket(3, 5.0, 5.0);
        t3.dependencies = BTreeSet::from([TicketId(4)]);
        let tickets = vec![basic_ticket(4, 5.0, 5.001), t3];
        let tickets_by_id: HashMap<TicketId, &Ticket> =
            tickets.iter().map(|t| (t.id, t)).collect();
        let matrix = matrix_for(&tickets);

        let tour = ClusterTour {
            cluster: Cluster {
                ticket_ids: vec![TicketId(4), TicketId(3)],
                centroid_lat: 5.0,
                centroid_lon: 5.0005,
                aggregate_priority: Priority::Low,
                total_service_minutes: 20,
            },
            order: vec![TicketId(4), TicketId(3)],
        };

        // Rotating to start at ticket 3 would place it before its
        // dependency (ticket 4); the rotation must reject that and keep
        // the original order.
        let rotated = rotate_entry(&tour, TicketId(3), &tickets_by_id, &matrix);
        assert_eq!(rotated, vec![TicketId(4), TicketId(3)]);
    }
}
