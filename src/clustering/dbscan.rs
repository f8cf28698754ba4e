//! Component D — DBSCAN over an equirectangular projection of (lat, lon),
//! scaled so Euclidean distance in the projection approximates km.

use crate::domain::types::{Cluster, Ticket};

struct Projected {
    x_km: f64,
    y_km: f64,
}

/// Projects onto a local tangent plane around the set's own centroid.
/// Accurate at city scales (<50 km); a wider span would need a proper local
/// projection (see SPEC_FULL.md design notes).
fn project(tickets: &[Ticket]) -> Vec<Projected> {
    let earth_radius_km = crate::config::constant::EARTH_RADIUS_KM;
    let n = tickets.len() as f64;
    let centroid_lat = tickets.iter().map(|t| t.lat).sum::<f64>() / n;
    let centroid_lon = tickets.iter().map(|t| t.lon).sum::<f64>() / n;
    let cos_lat = centroid_lat.to_radians().cos();

    tickets
        .iter()
        .map(|t| {
            let x_km = (t.lon - centroid_lon).to_radians() * earth_radius_km * cos_lat;
            let y_km = (t.lat - centroid_lat).to_radians() * earth_radius_km;
            Projected { x_km, y_km }
        })
        .collect()
}

fn planar_distance_km(a: &Projected, b: &Projected) -> f64 {
    let dx = a.x_km - b.x_km;
    let dy = a.y_km - b.y_km;
    (dx * dx + dy * dy).sqrt()
}

fn neighbors(points: &[Projected], i: usize, eps_km: f64) -> Vec<usize> {
    (0..points.len())
        .filter(|&j| j != i && planar_distance_km(&points[i], &points[j]) <= eps_km)
        .collect()
}

/// Partitions tickets of a single, already crew-type/status-filtered
/// population into geographic clusters. Noise points become singleton
/// clusters — they still must be visited. Empty input yields no clusters.
pub fn cluster(tickets: &[Ticket], eps_km: f64, min_samples: usize) -> Vec<Cluster> {
    if tickets.is_empty() {
        return vec![];
    }
    if tickets.len() == 1 {
        return vec![singleton(&tickets[0])];
    }

    let points = project(tickets);
    let n = tickets.len();
    let mut labels: Vec<Option<usize>> = vec![None; n]; // cluster id, filled in below
    let mut visited = vec![false; n];
    let mut next_cluster_id = 0usize;
    let mut noise = vec![false; n];

    for i in 0..n {
        if visited[i] {
            continue;
        }
        visited[i] = true;

        let mut seed_set = neighbors(&points, i, eps_km);
        // `min_samples` counts the point itself plus its neighbors.
        if seed_set.len() + 1 < min_samples {
            noise[i] = true;
            continue;
        }

        let cluster_id = next_cluster_id;
        next_cluster_id += 1;
        labels[i] = Some(cluster_id);

        let mut queue = seed_set.clone();
        seed_set.clear();
        let mut processed = vec![false; n];
        processed[i] = true;
        for &q in &queue {
            processed[q] = true;
        }

        let mut idx = 0;
        while idx < queue.len() {
            let j = queue[idx];
            idx += 1;

            if noise[j] {
                noise[j] = false;
            }
            if labels[j].is_none() {
                labels[j] = Some(cluster_id);
            }
            if visited[j] {
                continue;
            }
            visited[j] = true;

            let j_neighbors = neighbors(&points, j, eps_km);
            if j_neighbors.len() + 1 >= min_samples {
                for &k in &j_neighbors {
                    if !processed[k] {
                        processed[k] = true;
                        queue.push(k);
                    }
                }
            }
        }
    }

    let mut clusters: Vec<Vec<usize>> = vec![Vec::new(); next_cluster_id];
    for i in 0..n {
        match labels[i] {
            Some(cid) => clusters[cid].push(i),
            None => {
                // Unlabeled (pure noise, never adopted by a core point's
                // neighborhood) becomes its own singleton cluster.
            }
        }
    }

    let mut result: Vec<Cluster> = clusters
        .into_iter()
        .filter(|members| !members.is_empty())
        .map(|members| build_cluster(tickets, &members))
        .collect();

    for i in 0..n {
        if labels[i].is_none() {
            result.push(singleton(&tickets[i]));
        }
    }

    result
}

fn singleton(ticket: &Ticket) -> Cluster {
    Cluster {
        ticket_ids: vec![ticket.id],
        centroid_lat: ticket.lat,
        centroid_lon: ticket.lon,
        aggregate_priority: ticket.priority,
        total_service_minutes: ticket.estimated_service_minutes,
    }
}

fn build_cluster(tickets: &[Ticket], member_indices: &[usize]) -> Cluster {
    let n = member_indices.len() as f64;
    let centroid_lat = member_indices.iter().map(|&i| tickets[i].lat).sum::<f64>() / n;
    let centroid_lon = member_indices.iter().map(|&i| tickets[i].lon).sum::<f64>() / n;
    let aggregate_priority = member_indices
        .iter()
        .map(|&i| tickets[i].priority)
        .min()
        .expect("cluster is never built from an empty member list");
    let total_service_minutes = member_indices
        .iter()
        .map(|&i| tickets[i].estimated_service_minutes)
        .sum();

    Cluster {
        ticket_ids: member_indices.iter().map(|&i| tickets[i].id).collect(),
        centroid_lat,
        centroid_lon,
        aggregate_priority,
        total_service_minutes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test_support::basic_ticket;

    #[test]
    fn empty_input_yields_no_clusters() {
        assert!(cluster(&[], 0.5, 2).is_empty());
    }

    #[test]
    fn single_input_yields_one_singleton_cluster() {
        let t = basic_ticket(1, 0.0, 0.0);
        let clusters = cluster(&[t], 0.5, 2);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].ticket_ids.len(), 1);
    }

    #[test]
    fn scenario_s2_two_dense_groups_far_apart() {
        let tickets = vec![
            basic_ticket(1, 0.0, 0.0),
            basic_ticket(2, 0.0, 0.001),
            basic_ticket(3, 0.0, 0.002),
            basic_ticket(4, 10.0, 10.0),
            basic_ticket(5, 10.0, 10.001),
            basic_ticket(6, 10.0, 10.002),
        ];
        let clusters = cluster(&tickets, 0.5, 2);
        assert_eq!(clusters.len(), 2);
        let total_members: usize = clusters.iter().map(|c| c.ticket_ids.len()).sum();
        assert_eq!(total_members, 6);
    }

    #[test]
    fn far_apart_points_become_singletons() {
        let tickets = vec![basic_ticket(1, 0.0, 0.0), basic_ticket(2, 50.0, 50.0)];
        let clusters = cluster(&tickets, 0.5, 2);
        assert_eq!(clusters.len(), 2);
        assert!(clusters.iter().all(|c| c.ticket_ids.len() == 1));
    }
}
