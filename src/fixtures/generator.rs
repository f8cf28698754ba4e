//! Component N — synthetic ticket generation for demos, load testing, and
//! property-style tests. Mirrors the shape of `SqliteTicketStore`'s rows
//! closely enough to seed it directly.

use std::collections::BTreeSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::domain::types::{
    CrewType, Priority, ProblemSize, ProblemType, Ticket, TicketId, TicketStatus,
};

const PROBLEM_TYPES: [ProblemType; 8] = [
    ProblemType::Pothole,
    ProblemType::WaterLeak,
    ProblemType::SewerLeak,
    ProblemType::DarkLamp,
    ProblemType::ExposedWiring,
    ProblemType::CloggedDrain,
    ProblemType::BrokenSidewalk,
    ProblemType::FaultyTrafficLight,
];

const PRIORITIES: [Priority; 5] = [
    Priority::Emergency,
    Priority::Urgent,
    Priority::High,
    Priority::Medium,
    Priority::Low,
];

const PROBLEM_SIZES: [ProblemSize; 3] = [ProblemSize::Small, ProblemSize::Medium, ProblemSize::Large];

pub struct GeneratorConfig {
    pub count: usize,
    pub crew_type: CrewType,
    pub center_lat: f64,
    pub center_lon: f64,
    /// Half-width of the random scatter, in degrees.
    pub spread_degrees: f64,
    pub seed: u64,
    /// Probability (0.0-1.0) that a ticket depends on an earlier one of the
    /// same crew type.
    pub dependency_rate: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            count: 50,
            crew_type: CrewType::General,
            center_lat: 0.0,
            center_lon: 0.0,
            spread_degrees: 0.05,
            seed: 42,
            dependency_rate: 0.0,
        }
    }
}

/// Generates a configurable population of synthetic, internally-consistent
/// tickets: coordinates scattered around a center point, tags drawn from the
/// enums, and (optionally) dependency edges within the same crew type.
pub fn generate_tickets(cfg: &GeneratorConfig) -> Vec<Ticket> {
    let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed);
    let mut tickets = Vec::with_capacity(cfg.count);

    for i in 0..cfg.count {
        let id = TicketId(i as i64 + 1);
        let lat = cfg.center_lat + rng.gen_range(-cfg.spread_degrees..=cfg.spread_degrees);
        let lon = cfg.center_lon + rng.gen_range(-cfg.spread_degrees..=cfg.spread_degrees);
        let problem_type = PROBLEM_TYPES[rng.gen_range(0..PROBLEM_TYPES.len())];
        let priority = PRIORITIES[rng.gen_range(0..PRIORITIES.len())];
        let problem_size = if rng.gen_bool(0.8) {
            Some(PROBLEM_SIZES[rng.gen_range(0..PROBLEM_SIZES.len())])
        } else {
            None
        };

        let mut dependencies = BTreeSet::new();
        if i > 0 && rng.gen_bool(cfg.dependency_rate) {
            let dep_index = rng.gen_range(0..i);
            dependencies.insert(TicketId(dep_index as i64 + 1));
        }

        tickets.push(Ticket {
            id,
            lat,
            lon,
            problem_type,
            priority,
            crew_type: cfg.crew_type,
            problem_size,
            estimated_service_minutes: rng.gen_range(10..=60),
            affects_traffic: rng.gen_bool(0.3),
            affects_commerce: rng.gen_bool(0.2),
            near_critical_location: rng.gen_bool(0.1),
            main_road: rng.gen_bool(0.25),
            complaints_count: rng.gen_range(0..=20),
            requires_road_block: rng.gen_bool(0.05),
            dependencies,
            status: TicketStatus::Open,
            urgency_score: None,
            materials: None,
            photos: None,
            metadata: None,
        });
    }

    tickets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_requested_count() {
        let cfg = GeneratorConfig {
            count: 25,
            ..GeneratorConfig::default()
        };
        assert_eq!(generate_tickets(&cfg).len(), 25);
    }

    #[test]
    fn is_deterministic_for_a_fixed_seed() {
        let cfg = GeneratorConfig::default();
        let a = generate_tickets(&cfg);
        let b = generate_tickets(&cfg);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.id, y.id);
            assert_eq!(x.lat, y.lat);
            assert_eq!(x.lon, y.lon);
        }
    }

    #[test]
    fn dependencies_only_point_to_earlier_tickets() {
        let cfg = GeneratorConfig {
            count: 40,
            dependency_rate: 0.5,
            ..GeneratorConfig::default()
        };
        let tickets = generate_tickets(&cfg);
        for t in &tickets {
            for dep in &t.dependencies {
                assert!(dep.0 < t.id.0);
            }
        }
    }
}
