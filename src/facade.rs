//! Component H — the engine facade: the single public entry point that
//! wires scoring, clustering, solving, stitching, and validation together.
//! Stateless between calls; every buffer (including the solver's scoped
//! thread pool) is local to one `optimize` invocation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use crate::clustering;
use crate::config::EngineConfig;
use crate::distance::{DistanceCacheStore, DistanceModel, DistanceOracle, HaversineModel};
use crate::domain::error::RouteEngineError;
use crate::domain::types::{
    Cluster, ClusterTour, ExitCode, OptimizeRequest, Priority, Route, RouteStats, Strategy, Ticket,
    TicketId, TicketStatus,
};
use crate::prioritizer::{self, ScoredTicket};
use crate::scoring;
use crate::solver::{self, SeedStrategy};
use crate::stitcher;
use crate::validator;

/// The stateless orchestrator. Holds nothing but shared, read-only handles
/// to the store adapters; all per-run state lives on the stack of
/// `optimize`.
pub struct EngineFacade {
    pub ticket_store: Arc<dyn crate::store::TicketStore>,
    pub distance_cache: Option<Arc<dyn DistanceCacheStore>>,
    pub config: EngineConfig,
}

impl EngineFacade {
    pub fn new(
        ticket_store: Arc<dyn crate::store::TicketStore>,
        distance_cache: Option<Arc<dyn DistanceCacheStore>>,
        config: EngineConfig,
    ) -> Self {
        EngineFacade {
            ticket_store,
            distance_cache,
            config,
        }
    }

    #[instrument(skip(self, request), fields(crew_type = ?request.crew_type, strategy = ?request.strategy))]
    pub async fn optimize(&self, request: OptimizeRequest) -> Result<Route, RouteEngineError> {
        if request.max_hours <= 0.0 {
            return Err(RouteEngineError::InvalidBudget(request.max_hours));
        }

        let deadline = request
            .deadline_ms
            .map(|ms| Instant::now() + Duration::from_millis(ms));

        let candidates = self
            .ticket_store
            .list_open_tickets(request.crew_type)
            .await
            .map_err(|e| RouteEngineError::StoreUnavailable(e.to_string()))?;

        let (valid, malformed_count) = filter_malformed(candidates);
        if malformed_count > 0 {
            warn!(malformed_count, "dropped malformed tickets before scoring");
        }

        if valid.is_empty() {
            info!("no open candidates for this crew type");
            return Ok(empty_route(&request, ExitCode::NoCandidates));
        }

        let scored = score_tickets(&valid, &self.config);
        let ordered = prioritizer::order(scored);
        let tickets: Vec<Ticket> = ordered.iter().map(|s| s.ticket.clone()).collect();
        let urgency_of: HashMap<TicketId, f64> =
            ordered.iter().map(|s| (s.ticket.id, s.urgency)).collect();

        let oracle = DistanceOracle::with_backing_store_opt(
            HaversineModel {
                earth_radius_km: self.config.earth_radius_km,
                avg_speed_kmh: self.config.avg_speed_kmh,
            },
            self.distance_cache.clone(),
        );
        let matrix = crate::distance::DistanceMatrix::new(
            &tickets.iter().map(|t| t.id).collect::<Vec<_>>(),
            oracle.matrix(&tickets).await,
        );
        let tickets_by_id: HashMap<TicketId, &Ticket> = tickets.iter().map(|t| (t.id, t)).collect();

        let clusters = self.build_clusters(&request.strategy, &tickets);
        info!(cluster_count = clusters.len(), "clustering complete");

        let deadline_hit_before_solving = deadline.map(|d| Instant::now() >= d).unwrap_or(false);
        let seed_strategy = match request.strategy {
            Strategy::Geographic => SeedStrategy::ClosestToCentroid,
            Strategy::UrgencyFirst | Strategy::Mixed => SeedStrategy::MaxUrgency,
        };

        let tours: Vec<ClusterTour> = solver::solve_clusters(
            &clusters,
            &tickets_by_id,
            &urgency_of,
            &matrix,
            seed_strategy,
            &self.config,
            deadline,
        );

        let deadline_hit_after_solving = deadline.map(|d| Instant::now() >= d).unwrap_or(false);
        let partial = deadline_hit_before_solving || deadline_hit_after_solving;

        // A deadline hit up through the end of solving degrades gracefully
        // to `partial` per §5; stitching itself is cheap enough (one pass
        // over already-built tours) that we let it finish rather than
        // aborting with `DeadlineExceeded` for a near-complete run.
        let sequence = stitcher::stitch(
            &tours,
            &tickets_by_id,
            &urgency_of,
            &matrix,
            self.config.earth_radius_km,
            self.config.avg_speed_kmh,
        );

        let outcome = validator::validate(
            sequence,
            &tickets_by_id,
            &matrix,
            request.max_minutes(),
            request.max_points,
            self.config.max_emergency_swaps,
        );

        let stats = RouteStats {
            clusters_served: clusters_served(&outcome.stops, &clusters),
            emergencies_covered: outcome
                .stops
                .iter()
                .filter(|s| tickets_by_id[&s.ticket_id].priority == Priority::Emergency)
                .count(),
            skipped_due_to_budget: outcome
                .dropped
                .iter()
                .filter(|d| d.reason == crate::domain::types::DropReason::Budget)
                .count(),
        };

        let exit_code = if partial { ExitCode::Partial } else { ExitCode::Ok };

        let route = Route {
            crew_type: request.crew_type,
            date: request.date,
            stops: outcome.stops,
            total_distance_km: outcome.total_distance_km,
            total_time_minutes: outcome.total_time_minutes,
            stats,
            exit_code,
            dropped: outcome.dropped,
        };

        if let Err(e) = self.ticket_store.save_route(&route).await {
            warn!(error = %e, "failed to persist route, returning it unsaved");
        }

        Ok(route)
    }

    fn build_clusters(&self, strategy: &Strategy, tickets: &[Ticket]) -> Vec<Cluster> {
        match strategy {
            Strategy::UrgencyFirst => vec![single_cluster(tickets)],
            Strategy::Geographic | Strategy::Mixed => {
                clustering::cluster(tickets, self.config.dbscan_eps_km, self.config.dbscan_min_samples)
            }
        }
    }
}

fn filter_malformed(tickets: Vec<Ticket>) -> (Vec<Ticket>, usize) {
    let mut valid = Vec::with_capacity(tickets.len());
    let mut dropped = 0;
    for t in tickets {
        if t.status == TicketStatus::Open && t.has_valid_coordinates() && t.estimated_service_minutes > 0 {
            valid.push(t);
        } else {
            dropped += 1;
        }
    }
    (valid, dropped)
}

fn score_tickets(tickets: &[Ticket], cfg: &EngineConfig) -> Vec<ScoredTicket> {
    tickets
        .iter()
        .map(|t| ScoredTicket {
            ticket: t.clone(),
            urgency: scoring::score(t, &cfg.urgency_weights),
        })
        .collect()
}

/// `urgency_first` treats the whole ordered population as a single cluster
/// so the solver runs once over everyone instead of per geographic group.
fn single_cluster(tickets: &[Ticket]) -> Cluster {
    let n = tickets.len() as f64;
    let centroid_lat = tickets.iter().map(|t| t.lat).sum::<f64>() / n;
    let centroid_lon = tickets.iter().map(|t| t.lon).sum::<f64>() / n;
    let aggregate_priority = tickets
        .iter()
        .map(|t| t.priority)
        .min()
        .unwrap_or(Priority::Low);
    let total_service_minutes = tickets.iter().map(|t| t.estimated_service_minutes).sum();

    Cluster {
        ticket_ids: tickets.iter().map(|t| t.id).collect(),
        centroid_lat,
        centroid_lon,
        aggregate_priority,
        total_service_minutes,
    }
}

fn clusters_served(stops: &[crate::domain::types::PlannedStop], clusters: &[Cluster]) -> usize {
    let stop_ids: std::collections::HashSet<TicketId> = stops.iter().map(|s| s.ticket_id).collect();
    clusters
        .iter()
        .filter(|c| c.ticket_ids.iter().any(|id| stop_ids.contains(id)))
        .count()
}

fn empty_route(request: &OptimizeRequest, exit_code: ExitCode) -> Route {
    Route {
        crew_type: request.crew_type,
        date: request.date,
        stops: Vec::new(),
        total_distance_km: 0.0,
        total_time_minutes: 0.0,
        stats: RouteStats {
            clusters_served: 0,
            emergencies_covered: 0,
            skipped_due_to_budget: 0,
        },
        exit_code,
        dropped: Vec::new(),
    }
}
