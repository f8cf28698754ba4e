use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use dotenv::dotenv;
use tracing::{info, span, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crew_route_engine::fixtures::{generate_tickets, GeneratorConfig};
use crew_route_engine::store::{NullDistanceCacheStore, SqliteTicketStore, TicketStore};
use crew_route_engine::{CrewType, EngineConfig, EngineFacade, OptimizeRequest, Strategy};

#[tokio::main]
#[tracing::instrument(name = "crew route engine", level = "info")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_span_events(fmt::format::FmtSpan::NEW | fmt::format::FmtSpan::CLOSE))
        .init();

    dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| {
        warn!("DATABASE_URL not set, using default SQLite file");
        "sqlite:crew_route_engine.sqlite".to_string()
    });

    let ticket_store = {
        let span = span!(Level::INFO, "connect_ticket_store");
        let _guard = span.enter();
        Arc::new(SqliteTicketStore::connect(&database_url).await?)
    };

    seed_if_empty(&ticket_store).await?;

    let facade = EngineFacade::new(
        ticket_store,
        Some(Arc::new(NullDistanceCacheStore)),
        EngineConfig::from_env(),
    );

    let request = OptimizeRequest {
        crew_type: CrewType::General,
        date: NaiveDate::from_str(&std::env::var("ROUTE_DATE").unwrap_or_else(|_| "2026-07-31".into()))?,
        max_hours: 8.0,
        max_points: 50,
        strategy: Strategy::Mixed,
        deadline_ms: None,
    };

    let route = facade.optimize(request).await?;

    info!(
        stops = route.stops.len(),
        total_distance_km = route.total_distance_km,
        total_time_minutes = route.total_time_minutes,
        dropped = route.dropped.len(),
        exit_code = ?route.exit_code,
        "route computed"
    );
    println!("{}", serde_json::to_string_pretty(&route)?);

    Ok(())
}

async fn seed_if_empty(store: &SqliteTicketStore) -> Result<(), Box<dyn std::error::Error>> {
    let existing = store.list_open_tickets(CrewType::General).await?;
    if !existing.is_empty() {
        return Ok(());
    }

    info!("ticket store is empty, seeding with synthetic demo tickets");
    let cfg = GeneratorConfig {
        count: 40,
        crew_type: CrewType::General,
        center_lat: 40.73,
        center_lon: -73.99,
        spread_degrees: 0.05,
        seed: 1,
        dependency_rate: 0.1,
    };
    for ticket in generate_tickets(&cfg) {
        store.insert_ticket(&ticket).await?;
    }
    Ok(())
}
