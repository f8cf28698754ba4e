//! Component I — ticket persistence. The core never issues spatial queries
//! against this store (per the scope note in the spec); it pulls filtered
//! sets and does its own spatial math. `SqliteTicketStore` is a stand-in for
//! a production relational store with a geographic extension.

use std::collections::BTreeSet;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::Row;
use tracing::info;

use crate::domain::error::StoreError;
use crate::domain::types::{
    CrewType, Priority, ProblemSize, ProblemType, Route, RouteId, Ticket, TicketId, TicketStatus,
};

#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn list_open_tickets(&self, crew_type: CrewType) -> Result<Vec<Ticket>, StoreError>;
    async fn get_ticket(&self, id: TicketId) -> Result<Ticket, StoreError>;
    async fn save_route(&self, route: &Route) -> Result<RouteId, StoreError>;
}

pub struct SqliteTicketStore {
    pool: SqlitePool,
}

impl SqliteTicketStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(sqlx::Error::from)?
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        info!(database_url, "connected to ticket store");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tickets (
                id INTEGER PRIMARY KEY,
                lat REAL NOT NULL,
                lon REAL NOT NULL,
                problem_type TEXT NOT NULL,
                priority TEXT NOT NULL,
                crew_type TEXT NOT NULL,
                problem_size TEXT,
                estimated_service_minutes INTEGER NOT NULL,
                affects_traffic INTEGER NOT NULL,
                affects_commerce INTEGER NOT NULL,
                near_critical_location INTEGER NOT NULL,
                main_road INTEGER NOT NULL,
                complaints_count INTEGER NOT NULL,
                requires_road_block INTEGER NOT NULL,
                dependencies TEXT NOT NULL,
                status TEXT NOT NULL,
                urgency_score REAL,
                materials TEXT,
                photos TEXT,
                metadata TEXT
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS routes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                crew_type TEXT NOT NULL,
                date TEXT NOT NULL,
                stops TEXT NOT NULL,
                total_distance_km REAL NOT NULL,
                total_time_minutes REAL NOT NULL,
                exit_code TEXT NOT NULL,
                dropped TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(SqliteTicketStore { pool })
    }

    pub async fn insert_ticket(&self, ticket: &Ticket) -> Result<(), StoreError> {
        let deps = serde_json::to_string(&ticket.dependencies)?;
        let materials = ticket.materials.as_ref().map(|v| v.to_string());
        let photos = ticket.photos.as_ref().map(|v| v.to_string());
        let metadata = ticket.metadata.as_ref().map(|v| v.to_string());

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO tickets (
                id, lat, lon, problem_type, priority, crew_type, problem_size,
                estimated_service_minutes, affects_traffic, affects_commerce,
                near_critical_location, main_road, complaints_count,
                requires_road_block, dependencies, status, urgency_score,
                materials, photos, metadata
            ) VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?)
            "#,
        )
        .bind(ticket.id.0)
        .bind(ticket.lat)
        .bind(ticket.lon)
        .bind(problem_type_str(ticket.problem_type))
        .bind(priority_str(ticket.priority))
        .bind(crew_type_str(ticket.crew_type))
        .bind(ticket.problem_size.map(problem_size_str))
        .bind(ticket.estimated_service_minutes)
        .bind(ticket.affects_traffic)
        .bind(ticket.affects_commerce)
        .bind(ticket.near_critical_location)
        .bind(ticket.main_road)
        .bind(ticket.complaints_count)
        .bind(ticket.requires_road_block)
        .bind(deps)
        .bind(status_str(ticket.status))
        .bind(ticket.urgency_score)
        .bind(materials)
        .bind(photos)
        .bind(metadata)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl TicketStore for SqliteTicketStore {
    async fn list_open_tickets(&self, crew_type: CrewType) -> Result<Vec<Ticket>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM tickets WHERE crew_type = ? AND status = 'open'",
        )
        .bind(crew_type_str(crew_type))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_ticket).collect()
    }

    async fn get_ticket(&self, id: TicketId) -> Result<Ticket, StoreError> {
        let row = sqlx::query("SELECT * FROM tickets WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("ticket {id:?}")))?;
        row_to_ticket(&row)
    }

    async fn save_route(&self, route: &Route) -> Result<RouteId, StoreError> {
        let stops = serde_json::to_string(&route.stops)?;
        let dropped = serde_json::to_string(&route.dropped)?;

        let result = sqlx::query(
            r#"
            INSERT INTO routes (crew_type, date, stops, total_distance_km, total_time_minutes, exit_code, dropped)
            VALUES (?,?,?,?,?,?,?)
            "#,
        )
        .bind(crew_type_str(route.crew_type))
        .bind(route.date.to_string())
        .bind(stops)
        .bind(route.total_distance_km)
        .bind(route.total_time_minutes)
        .bind(format!("{:?}", route.exit_code))
        .bind(dropped)
        .execute(&self.pool)
        .await?;

        Ok(RouteId(result.last_insert_rowid()))
    }
}

fn row_to_ticket(row: &sqlx::sqlite::SqliteRow) -> Result<Ticket, StoreError> {
    let deps_raw: String = row.try_get("dependencies")?;
    let dependencies: BTreeSet<TicketId> =
        serde_json::from_str::<BTreeSet<i64>>(&deps_raw)?
            .into_iter()
            .map(TicketId)
            .collect();

    let materials_raw: Option<String> = row.try_get("materials")?;
    let photos_raw: Option<String> = row.try_get("photos")?;
    let metadata_raw: Option<String> = row.try_get("metadata")?;

    Ok(Ticket {
        id: TicketId(row.try_get("id")?),
        lat: row.try_get("lat")?,
        lon: row.try_get("lon")?,
        problem_type: parse_problem_type(&row.try_get::<String, _>("problem_type")?),
        priority: parse_priority(&row.try_get::<String, _>("priority")?),
        crew_type: parse_crew_type(&row.try_get::<String, _>("crew_type")?),
        problem_size: row
            .try_get::<Option<String>, _>("problem_size")?
            .as_deref()
            .map(parse_problem_size),
        estimated_service_minutes: row.try_get::<i64, _>("estimated_service_minutes")? as u32,
        affects_traffic: row.try_get("affects_traffic")?,
        affects_commerce: row.try_get("affects_commerce")?,
        near_critical_location: row.try_get("near_critical_location")?,
        main_road: row.try_get("main_road")?,
        complaints_count: row.try_get::<i64, _>("complaints_count")? as u32,
        requires_road_block: row.try_get("requires_road_block")?,
        dependencies,
        status: parse_status(&row.try_get::<String, _>("status")?),
        urgency_score: row.try_get("urgency_score")?,
        materials: materials_raw.map(|s| serde_json::from_str(&s)).transpose()?,
        photos: photos_raw.map(|s| serde_json::from_str(&s)).transpose()?,
        metadata: metadata_raw.map(|s| serde_json::from_str(&s)).transpose()?,
    })
}

fn problem_type_str(v: ProblemType) -> &'static str {
    match v {
        ProblemType::Pothole => "pothole",
        ProblemType::WaterLeak => "water_leak",
        ProblemType::SewerLeak => "sewer_leak",
        ProblemType::DarkLamp => "dark_lamp",
        ProblemType::ExposedWiring => "exposed_wiring",
        ProblemType::CloggedDrain => "clogged_drain",
        ProblemType::BrokenSidewalk => "broken_sidewalk",
        ProblemType::FaultyTrafficLight => "faulty_traffic_light",
    }
}

fn parse_problem_type(v: &str) -> ProblemType {
    match v {
        "pothole" => ProblemType::Pothole,
        "water_leak" => ProblemType::WaterLeak,
        "sewer_leak" => ProblemType::SewerLeak,
        "dark_lamp" => ProblemType::DarkLamp,
        "exposed_wiring" => ProblemType::ExposedWiring,
        "clogged_drain" => ProblemType::CloggedDrain,
        "broken_sidewalk" => ProblemType::BrokenSidewalk,
        "faulty_traffic_light" => ProblemType::FaultyTrafficLight,
        other => panic!("unknown problem_type in store: {other}"),
    }
}

fn priority_str(v: Priority) -> &'static str {
    match v {
        Priority::Emergency => "emergency",
        Priority::Urgent => "urgent",
        Priority::High => "high",
        Priority::Medium => "medium",
        Priority::Low => "low",
    }
}

fn parse_priority(v: &str) -> Priority {
    match v {
        "emergency" => Priority::Emergency,
        "urgent" => Priority::Urgent,
        "high" => Priority::High,
        "medium" => Priority::Medium,
        "low" => Priority::Low,
        other => panic!("unknown priority in store: {other}"),
    }
}

fn crew_type_str(v: CrewType) -> &'static str {
    match v {
        CrewType::Asphalt => "asphalt",
        CrewType::Hydraulic => "hydraulic",
        CrewType::Electric => "electric",
        CrewType::Sanitation => "sanitation",
        CrewType::General => "general",
    }
}

fn parse_crew_type(v: &str) -> CrewType {
    match v {
        "asphalt" => CrewType::Asphalt,
        "hydraulic" => CrewType::Hydraulic,
        "electric" => CrewType::Electric,
        "sanitation" => CrewType::Sanitation,
        "general" => CrewType::General,
        other => panic!("unknown crew_type in store: {other}"),
    }
}

fn problem_size_str(v: ProblemSize) -> &'static str {
    match v {
        ProblemSize::Small => "small",
        ProblemSize::Medium => "medium",
        ProblemSize::Large => "large",
    }
}

fn parse_problem_size(v: &str) -> ProblemSize {
    match v {
        "small" => ProblemSize::Small,
        "medium" => ProblemSize::Medium,
        "large" => ProblemSize::Large,
        other => panic!("unknown problem_size in store: {other}"),
    }
}

fn status_str(v: TicketStatus) -> &'static str {
    match v {
        TicketStatus::Open => "open",
        TicketStatus::InProgress => "in_progress",
        TicketStatus::Done => "done",
        TicketStatus::Cancelled => "cancelled",
    }
}

fn parse_status(v: &str) -> TicketStatus {
    match v {
        "open" => TicketStatus::Open,
        "in_progress" => TicketStatus::InProgress,
        "done" => TicketStatus::Done,
        "cancelled" => TicketStatus::Cancelled,
        other => panic!("unknown status in store: {other}"),
    }
}
