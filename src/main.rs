use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use bto_engine::allocation::{
    allocation_router, projects_from_path, AllocationEngine, Applicant, ApplicantId, EntityStore,
    FlatType, ManagerId, MaritalStatus, MemoryStore, OfficerId, Project, ProjectId, SequenceIds,
    SystemClock, UnitType,
};
use bto_engine::config::AppConfig;
use bto_engine::error::AppError;
use bto_engine::telemetry;
use chrono::{Duration, Local};
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "BTO Allocation Engine",
    about = "Run the BTO application allocation engine as an HTTP service or demo",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Walk a scripted allocation scenario against an in-memory store
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
    /// Project roster CSV to load before serving
    #[arg(long)]
    seed: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
struct DemoArgs {
    /// Project roster CSV to load instead of the built-in sample projects
    #[arg(long)]
    seed: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Demo(args) => run_demo(args),
    }
}

fn build_engine(
    seed: Option<PathBuf>,
) -> Result<(Arc<AllocationEngine<MemoryStore>>, usize), AppError> {
    let store = Arc::new(MemoryStore::default());
    let projects = match seed {
        Some(path) => projects_from_path(path)?,
        None => sample_projects(),
    };
    let count = projects.len();
    for project in projects {
        store.insert_project(project)?;
    }

    let engine = Arc::new(AllocationEngine::new(
        store,
        Arc::new(SystemClock),
        Arc::new(SequenceIds::default()),
    ));
    Ok((engine, count))
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    let seed = args.seed.take().or_else(|| config.seed_path.clone());

    telemetry::init(&config.telemetry)?;

    let (engine, project_count) = build_engine(seed)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(allocation_router(engine))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, project_count, "allocation engine ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let (engine, project_count) = build_engine(args.seed)?;

    println!("BTO allocation demo ({project_count} project(s) loaded)");

    let applicant = Applicant {
        id: ApplicantId("S1234567A".to_string()),
        age: 36,
        marital_status: MaritalStatus::Single,
    };
    let project = ProjectId("Acacia Breeze".to_string());

    let application = engine
        .applications()
        .submit(&applicant, &project, FlatType::TwoRoom)?;
    println!(
        "- submitted application {} for {} ({})",
        application.id,
        applicant.id,
        application.flat_type
    );

    let application = engine.applications().approve(&application.id)?;
    println!("- application {} is now {}", application.id, application.status.label());

    let application = engine.applications().book(
        &application.id,
        "02-117".to_string(),
        OfficerId("T7654321B".to_string()),
    )?;
    println!("- booked unit {:?} for {}", application.assigned_unit, application.id);

    let receipt = engine.applications().generate_receipt(&application.id)?;
    println!(
        "- receipt: {} | {} | {} | {} | ${}",
        receipt.application_id,
        receipt.applicant,
        receipt.project_name,
        receipt.flat_type,
        receipt.selling_price
    );

    let withdrawal = engine
        .withdrawals()
        .request(&application.id, Some("change of plans".to_string()))?;
    let withdrawal = engine.withdrawals().approve(&withdrawal.id)?;
    println!(
        "- withdrawal {} approved, unit returned to inventory",
        withdrawal.id
    );

    Ok(())
}

/// Built-in roster so the demo and an unseeded server have data to serve.
fn sample_projects() -> Vec<Project> {
    let today = Local::now().date_naive();

    let mut acacia_units = BTreeMap::new();
    acacia_units.insert(
        FlatType::TwoRoom,
        UnitType {
            total: 2,
            available: 2,
            price: 120_000,
        },
    );
    acacia_units.insert(
        FlatType::ThreeRoom,
        UnitType {
            total: 3,
            available: 3,
            price: 180_000,
        },
    );

    let mut maple_units = BTreeMap::new();
    maple_units.insert(
        FlatType::TwoRoom,
        UnitType {
            total: 5,
            available: 5,
            price: 110_000,
        },
    );

    vec![
        Project {
            id: ProjectId("Acacia Breeze".to_string()),
            name: "Acacia Breeze".to_string(),
            neighborhood: "Yishun".to_string(),
            unit_types: acacia_units,
            open_date: today - Duration::days(7),
            close_date: today + Duration::days(14),
            manager: ManagerId("M0000001C".to_string()),
            officer_slots: 3,
            assigned_officers: Vec::new(),
            visible: true,
        },
        Project {
            id: ProjectId("Maple Grove".to_string()),
            name: "Maple Grove".to_string(),
            neighborhood: "Boon Lay".to_string(),
            unit_types: maple_units,
            open_date: today + Duration::days(30),
            close_date: today + Duration::days(60),
            manager: ManagerId("M0000002D".to_string()),
            officer_slots: 2,
            assigned_officers: Vec::new(),
            visible: true,
        },
    ]
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        serde_json::json!({ "status": "ready" })
    } else {
        serde_json::json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
