//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::domain::{DomainError, TrainId, format_hhmm};
use crate::resolve::{OptimizeError, optimize, repair, resolve, suggest};

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/dataset", put(load_dataset))
        .route("/timetable", get(timetable))
        .route("/conflicts", get(conflicts))
        .route("/warnings", get(warnings))
        .route("/baseline/accept", post(accept_baseline))
        .route("/trains/:id/shift", post(shift_train))
        .route("/trains/:id/dwell", post(set_dwell))
        .route("/repair", post(run_repair))
        .route("/suggest", post(run_suggest))
        .route("/optimize", post(run_optimize))
        .route("/resolve", post(run_resolve))
        .route("/stations/unknown", get(unknown_stations))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Load or replace the dataset. The baseline is recaptured.
async fn load_dataset(
    State(state): State<AppState>,
    Json(req): Json<DatasetRequest>,
) -> Result<Json<DatasetResponse>, AppError> {
    let session = req.into_session().map_err(|e| AppError::BadRequest {
        message: e.to_string(),
    })?;
    let summary = DatasetResponse::from_session(&session);

    let mut ws = state.workspace.lock().await;
    ws.replace(session);
    info!(
        stations = summary.stations,
        trains = summary.trains,
        "dataset replaced"
    );
    Ok(Json(summary))
}

async fn timetable(
    State(state): State<AppState>,
    Query(params): Query<RulesParams>,
) -> Json<TimetableResponse> {
    let ws = state.workspace.lock().await;
    let eval = ws.session.evaluate(&params.to_rules());
    Json(TimetableResponse::from_evaluation(&ws.session, &eval))
}

async fn conflicts(
    State(state): State<AppState>,
    Query(params): Query<RulesParams>,
) -> Json<ConflictsResponse> {
    let ws = state.workspace.lock().await;
    let topology = ws.session.topology();
    let conflicts = ws
        .session
        .conflicts(&params.to_rules())
        .iter()
        .map(|c| ConflictResult::from_conflict(topology, c))
        .collect();
    Json(ConflictsResponse { conflicts })
}

/// Trains shifted beyond their class limit since the baseline.
async fn warnings(State(state): State<AppState>) -> Json<WarningsResponse> {
    let ws = state.workspace.lock().await;
    let violations = ws
        .baseline
        .violations(ws.session.trains())
        .iter()
        .map(ViolationResult::from_violation)
        .collect();
    Json(WarningsResponse { violations })
}

/// Accept current starts into the baseline, for one train or all.
async fn accept_baseline(
    State(state): State<AppState>,
    Json(req): Json<AcceptRequest>,
) -> Result<Json<WarningsResponse>, AppError> {
    let mut ws = state.workspace.lock().await;
    let ws = &mut *ws;
    match req.train {
        Some(id) => {
            let id = parse_id(&id)?;
            ws.baseline.accept(ws.session.trains(), &id)?;
        }
        None => ws.baseline.accept_all(ws.session.trains()),
    }
    let violations = ws
        .baseline
        .violations(ws.session.trains())
        .iter()
        .map(ViolationResult::from_violation)
        .collect();
    Ok(Json(WarningsResponse { violations }))
}

async fn shift_train(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ShiftRequest>,
) -> Result<Json<ShiftResponse>, AppError> {
    let id = parse_id(&id)?;
    let mut ws = state.workspace.lock().await;
    let start = ws.session.shift_train(&id, req.minutes)?;
    Ok(Json(ShiftResponse {
        train: id.to_string(),
        start,
        start_hhmm: format_hhmm(start),
    }))
}

async fn set_dwell(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<DwellRequest>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id)?;
    let mut ws = state.workspace.lock().await;
    ws.session.set_dwell(&id, &req.station, req.minutes)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn run_repair(
    State(state): State<AppState>,
    Json(req): Json<RepairRequest>,
) -> Json<RepairResponse> {
    let mut ws = state.workspace.lock().await;
    let outcome = repair(&mut ws.session, &req.rules.to_rules(), &req.to_config());
    Json(RepairResponse::from_outcome(&outcome))
}

async fn run_suggest(
    State(state): State<AppState>,
    Json(req): Json<SuggestRequest>,
) -> Json<SuggestResponse> {
    let ws = state.workspace.lock().await;
    let suggestions = suggest(
        &ws.session,
        &req.rules.to_rules(),
        &req.to_repair(),
        &req.to_costs(),
    )
    .iter()
    .map(SuggestionResult::from_suggestion)
    .collect();
    Json(SuggestResponse { suggestions })
}

/// Run the optimizer on a copy of the session and keep the copy if the
/// outcome was written back.
async fn run_optimize(
    State(state): State<AppState>,
    Json(req): Json<OptimizeRequest>,
) -> Result<Json<OptimizeResponse>, AppError> {
    let rules = req.rules.to_rules();
    let config = req.to_config();

    let mut ws = state.workspace.lock().await;
    let mut session = ws.session.clone();
    let (session, result) = tokio::task::spawn_blocking(move || {
        let result = optimize(&mut session, &rules, &config);
        (session, result)
    })
    .await
    .map_err(|e| AppError::Internal {
        message: format!("optimizer task failed: {e}"),
    })?;

    let outcome = result?;
    if outcome.is_usable() {
        ws.session = session;
    }
    Ok(Json(OptimizeResponse::from_outcome(&outcome)))
}

async fn run_resolve(
    State(state): State<AppState>,
    Json(req): Json<ResolveRequest>,
) -> Result<Json<ResolveResponse>, AppError> {
    let rules = req.optimizer.rules.to_rules();
    let optimizer = req.optimizer.to_config();
    let repair_config = req.to_repair();

    let mut ws = state.workspace.lock().await;
    let mut session = ws.session.clone();
    let (session, resolution) = tokio::task::spawn_blocking(move || {
        let resolution = resolve(&mut session, &rules, &optimizer, &repair_config);
        (session, resolution)
    })
    .await
    .map_err(|e| AppError::Internal {
        message: format!("resolution task failed: {e}"),
    })?;

    ws.session = session;
    Ok(Json(ResolveResponse::from_resolution(&resolution)))
}

async fn unknown_stations(State(state): State<AppState>) -> Json<UnknownStationsResponse> {
    let ws = state.workspace.lock().await;
    Json(UnknownStationsResponse {
        stations: ws.session.unknown_stations(),
    })
}

fn parse_id(id: &str) -> Result<TrainId, AppError> {
    TrainId::new(id).map_err(|e| AppError::BadRequest {
        message: e.to_string(),
    })
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    Conflict { message: String },
    Internal { message: String },
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::UnknownTrain(_) => AppError::NotFound {
                message: e.to_string(),
            },
            _ => AppError::BadRequest {
                message: e.to_string(),
            },
        }
    }
}

impl From<OptimizeError> for AppError {
    fn from(e: OptimizeError) -> Self {
        match e {
            OptimizeError::IncompleteTimetable { .. } => AppError::Conflict {
                message: e.to_string(),
            },
            OptimizeError::Worker(_) => AppError::Internal {
                message: e.to_string(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
            AppError::Conflict { message } => (StatusCode::CONFLICT, message),
            AppError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        warn!(%status, error = %message, "request failed");

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
