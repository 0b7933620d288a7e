use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::ledger::{EntryOutcome, ExitOutcome, Ledger, LocatedVehicle};
use crate::models::*;
use crate::report;

// ============================================================
// Error Handling
// ============================================================

/// Map a ledger error to a response.
///
/// Business outcomes are returned to the client verbatim. Persistence
/// problems are logged in full and answered with a generic message.
fn ledger_error(e: LedgerError) -> (StatusCode, String) {
    let status = match &e {
        LedgerError::CapacityExhausted { .. } | LedgerError::AlreadyParked { .. } => {
            StatusCode::CONFLICT
        }
        LedgerError::SessionNotFound { .. } => StatusCode::NOT_FOUND,
        LedgerError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        LedgerError::PersistenceCorrupt { .. } | LedgerError::PersistenceWriteFailed { .. } => {
            tracing::error!("Internal error: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            );
        }
    };
    tracing::warn!("Rejected request: {}", e);
    (status, e.to_string())
}

// ============================================================
// Request / response bodies
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub operator: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorResponse {
    pub operator: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryRequest {
    pub plate: String,
    #[serde(rename = "type")]
    pub vehicle_type: String,
    #[serde(default)]
    pub tier: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

/// An alert with its operator-facing text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertView {
    #[serde(flatten)]
    pub alert: Alert,
    pub message: String,
}

impl From<Alert> for AlertView {
    fn from(alert: Alert) -> Self {
        let message = alert.to_string();
        Self { alert, message }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryResponse {
    pub session: VehicleSession,
    pub alerts: Vec<AlertView>,
    /// False when the entry stands in memory but could not be written through.
    pub persisted: bool,
}

impl From<EntryOutcome> for EntryResponse {
    fn from(outcome: EntryOutcome) -> Self {
        let persisted = outcome.is_persisted();
        Self {
            session: outcome.session,
            alerts: outcome.alerts.into_iter().map(AlertView::from).collect(),
            persisted,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitRequest {
    pub plate: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitResponse {
    pub record: HistoryRecord,
    pub persisted: bool,
}

impl From<ExitOutcome> for ExitResponse {
    fn from(outcome: ExitOutcome) -> Self {
        let persisted = outcome.is_persisted();
        Self {
            record: outcome.record,
            persisted,
        }
    }
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Operator
// ============================================================

pub async fn get_operator(State(ledger): State<Ledger>) -> Json<OperatorResponse> {
    Json(OperatorResponse {
        operator: ledger.current_operator(),
    })
}

pub async fn login(
    State(ledger): State<Ledger>,
    Json(input): Json<LoginRequest>,
) -> Result<Json<OperatorResponse>, (StatusCode, String)> {
    ledger.login(&input.operator).map_err(ledger_error)?;
    Ok(Json(OperatorResponse {
        operator: ledger.current_operator(),
    }))
}

// ============================================================
// Entry / exit
// ============================================================

pub async fn register_entry(
    State(ledger): State<Ledger>,
    Json(input): Json<EntryRequest>,
) -> Result<(StatusCode, Json<EntryResponse>), (StatusCode, String)> {
    let vehicle = NewVehicle::parse(
        &input.plate,
        &input.vehicle_type,
        input.tier.as_deref(),
        input.lat,
        input.lon,
    )
    .map_err(ledger_error)?;

    ledger
        .register_entry(vehicle)
        .map(|outcome| (StatusCode::CREATED, Json(outcome.into())))
        .map_err(ledger_error)
}

pub async fn register_exit(
    State(ledger): State<Ledger>,
    Json(input): Json<ExitRequest>,
) -> Result<Json<ExitResponse>, (StatusCode, String)> {
    ledger
        .register_exit(&input.plate)
        .map(|outcome| Json(outcome.into()))
        .map_err(ledger_error)
}

// ============================================================
// Queries
// ============================================================

pub async fn list_active(State(ledger): State<Ledger>) -> Json<Vec<VehicleSession>> {
    Json(ledger.list_active())
}

pub async fn list_capacity(State(ledger): State<Ledger>) -> Json<BTreeMap<VehicleType, u32>> {
    Json(ledger.list_capacity())
}

pub async fn list_alerts(State(ledger): State<Ledger>) -> Json<Vec<AlertView>> {
    Json(
        ledger
            .compute_alerts()
            .into_iter()
            .map(AlertView::from)
            .collect(),
    )
}

pub async fn list_history(State(ledger): State<Ledger>) -> Json<Vec<HistoryRecord>> {
    Json(ledger.history())
}

pub async fn resolve_location(
    State(ledger): State<Ledger>,
    Path(plate): Path<String>,
) -> Result<Json<LocatedVehicle>, (StatusCode, String)> {
    ledger
        .resolve_location(&plate)
        .map(Json)
        .ok_or((
            StatusCode::NOT_FOUND,
            format!("No known location for {}", normalize_plate(&plate)),
        ))
}

// ============================================================
// Reports
// ============================================================

pub async fn revenue_by_operator(State(ledger): State<Ledger>) -> Json<BTreeMap<String, f64>> {
    Json(report::revenue_by_operator(&ledger.history()))
}

pub async fn occupancy(State(ledger): State<Ledger>) -> Json<BTreeMap<VehicleType, u32>> {
    Json(report::occupancy_by_type(&ledger.list_active()))
}

pub async fn history_csv(
    State(ledger): State<Ledger>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let body = report::history_csv(&ledger.history()).map_err(|e| {
        tracing::error!("Internal error: {:#}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        )
    })?;
    Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], body))
}
