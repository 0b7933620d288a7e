mod handlers;

pub use handlers::{AlertView, EntryRequest, EntryResponse, ExitRequest, ExitResponse, LoginRequest};

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::ledger::Ledger;

pub fn create_router(ledger: Ledger) -> Router {
    let api = Router::new()
        // Operator
        .route("/operator", get(handlers::get_operator))
        .route("/operator", post(handlers::login))
        // Entry / exit
        .route("/entries", post(handlers::register_entry))
        .route("/exits", post(handlers::register_exit))
        // Parked vehicles
        .route("/vehicles", get(handlers::list_active))
        .route("/vehicles/{plate}/location", get(handlers::resolve_location))
        // Facility
        .route("/capacity", get(handlers::list_capacity))
        .route("/alerts", get(handlers::list_alerts))
        .route("/history", get(handlers::list_history))
        // Reports
        .route("/reports/operators", get(handlers::revenue_by_operator))
        .route("/reports/occupancy", get(handlers::occupancy))
        .route("/reports/history.csv", get(handlers::history_csv))
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(ledger)
}
