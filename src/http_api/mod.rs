use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::{
    Allocation, AllocationBook, AllocationError, AllocationId, CapacitySummary, DailyCapacity,
    DateWindow, NewAllocation, UtilizationReport, WriteOutcome, calendar,
    window::{Clock, SystemClock},
};

#[derive(Clone)]
pub struct AppState {
    book: Arc<RwLock<AllocationBook>>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl AppState {
    pub fn new(book: AllocationBook) -> Self {
        Self::with_clock(book, SystemClock)
    }

    pub fn with_clock(book: AllocationBook, clock: impl Clock + Send + Sync + 'static) -> Self {
        Self {
            book: Arc::new(RwLock::new(book)),
            clock: Arc::new(clock),
        }
    }

    pub fn with_shared(book: Arc<RwLock<AllocationBook>>) -> Self {
        Self {
            book,
            clock: Arc::new(SystemClock),
        }
    }

    fn book(&self) -> Arc<RwLock<AllocationBook>> {
        self.book.clone()
    }

    /// Explicit bounds win; a missing bound falls back to the current month.
    fn window(&self, query: &WindowQuery) -> DateWindow {
        let month = DateWindow::current_month(self.clock.today());
        DateWindow::new(
            query.start.unwrap_or(month.start),
            query.end.unwrap_or(month.end),
        )
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct AllocationFilter {
    subject: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WorkingDaysResponse {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub working_days: i64,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Invalid(String),
}

impl From<AllocationError> for ApiError {
    fn from(value: AllocationError) -> Self {
        match value {
            AllocationError::NotFound(_) => ApiError::NotFound(value.to_string()),
            AllocationError::Validation(_) => ApiError::Invalid(value.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::Invalid(message) => (StatusCode::BAD_REQUEST, "invalid_request", message),
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/working-days", get(working_days))
        .route("/subjects/:subject/capacity", get(subject_capacity))
        .route("/subjects/:subject/availability", get(subject_availability))
        .route("/report", get(report))
        .route("/allocations", get(list_allocations).post(create_allocation))
        .route(
            "/allocations/:id",
            get(get_allocation)
                .put(update_allocation)
                .delete(delete_allocation),
        )
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, book: AllocationBook) -> std::io::Result<()> {
    let state = AppState::new(book);
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "http api listening");
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn working_days(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> Json<WorkingDaysResponse> {
    let window = state.window(&query);
    Json(WorkingDaysResponse {
        start: window.start,
        end: window.end,
        working_days: calendar::working_days_closed_form(window.start, window.end),
    })
}

async fn subject_capacity(
    State(state): State<AppState>,
    Path(subject): Path<String>,
    Query(query): Query<WindowQuery>,
) -> Json<CapacitySummary> {
    let window = state.window(&query);
    let book = state.book();
    let summary = {
        let guard = book.read();
        guard.capacity(&subject, &window)
    };
    Json(summary.rounded())
}

async fn subject_availability(
    State(state): State<AppState>,
    Path(subject): Path<String>,
    Query(query): Query<WindowQuery>,
) -> Json<Vec<DailyCapacity>> {
    let window = state.window(&query);
    let book = state.book();
    let records = {
        let mut guard = book.write();
        guard.cached_availability(&subject, &window)
    };
    Json(records)
}

async fn report(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> Json<UtilizationReport> {
    let window = state.window(&query);
    let book = state.book();
    let report = {
        let guard = book.read();
        guard.report(&window)
    };
    Json(report)
}

async fn list_allocations(
    State(state): State<AppState>,
    Query(filter): Query<AllocationFilter>,
) -> Json<Vec<Allocation>> {
    let book = state.book();
    let allocations = {
        let guard = book.read();
        match filter.subject {
            Some(subject) => guard.allocations_for(&subject),
            None => guard.allocations(),
        }
    };
    Json(allocations)
}

async fn get_allocation(
    State(state): State<AppState>,
    Path(id): Path<AllocationId>,
) -> Result<Json<Allocation>, ApiError> {
    let book = state.book();
    let found = {
        let guard = book.read();
        guard.get(id).cloned()
    };
    found
        .map(Json)
        .ok_or_else(|| ApiError::from(AllocationError::NotFound(id)))
}

async fn create_allocation(
    State(state): State<AppState>,
    Json(new): Json<NewAllocation>,
) -> Result<(StatusCode, Json<WriteOutcome>), ApiError> {
    let book = state.book();
    let outcome = {
        let mut guard = book.write();
        guard.create(new)?
    };
    Ok((StatusCode::CREATED, Json(outcome)))
}

async fn update_allocation(
    State(state): State<AppState>,
    Path(id): Path<AllocationId>,
    Json(edit): Json<NewAllocation>,
) -> Result<Json<WriteOutcome>, ApiError> {
    let book = state.book();
    let outcome = {
        let mut guard = book.write();
        guard.update(id, edit)?
    };
    Ok(Json(outcome))
}

async fn delete_allocation(
    State(state): State<AppState>,
    Path(id): Path<AllocationId>,
) -> Result<StatusCode, ApiError> {
    let book = state.book();
    {
        let mut guard = book.write();
        guard.delete(id)?;
    }
    Ok(StatusCode::NO_CONTENT)
}
