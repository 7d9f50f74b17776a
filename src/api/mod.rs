mod store;

use axum::{
    Router,
    extract::{Json, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::core::{
    ContributionKind, ContributionLimits, ContributionSpec, ContributionSummary, PlanParameters,
    ProjectionResult, ScenarioProjection, compare_scenarios, max_amount, project_scenarios,
    summarize, validate, ytd_contributions,
};

pub use store::{ContributionSettings, JsonFileStore, MemoryStore, SettingsStore, StoreError};

/// Ages beyond this are rejected so a single request cannot ask for an unbounded projection.
pub const MAX_AGE: u32 = 150;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// `None` keeps settings in memory only.
    pub data_file: Option<PathBuf>,
    pub limits: ContributionLimits,
}

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn SettingsStore>,
    limits: ContributionLimits,
}

impl AppState {
    pub fn new(store: Arc<dyn SettingsStore>, limits: ContributionLimits) -> Self {
        Self { store, limits }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PlanOverrides {
    age: Option<u32>,
    annual_salary: Option<f64>,
    current_balance: Option<f64>,
    retirement_age: Option<u32>,
    salary_increase: Option<f64>,
    annual_return: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct UpdateContributionsPayload {
    contribution_type: Option<String>,
    contribution_amount: Option<f64>,
    paychecks_processed: Option<u32>,
    #[serde(flatten)]
    plan: PlanOverrides,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ImpactPayload {
    future_contribution_rate: Option<f64>,
    future_contribution_type: Option<String>,
    #[serde(flatten)]
    plan: PlanOverrides,
}

#[derive(Debug)]
struct ImpactRequest {
    plan: PlanParameters,
    current: ContributionSpec,
    projected: ContributionSpec,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ContributionsResponse {
    #[serde(flatten)]
    settings: ContributionSettings,
    summary: ContributionSummary,
    annual_limit: f64,
    max_percentage: f64,
    max_per_paycheck: f64,
}

#[derive(Debug, Serialize)]
struct UpdateResponse {
    success: bool,
    message: &'static str,
    data: ContributionSettings,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/contributions",
            get(get_contributions_handler).post(update_contributions_handler),
        )
        .route(
            "/api/calculate-retirement-impact",
            post(retirement_impact_handler),
        )
        .route("/api/projection", post(projection_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

pub async fn run_http_server(config: ServerConfig) -> std::io::Result<()> {
    let store: Arc<dyn SettingsStore> = match &config.data_file {
        Some(path) => Arc::new(JsonFileStore::open(path)),
        None => Arc::new(MemoryStore::default()),
    };
    let app = router(AppState::new(store, config.limits));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!(
        %addr,
        annual_limit = config.limits.annual_limit,
        data_file = ?config.data_file,
        "contribution API listening"
    );
    info!("local access: http://127.0.0.1:{}/api/contributions", config.port);

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn get_contributions_handler(State(state): State<AppState>) -> Response {
    let settings = match state.store.load() {
        Ok(settings) => settings,
        Err(err) => return store_error_response(&err),
    };
    json_response(
        StatusCode::OK,
        contributions_response(settings, &state.limits),
    )
}

async fn update_contributions_handler(
    State(state): State<AppState>,
    payload: Result<Json<UpdateContributionsPayload>, JsonRejection>,
) -> Response {
    let payload = match json_payload(payload) {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    let current = match state.store.load() {
        Ok(settings) => settings,
        Err(err) => return store_error_response(&err),
    };
    let updated = match settings_from_payload(payload, current, &state.limits) {
        Ok(settings) => settings,
        Err(msg) => {
            warn!(error = %msg, "rejected contribution update");
            return error_response(StatusCode::BAD_REQUEST, &msg);
        }
    };
    if let Err(err) = state.store.save(&updated) {
        return store_error_response(&err);
    }

    info!(
        kind = ?updated.contribution.kind,
        amount = updated.contribution.amount,
        ytd = updated.ytd_contributions,
        "contribution settings updated"
    );
    json_response(
        StatusCode::OK,
        UpdateResponse {
            success: true,
            message: "Contribution settings updated",
            data: updated,
        },
    )
}

async fn retirement_impact_handler(
    State(state): State<AppState>,
    payload: Result<Json<ImpactPayload>, JsonRejection>,
) -> Response {
    let request = match load_impact_request(&state, payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let result: ProjectionResult =
        compare_scenarios(&request.plan, &request.current, &request.projected);
    debug!(
        years = result.years_to_retirement,
        current = result.current_retirement_value,
        future = result.future_retirement_value,
        "calculated retirement impact"
    );
    json_response(StatusCode::OK, result)
}

async fn projection_handler(
    State(state): State<AppState>,
    payload: Result<Json<ImpactPayload>, JsonRejection>,
) -> Response {
    let request = match load_impact_request(&state, payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let projection: ScenarioProjection =
        project_scenarios(&request.plan, &request.current, &request.projected);
    debug!(years = projection.years, "built yearly projection");
    json_response(StatusCode::OK, projection)
}

fn load_impact_request(
    state: &AppState,
    payload: Result<Json<ImpactPayload>, JsonRejection>,
) -> Result<ImpactRequest, Response> {
    let payload = json_payload(payload)?;
    let settings = state.store.load().map_err(|err| store_error_response(&err))?;
    impact_request_from_payload(payload, &settings, &state.limits).map_err(|msg| {
        warn!(error = %msg, "rejected projection request");
        error_response(StatusCode::BAD_REQUEST, &msg)
    })
}

/// Malformed bodies, wrong field types and a missing content type all become a 400 JSON error.
fn json_payload<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload.map(|Json(payload)| payload).map_err(|rejection| {
        let msg = rejection.body_text();
        warn!(error = %msg, "rejected request body");
        error_response(StatusCode::BAD_REQUEST, &msg)
    })
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

fn store_error_response(err: &StoreError) -> Response {
    tracing::error!(error = %err, "settings store failure");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

fn contributions_response(
    settings: ContributionSettings,
    limits: &ContributionLimits,
) -> ContributionsResponse {
    let salary = settings.plan.annual_salary;
    ContributionsResponse {
        summary: summarize(&settings.contribution, salary),
        annual_limit: limits.annual_limit,
        max_percentage: max_amount(ContributionKind::Percentage, salary, limits),
        max_per_paycheck: max_amount(ContributionKind::FixedPerPaycheck, salary, limits),
        settings,
    }
}

fn parse_contribution_kind(raw: &str) -> Result<ContributionKind, String> {
    match raw {
        "percentage" => Ok(ContributionKind::Percentage),
        "fixed" => Ok(ContributionKind::FixedPerPaycheck),
        _ => Err("Invalid contribution type".to_string()),
    }
}

fn apply_plan_overrides(
    base: &PlanParameters,
    overrides: PlanOverrides,
) -> Result<PlanParameters, String> {
    let plan = PlanParameters {
        age: overrides.age.unwrap_or(base.age),
        annual_salary: overrides.annual_salary.unwrap_or(base.annual_salary),
        current_balance: overrides.current_balance.unwrap_or(base.current_balance),
        retirement_age: overrides.retirement_age.unwrap_or(base.retirement_age),
        salary_increase_rate: overrides
            .salary_increase
            .unwrap_or(base.salary_increase_rate),
        annual_return_rate: overrides.annual_return.unwrap_or(base.annual_return_rate),
    };

    if plan.age > MAX_AGE || plan.retirement_age > MAX_AGE {
        return Err(format!("age and retirementAge must be <= {MAX_AGE}"));
    }
    if !plan.annual_salary.is_finite() || plan.annual_salary < 0.0 {
        return Err("annualSalary must be >= 0".to_string());
    }
    if !plan.current_balance.is_finite() || plan.current_balance < 0.0 {
        return Err("currentBalance must be >= 0".to_string());
    }
    if !plan.annual_return_rate.is_finite() {
        return Err("annualReturn must be a finite fraction, e.g. 0.07".to_string());
    }
    Ok(plan)
}

fn settings_from_payload(
    payload: UpdateContributionsPayload,
    current: ContributionSettings,
    limits: &ContributionLimits,
) -> Result<ContributionSettings, String> {
    let (Some(raw_kind), Some(amount)) = (payload.contribution_type, payload.contribution_amount)
    else {
        return Err("Missing required fields".to_string());
    };
    let contribution = ContributionSpec {
        kind: parse_contribution_kind(&raw_kind)?,
        amount,
    };

    let plan = apply_plan_overrides(&current.plan, payload.plan)?;
    plan.validate().map_err(|e| e.to_string())?;
    validate(&contribution, plan.annual_salary, limits).map_err(|e| e.to_string())?;

    let paychecks_processed = payload
        .paychecks_processed
        .unwrap_or(current.paychecks_processed);
    Ok(ContributionSettings {
        ytd_contributions: ytd_contributions(&contribution, plan.annual_salary, paychecks_processed),
        user_id: current.user_id,
        contribution,
        plan,
        paychecks_processed,
    })
}

fn impact_request_from_payload(
    payload: ImpactPayload,
    settings: &ContributionSettings,
    limits: &ContributionLimits,
) -> Result<ImpactRequest, String> {
    let Some(amount) = payload.future_contribution_rate else {
        return Err("futureContributionRate is required".to_string());
    };
    let kind = match payload.future_contribution_type.as_deref() {
        Some(raw) => parse_contribution_kind(raw)?,
        None => settings.contribution.kind,
    };
    let projected = ContributionSpec { kind, amount };

    let plan = apply_plan_overrides(&settings.plan, payload.plan)?;
    validate(&projected, plan.annual_salary, limits).map_err(|e| e.to_string())?;

    Ok(ImpactRequest {
        plan,
        current: settings.contribution,
        projected,
    })
}

#[cfg(test)]
fn impact_request_from_json(
    json: &str,
    settings: &ContributionSettings,
) -> Result<ImpactRequest, String> {
    let payload = serde_json::from_str::<ImpactPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    impact_request_from_payload(payload, settings, &ContributionLimits::default())
}

#[cfg(test)]
fn settings_from_json(json: &str) -> Result<ContributionSettings, String> {
    let payload = serde_json::from_str::<UpdateContributionsPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    settings_from_payload(
        payload,
        ContributionSettings::default(),
        &ContributionLimits::default(),
    )
}
