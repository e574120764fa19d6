// src/api.rs
//! HTTP surface: calculator, result link, benchmark, platform cards, onboarding,
//! form options.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::aggregates::{
    resolve_benchmark, resolve_platform_ranges, AggregateSource, InMemoryAggregates,
    QueryCapability,
};
use crate::benchmark::{platform_scenarios, BenchmarkComparison, PlatformScenario};
use crate::calc::{calculate_all, format_czk, CalculationInputs, CalculationResults};
use crate::devlog::dev_log_calculation;
use crate::input::{CalculatorForm, FieldErrors, InputError, ResultQuery};
use crate::onboarding::{form_options, onboarding_status, FormOptions, OnboardingStatus};
use crate::recommendations::{generate_recommendations, Recommendation};
use crate::score::{score_breakdown, ScoreBreakdown};

#[derive(Clone)]
pub struct AppState {
    pub aggregates: Arc<dyn AggregateSource>,
    pub capability: QueryCapability,
}

impl AppState {
    pub fn new(aggregates: Arc<dyn AggregateSource>, capability: QueryCapability) -> Self {
        Self {
            aggregates,
            capability,
        }
    }

    /// No backend at all: every comparison reads as unavailable.
    pub fn offline() -> Self {
        Self::new(
            Arc::new(InMemoryAggregates::default()),
            QueryCapability::Disabled,
        )
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/calculate", post(calculate))
        .route("/form", post(submit_form))
        .route("/result", get(result))
        .route("/benchmark", get(benchmark))
        .route("/platforms", get(platforms))
        .route("/onboarding", get(onboarding))
        .route("/options", get(options))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Money figures pre-rendered as whole crowns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedResults {
    pub hourly_rate: String,
    pub earnings_per_delivery: String,
    pub weekly_earnings: String,
    pub monthly_estimate: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationReport {
    pub results: CalculationResults,
    pub formatted: FormattedResults,
    pub efficiency: ScoreBreakdown,
    pub recommendations: Vec<Recommendation>,
}

/// Whole engine pipeline over one set of inputs.
pub fn build_report(inputs: &CalculationInputs) -> CalculationReport {
    let results = calculate_all(inputs);
    let efficiency = score_breakdown(&results);
    let recommendations = generate_recommendations(&(&results).into());
    counter!("calc_requests_total").increment(1);
    dev_log_calculation("calculate", inputs, efficiency.score);

    CalculationReport {
        formatted: FormattedResults {
            hourly_rate: format_czk(results.hourly_rate),
            earnings_per_delivery: format_czk(results.earnings_per_delivery),
            weekly_earnings: format_czk(results.weekly_earnings),
            monthly_estimate: format_czk(results.monthly_estimate),
        },
        results,
        efficiency,
        recommendations,
    }
}

/// Report plus everything compared against peers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultPage {
    pub city: String,
    pub platform: String,
    #[serde(flatten)]
    pub report: CalculationReport,
    pub benchmark: BenchmarkComparison,
    pub platforms: Vec<PlatformScenario>,
    pub onboarding: OnboardingStatus,
}

async fn result_page(
    state: &AppState,
    inputs: &CalculationInputs,
    city: String,
    platform: String,
) -> ResultPage {
    let report = build_report(inputs);
    let hourly = report.results.hourly_rate;
    let benchmark = resolve_benchmark(
        state.aggregates.as_ref(),
        state.capability,
        hourly,
        Some(city.as_str()),
        Some(platform.as_str()),
    )
    .await;
    let ranges =
        resolve_platform_ranges(state.aggregates.as_ref(), state.capability, Some(city.as_str())).await;

    ResultPage {
        platforms: platform_scenarios(hourly, &ranges, Some(city.as_str())),
        onboarding: onboarding_status(Some(city.as_str()), Some(platform.as_str())),
        city,
        platform,
        report,
        benchmark,
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn reject(status: StatusCode, err: InputError) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: err.to_string(),
            fields: err.fields().cloned(),
        }),
    )
}

async fn calculate(Json(inputs): Json<CalculationInputs>) -> Json<CalculationReport> {
    Json(build_report(&inputs))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FormResponse {
    contribute_to_benchmark: bool,
    #[serde(flatten)]
    page: ResultPage,
}

async fn submit_form(
    State(state): State<AppState>,
    Json(form): Json<CalculatorForm>,
) -> Result<Json<FormResponse>, ApiError> {
    let valid = form
        .validate()
        .map_err(|e| reject(StatusCode::UNPROCESSABLE_ENTITY, e))?;
    let page = result_page(&state, &valid.inputs, valid.city, valid.platform).await;
    Ok(Json(FormResponse {
        contribute_to_benchmark: valid.contribute_to_benchmark,
        page,
    }))
}

async fn result(
    State(state): State<AppState>,
    Query(q): Query<ResultQuery>,
) -> Result<Json<ResultPage>, ApiError> {
    let params = q
        .resolve()
        .map_err(|e| reject(StatusCode::BAD_REQUEST, e))?;
    Ok(Json(
        result_page(&state, &params.inputs, params.city, params.platform).await,
    ))
}

#[derive(Debug, Deserialize)]
struct BenchmarkQuery {
    city: Option<String>,
    platform: Option<String>,
    #[serde(default)]
    hourly: f64,
}

async fn benchmark(
    State(state): State<AppState>,
    Query(q): Query<BenchmarkQuery>,
) -> Json<BenchmarkComparison> {
    let cmp = resolve_benchmark(
        state.aggregates.as_ref(),
        state.capability,
        q.hourly,
        q.city.as_deref(),
        q.platform.as_deref(),
    )
    .await;
    Json(cmp)
}

#[derive(Debug, Deserialize)]
struct PlatformsQuery {
    city: Option<String>,
    #[serde(default)]
    hourly: f64,
}

async fn platforms(
    State(state): State<AppState>,
    Query(q): Query<PlatformsQuery>,
) -> Json<Vec<PlatformScenario>> {
    let ranges =
        resolve_platform_ranges(state.aggregates.as_ref(), state.capability, q.city.as_deref()).await;
    Json(platform_scenarios(q.hourly, &ranges, q.city.as_deref()))
}

#[derive(Debug, Deserialize)]
struct OnboardingQuery {
    city: Option<String>,
    platform: Option<String>,
}

#[derive(Debug, Serialize)]
struct OnboardingOut {
    status: OnboardingStatus,
}

async fn onboarding(Query(q): Query<OnboardingQuery>) -> Json<OnboardingOut> {
    Json(OnboardingOut {
        status: onboarding_status(q.city.as_deref(), q.platform.as_deref()),
    })
}

async fn options() -> Json<FormOptions> {
    Json(form_options())
}
