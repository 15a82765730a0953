use std::sync::{Arc, RwLock};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::{DateTime, Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;

use crate::auth::{self, SESSION_COOKIE};
use crate::chart::{self, ChartKind};
use crate::config::Config;
use crate::export;
use crate::filter;
use crate::metrics;
use crate::normalize::Normalizer;
use crate::record::{DateShortcut, FilterSpec, Record};
use crate::source::{FetchError, RowSource};

/// Email header set by a fronting SSO proxy, when one is deployed
const SSO_EMAIL_HEADER: &str = "x-auth-email";

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub source: RowSource,
    pub snapshot: RwLock<Snapshot>,
}

/// The canonical in-memory copy of the fetched data
///
/// Replaced wholesale by a refresh; everything downstream (metrics, filtered
/// views, charts, exports) is derived per request and never written back.
#[derive(Debug, Default)]
pub struct Snapshot {
    pub records: Vec<Record>,
    pub skipped: usize,
    pub fetched_at: Option<DateTime<Local>>,
}

impl Snapshot {
    /// Min and max onboarding date present in the loaded data
    pub fn date_extent(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut extent: Option<(NaiveDate, NaiveDate)> = None;
        for record in &self.records {
            if let Some(date) = record.onboarding_date {
                extent = Some(match extent {
                    Some((min, max)) => (min.min(date), max.max(date)),
                    None => (date, date),
                });
            }
        }
        extent
    }
}

/// Start the dashboard server
pub async fn run(config: Config) -> anyhow::Result<()> {
    if config.access_key.is_none() && config.allowed_domain.is_none() {
        log::warn!("no access_key or allowed_domain configured, dashboard is open to anyone");
    }

    let source = RowSource::from_setting(&config.sheet);
    let state = Arc::new(AppState {
        config,
        source,
        snapshot: RwLock::new(Snapshot::default()),
    });

    // Load once up front. A failure is logged and recoverable through the
    // refresh button, so the server still starts.
    match refresh_snapshot(&state).await {
        Ok((records, skipped)) => log::info!(
            "loaded {records} records ({skipped} skipped) from {}",
            state.source.describe()
        ),
        Err(e) => log::error!("initial fetch failed: {e}"),
    }

    let app = Router::new()
        .route("/", get(serve_dashboard))
        .route("/login", get(serve_login).post(submit_login))
        .route("/logout", post(logout))
        .route("/api/summary", get(summary))
        .route("/api/records", get(records))
        .route("/api/options", get(options))
        .route("/api/refresh", post(refresh))
        .route("/api/export.csv", get(export_csv))
        .route("/api/chart/:kind", get(chart_svg))
        .with_state(state.clone());

    let listener = TcpListener::bind(&state.config.bind_addr).await?;
    log::info!("listening on http://{}", state.config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Fetch, normalize, and swap in a fresh snapshot
///
/// The fetch completes before the write lock is taken, so readers never see
/// a half-built snapshot and a failed fetch leaves the old one untouched.
async fn refresh_snapshot(state: &AppState) -> Result<(usize, usize), FetchError> {
    let grid = state.source.fetch().await?;
    let normalized = Normalizer::from_config(&state.config).normalize(&grid);
    let counts = (normalized.records.len(), normalized.skipped);

    let mut snapshot = state.snapshot.write().unwrap();
    *snapshot = Snapshot {
        records: normalized.records,
        skipped: normalized.skipped,
        fetched_at: Some(Local::now()),
    };
    Ok(counts)
}

enum AuthDenied {
    NeedsLogin,
    Forbidden,
}

/// Decide whether a request may see the dashboard
///
/// An SSO-provided identity is checked against the allow-listed domain
/// first, then the session cookie. Access is open only when neither an
/// access key nor a domain allow-list is configured.
fn check_auth(state: &AppState, jar: &CookieJar, headers: &HeaderMap) -> Result<(), AuthDenied> {
    if let Some(domain) = &state.config.allowed_domain {
        if let Some(email) = headers
            .get(SSO_EMAIL_HEADER)
            .and_then(|value| value.to_str().ok())
        {
            if auth::domain_allowed(domain, email) {
                return Ok(());
            }
            log::warn!("rejected SSO identity {email}: domain not allowed");
            return Err(AuthDenied::Forbidden);
        }
    }

    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if auth::session_identity(cookie.value()).is_some() {
            return Ok(());
        }
    }

    if state.config.access_key.is_none() {
        // With a domain allow-list as the only gate, a request that never
        // went through the SSO proxy carries no identity and is rejected.
        if state.config.allowed_domain.is_some() {
            return Err(AuthDenied::Forbidden);
        }
        return Ok(());
    }

    Err(AuthDenied::NeedsLogin)
}

fn deny_api(denied: AuthDenied) -> Response {
    match denied {
        AuthDenied::NeedsLogin => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "login required" })),
        )
            .into_response(),
        AuthDenied::Forbidden => (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "access denied" })),
        )
            .into_response(),
    }
}

/// Filter state as it arrives on the query string
///
/// Converted to a concrete [`FilterSpec`] once per request; shortcut ranges
/// resolve against today's date at selection time and are not re-evaluated
/// afterwards.
#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    pub range: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub rep: Option<String>,
    pub status: Option<String>,
    pub sentiment: Option<String>,
    pub search: Option<String>,
}

fn resolve_spec(query: FilterQuery, extent: Option<(NaiveDate, NaiveDate)>) -> FilterSpec {
    let today = Local::now().date_naive();
    let (start, end) = match query.range.as_deref().and_then(DateShortcut::parse) {
        Some(shortcut) => shortcut.resolve(today, extent),
        None => match (query.start, query.end) {
            (Some(start), Some(end)) => (start, end),
            _ => DateShortcut::MonthToDate.resolve(today, extent),
        },
    };
    FilterSpec {
        start,
        end,
        rep: query.rep,
        status: query.status,
        sentiment: query.sentiment,
        search: query.search,
    }
}

async fn serve_dashboard(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Response {
    match check_auth(&state, &jar, &headers) {
        Ok(()) => Html(include_str!("./static/dashboard.html")).into_response(),
        Err(AuthDenied::NeedsLogin) => Redirect::to("/login").into_response(),
        Err(AuthDenied::Forbidden) => (
            StatusCode::FORBIDDEN,
            Html("<h1>Access denied</h1><p>Your account's domain is not allowed.</p>"),
        )
            .into_response(),
    }
}

async fn serve_login(State(state): State<Arc<AppState>>) -> Html<String> {
    let hint = state.config.access_hint.as_deref().unwrap_or("");
    Html(include_str!("./static/login.html").replace("{{HINT}}", hint))
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    access_key: String,
}

async fn submit_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    axum::Form(form): axum::Form<LoginForm>,
) -> Response {
    let Some(key) = &state.config.access_key else {
        return Redirect::to("/").into_response();
    };

    if auth::verify_access_key(key, &form.access_key) {
        let token = auth::create_session("shared-key");
        let jar = jar.add(
            Cookie::build((SESSION_COOKIE, token))
                .path("/")
                .http_only(true),
        );
        (jar, Redirect::to("/")).into_response()
    } else {
        log::warn!("rejected login attempt (wrong access key)");
        Redirect::to("/login?error=1").into_response()
    }
}

async fn logout(jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        auth::destroy_session(cookie.value());
    }
    let jar = jar.remove(Cookie::from(SESSION_COOKIE));
    (jar, Redirect::to("/login")).into_response()
}

/// Month-to-date overview plus the prior-month comparison
async fn summary(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Response {
    if let Err(denied) = check_auth(&state, &jar, &headers) {
        return deny_api(denied);
    }

    let snapshot = state.snapshot.read().unwrap();
    let today = Local::now().date_naive();
    let success = &state.config.success_statuses;
    let mtd = metrics::month_to_date(&snapshot.records, today, success);
    let prior = metrics::prior_month(&snapshot.records, today, success);
    let delta = metrics::trend_delta(&mtd, &prior);

    Json(json!({
        "mtd": mtd,
        "prior_month": prior,
        "trend_delta": delta,
        "record_count": snapshot.records.len(),
        "skipped_rows": snapshot.skipped,
        "worksheet": state.config.worksheet,
        "last_refresh": snapshot
            .fetched_at
            .map(|t| t.format("%b %d, %Y %I:%M %p").to_string()),
    }))
    .into_response()
}

/// Filtered records plus the metric set over the filtered view
async fn records(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FilterQuery>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Response {
    if let Err(denied) = check_auth(&state, &jar, &headers) {
        return deny_api(denied);
    }

    let snapshot = state.snapshot.read().unwrap();
    let spec = resolve_spec(query, snapshot.date_extent());
    let rows = filter::apply(&snapshot.records, &spec);
    let filtered_metrics = metrics::compute(rows.iter(), &state.config.success_statuses);

    Json(json!({
        "records": rows,
        "metrics": filtered_metrics,
        "empty": rows.is_empty(),
    }))
    .into_response()
}

async fn options(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Response {
    if let Err(denied) = check_auth(&state, &jar, &headers) {
        return deny_api(denied);
    }
    let snapshot = state.snapshot.read().unwrap();
    Json(filter::distinct_options(&snapshot.records)).into_response()
}

/// Manual refresh: re-fetch and replace the snapshot
///
/// There is no automatic retry; a failure is reported back for the error
/// banner and the previous snapshot stays in place.
async fn refresh(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Response {
    if let Err(denied) = check_auth(&state, &jar, &headers) {
        return deny_api(denied);
    }

    match refresh_snapshot(&state).await {
        Ok((records, skipped)) => {
            log::info!("refreshed: {records} records, {skipped} skipped");
            Json(json!({ "status": "ok", "records": records, "skipped": skipped }))
                .into_response()
        }
        Err(e) => {
            log::error!("refresh failed: {e}");
            let code = match e {
                FetchError::NotFound(_) => StatusCode::NOT_FOUND,
                FetchError::Unreachable(_) | FetchError::Empty => StatusCode::BAD_GATEWAY,
            };
            (code, Json(json!({ "status": "error", "message": e.to_string() }))).into_response()
        }
    }
}

async fn export_csv(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FilterQuery>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Response {
    if let Err(denied) = check_auth(&state, &jar, &headers) {
        return deny_api(denied);
    }

    let snapshot = state.snapshot.read().unwrap();
    let spec = resolve_spec(query, snapshot.date_extent());
    let rows = filter::apply(&snapshot.records, &spec);

    match export::to_csv(&rows) {
        Ok(bytes) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"filtered_onboardings.csv\"",
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => {
            log::error!("csv export failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

async fn chart_svg(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Query(query): Query<FilterQuery>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Response {
    if let Err(denied) = check_auth(&state, &jar, &headers) {
        return deny_api(denied);
    }

    let Some(kind) = ChartKind::parse(&kind) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "unknown chart" })),
        )
            .into_response();
    };

    let snapshot = state.snapshot.read().unwrap();
    let spec = resolve_spec(query, snapshot.date_extent());
    let rows = filter::apply(&snapshot.records, &spec);

    match chart::render(kind, &rows) {
        Ok(svg) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "image/svg+xml")],
            svg,
        )
            .into_response(),
        Err(e) => {
            log::error!("chart render failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
