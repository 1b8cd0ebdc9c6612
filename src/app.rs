#![cfg(feature = "web")]

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use handlebars::Handlebars;
use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::config::Config;
use crate::error::LedgerError;
use crate::ledger::Ledger;
use crate::partition::Period;
use crate::record::{InvoiceRecord, RecordForm, Schema};

const NOTICE_COOKIE: &str = "notice";

pub struct AppState {
    // Held for the whole load -> mutate -> save cycle of each request
    ledger: Mutex<Ledger>,
    templates: Handlebars<'static>,
}

impl AppState {
    pub fn new(ledger: Ledger) -> Result<Self, Box<dyn std::error::Error>> {
        let mut templates = Handlebars::new();
        templates.register_template_string("index", include_str!("./static/index.hbs"))?;
        Ok(AppState {
            ledger: Mutex::new(ledger),
            templates,
        })
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        // Nothing in memory can be left half-updated, the file is the state
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Deserialize, Default)]
struct PeriodQuery {
    period: Option<String>,
}

#[derive(Deserialize, Default)]
struct IndexQuery {
    period: Option<String>,
    query: Option<String>,
}

#[derive(Deserialize, Default)]
struct DownloadQuery {
    period: Option<String>,
    format: Option<String>,
}

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    message: Option<String>,
}

/// A failed request, turned into a JSON error response
pub enum AppError {
    Ledger(LedgerError),
    Render(handlebars::RenderError),
}

impl From<LedgerError> for AppError {
    fn from(e: LedgerError) -> Self {
        AppError::Ledger(e)
    }
}

impl From<handlebars::RenderError> for AppError {
    fn from(e: handlebars::RenderError) -> Self {
        AppError::Render(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Ledger(e) => {
                let status = match &e {
                    LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
                    LedgerError::InvalidPeriod(_)
                    | LedgerError::UnsupportedFormat(_)
                    | LedgerError::Parse(_) => StatusCode::BAD_REQUEST,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.to_string())
            }
            AppError::Render(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("request failed: {}", message);
        }
        let body = StatusResponse {
            status: "error".to_string(),
            message: Some(message),
        };
        (status, Json(body)).into_response()
    }
}

fn resolve_period(raw: Option<&str>) -> Result<Period, LedgerError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(Period::current()),
        Some(text) => text.parse(),
    }
}

fn home(ledger: &Ledger, period: Period) -> Redirect {
    if ledger.partition().is_monthly() {
        Redirect::to(&format!("/?period={period}"))
    } else {
        Redirect::to("/")
    }
}

fn with_notice(jar: CookieJar, message: &str) -> CookieJar {
    let cookie = Cookie::build((NOTICE_COOKIE, urlencoding::encode(message).into_owned()))
        .path("/")
        .build();
    jar.add(cookie)
}

fn take_notice(jar: CookieJar) -> (CookieJar, Option<String>) {
    let notice = jar
        .get(NOTICE_COOKIE)
        .map(|c| urlencoding::decode(c.value()).map(|s| s.into_owned()).unwrap_or_default())
        .filter(|s| !s.is_empty());
    if notice.is_none() {
        return (jar, None);
    }
    (jar.remove(Cookie::build(NOTICE_COOKIE).path("/")), notice)
}

/// Build the router over shared state
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/add", post(add_record))
        .route("/delete/:sno", post(delete_record))
        .route("/download", get(download))
        .route("/upload", post(upload))
        .route("/events", get(events))
        .route("/api/records", get(list_records))
        .nest_service("/static", ServeDir::new("static"))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let ledger = Ledger::new(config.ledger_options());

    // Create the backing workbook up front so a bad data dir fails at startup
    let period = Period::current();
    ledger.load(period)?;
    info!(
        "ledger at {} ({:?}, {:?} schema)",
        ledger.location(period).path.display(),
        ledger.partition(),
        ledger.schema()
    );

    let app = router(Arc::new(AppState::new(ledger)?));

    let listener = TcpListener::bind(config.bind).await?;
    info!("Listening on http://{}", config.bind);
    if config.bind.ip().is_unspecified() {
        match local_ip_address::local_ip() {
            Ok(ip) => info!("Reachable on the local network at http://{}:{}", ip, config.bind.port()),
            Err(e) => info!("Could not determine local network address: {}", e),
        }
    }
    axum::serve(listener, app).await?;

    Ok(())
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(request).await;
    info!(
        "{} {} -> {} in {:.1}ms",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_secs_f64() * 1000.0
    );
    response
}

async fn index(
    jar: CookieJar,
    Query(params): Query<IndexQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<(CookieJar, Html<String>), AppError> {
    let period = resolve_period(params.period.as_deref())?;
    let query = params.query.unwrap_or_default();
    let (jar, notice) = take_notice(jar);

    let ledger = state.ledger();
    let store = ledger.load(period)?;
    let periods: Vec<String> = ledger.periods()?.iter().map(Period::to_string).collect();
    let monthly = ledger.partition().is_monthly();
    drop(ledger);

    let columns = store.schema().columns();
    let rows: Vec<_> = store
        .filter(&query)
        .into_iter()
        .map(|r| {
            json!({
                "sno": r.sno,
                "cells": columns.iter().map(|&c| r.get(c)).collect::<Vec<_>>(),
            })
        })
        .collect();

    let context = json!({
        "period": period.to_string(),
        "periods": periods,
        "monthly": monthly,
        "vehicle_schema": store.schema() == Schema::Vehicle,
        "query": query,
        "notice": notice,
        "headers": store.schema().headers(),
        "count": rows.len(),
        "total": store.len(),
        "rows": rows,
    });

    let page = state.templates.render("index", &context)?;
    Ok((jar, Html(page)))
}

async fn add_record(
    Query(params): Query<PeriodQuery>,
    State(state): State<Arc<AppState>>,
    axum::Form(form): axum::Form<RecordForm>,
) -> Result<Redirect, AppError> {
    let period = resolve_period(params.period.as_deref())?;
    let ledger = state.ledger();
    ledger.append(period, InvoiceRecord::from(form))?;
    Ok(home(&ledger, period))
}

async fn delete_record(
    jar: CookieJar,
    Path(sno): Path<u32>,
    Query(params): Query<PeriodQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<(CookieJar, Redirect), AppError> {
    let period = resolve_period(params.period.as_deref())?;
    let ledger = state.ledger();
    let jar = match ledger.delete(period, sno) {
        Ok(_) => jar,
        Err(LedgerError::NotFound(_)) => with_notice(jar, &format!("S.No. {sno} not found")),
        Err(e) => return Err(e.into()),
    };
    Ok((jar, home(&ledger, period)))
}

async fn download(
    Query(params): Query<DownloadQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, AppError> {
    let period = resolve_period(params.period.as_deref())?;
    let ledger = state.ledger();

    let (content_type, extension, body) = match params.format.as_deref() {
        Some("csv") => (
            "text/csv; charset=utf-8",
            "csv",
            ledger.export_csv(period)?.into_bytes(),
        ),
        None | Some("xlsx") => (
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            "xlsx",
            ledger.export_xlsx(period)?,
        ),
        Some(other) => return Err(LedgerError::UnsupportedFormat(other.to_string()).into()),
    };
    let file_name = ledger.partition().download_name(period, extension);

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        body,
    )
        .into_response())
}

async fn upload(
    jar: CookieJar,
    Query(params): Query<PeriodQuery>,
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(CookieJar, Redirect), AppError> {
    let period = resolve_period(params.period.as_deref())?;

    let mut file = None;
    while let Some(field) = multipart.next_field().await.unwrap_or(None) {
        if field.name() == Some("file") {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await.unwrap_or_default().to_vec();
            file = Some((file_name, bytes));
        }
    }

    let ledger = state.ledger();
    let jar = match file {
        Some((file_name, bytes)) if !bytes.is_empty() => {
            match ledger.import(period, &file_name, bytes) {
                Ok(count) => with_notice(jar, &format!("Imported {count} rows from {file_name}")),
                Err(
                    e @ (LedgerError::UnsupportedFormat(_)
                    | LedgerError::Parse(_)
                    | LedgerError::Read(_)),
                ) => with_notice(jar, &format!("Upload ignored: {e}")),
                Err(e) => return Err(e.into()),
            }
        }
        _ => with_notice(jar, "Upload ignored: no file received"),
    };
    Ok((jar, home(&ledger, period)))
}

async fn events(
    Query(params): Query<PeriodQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let period = resolve_period(params.period.as_deref())?;
    let events = state.ledger().events(period)?;
    Ok(Json(events))
}

async fn list_records(
    Query(params): Query<IndexQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let period = resolve_period(params.period.as_deref())?;
    let query = params.query.unwrap_or_default();
    let rows = state.ledger().filter(period, &query)?;
    Ok(Json(rows))
}
