//! Liveness, readiness and component health

use std::future::Future;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::{db, AppState};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Unhealthy,
    NotConfigured,
}

impl HealthState {
    /// Components that are merely absent do not fail the service
    fn is_serving(self) -> bool {
        self != HealthState::Unhealthy
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: HealthState,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct DetailedHealthResponse {
    pub status: HealthState,
    pub version: &'static str,
    pub components: ComponentHealth,
}

#[derive(Serialize)]
pub struct ComponentHealth {
    pub database: ComponentStatus,
    pub mailer: ComponentStatus,
}

impl ComponentHealth {
    fn overall(&self) -> HealthState {
        if [&self.database, &self.mailer]
            .iter()
            .all(|c| c.status.is_serving())
        {
            HealthState::Healthy
        } else {
            HealthState::Unhealthy
        }
    }
}

/// One component's check result
#[derive(Serialize)]
pub struct ComponentStatus {
    pub status: HealthState,
    /// Backend behind the component, e.g. the mail transport
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ComponentStatus {
    fn skipped(transport: Option<&'static str>) -> Self {
        Self {
            status: HealthState::NotConfigured,
            transport,
            latency_ms: None,
            message: None,
        }
    }

    /// Run a check and time it
    async fn run<F>(transport: Option<&'static str>, check: F) -> Self
    where
        F: Future<Output = anyhow::Result<()>>,
    {
        let started = Instant::now();
        let result = check.await;
        let latency_ms = Some(started.elapsed().as_millis() as u64);

        match result {
            Ok(()) => Self {
                status: HealthState::Healthy,
                transport,
                latency_ms,
                message: None,
            },
            Err(e) => Self {
                status: HealthState::Unhealthy,
                transport,
                latency_ms,
                message: Some(format!("{:#}", e)),
            },
        }
    }
}

/// Always 200 while the process serves requests
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: HealthState::Healthy,
        version: VERSION,
    })
}

/// Database and mail relay status; 503 when either is failing
///
/// The relay is only contacted when SMTP is configured. The transport name
/// is reported either way so operators can see where mail is going.
pub async fn health_check_detailed(
    State(state): State<AppState>,
) -> (StatusCode, Json<DetailedHealthResponse>) {
    let mailer = state.notifier.mailer();

    let components = ComponentHealth {
        database: ComponentStatus::run(None, db::check_health(&state.db)).await,
        mailer: if state.config.email.is_some() {
            ComponentStatus::run(Some(mailer.name()), mailer.check()).await
        } else {
            ComponentStatus::skipped(Some(mailer.name()))
        },
    };

    let status = components.overall();
    let code = if status.is_serving() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(DetailedHealthResponse {
            status,
            version: VERSION,
            components,
        }),
    )
}

pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// Ready once the database answers
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match db::check_health(&state.db).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
