//! `/diagnostic` routes for debugging connectivity from inside a deployment.
//!
//! `db-test` walks DNS, TCP, login and a probe query in order and stops at
//! the first failure. It bypasses the pool on purpose: it answers "can this
//! host reach the database at all".

use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use tokio::net::{lookup_host, TcpStream};

use crate::db::{ConnectionManager, PgManager};
use crate::http::server::AppState;

const TCP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StepStatus {
    Pass,
    Fail,
}

#[derive(Debug, Clone, Serialize)]
pub struct Step {
    pub name: &'static str,
    pub status: StepStatus,
    pub details: String,
}

#[derive(Debug, Default, Serialize)]
pub struct DiagnosticReport {
    pub database_url: String,
    pub tests: Vec<Step>,
}

impl DiagnosticReport {
    fn pass(&mut self, name: &'static str, details: impl Into<String>) {
        self.tests.push(Step {
            name,
            status: StepStatus::Pass,
            details: details.into(),
        });
    }

    fn fail(&mut self, name: &'static str, details: impl ToString) {
        self.tests.push(Step {
            name,
            status: StepStatus::Fail,
            details: details.to_string(),
        });
    }

    pub fn passed(&self) -> bool {
        self.tests.iter().all(|s| s.status == StepStatus::Pass)
    }
}

pub async fn liveness() -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "status": "healthy",
        "message": "API is running",
    }))
}

pub async fn db_test(State(state): State<AppState>) -> Response {
    let manager = state.pool.manager();
    let connect_timeout = state.config.database.connect_timeout();
    let mut report = DiagnosticReport {
        database_url: manager.masked_url(),
        tests: Vec::new(),
    };

    run_steps(manager, connect_timeout, &mut report).await;

    let passed = report.passed();
    let status = if passed {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(json!({ "success": passed, "result": report }))).into_response()
}

async fn run_steps(manager: &PgManager, connect_timeout: Duration, report: &mut DiagnosticReport) {
    let (host, port) = manager.endpoint();

    let addr = match lookup_host((host.as_str(), port)).await {
        Ok(mut addrs) => match addrs.next() {
            Some(addr) => addr,
            None => return report.fail("DNS Resolution", format!("No addresses for {host}")),
        },
        Err(e) => return report.fail("DNS Resolution", e),
    };
    report.pass("DNS Resolution", format!("Resolved {host} to {}", addr.ip()));

    match tokio::time::timeout(TCP_TIMEOUT, TcpStream::connect(addr)).await {
        Ok(Ok(_stream)) => report.pass("TCP Connection", format!("Connected to {host}:{port}")),
        Ok(Err(e)) => return report.fail("TCP Connection", e),
        Err(_) => return report.fail("TCP Connection", format!("Timed out after {}s", TCP_TIMEOUT.as_secs())),
    }

    let mut conn = match tokio::time::timeout(connect_timeout, manager.connect()).await {
        Ok(Ok(conn)) => conn,
        Ok(Err(e)) => return report.fail("PostgreSQL Connection", e),
        Err(_) => {
            return report.fail(
                "PostgreSQL Connection",
                format!("Timed out after {}s", connect_timeout.as_secs()),
            )
        }
    };
    report.pass("PostgreSQL Connection", "Successfully connected to database");

    let probe = manager.ping(&mut conn).await;
    manager.close(conn).await;
    match probe {
        Ok(()) => report.pass("Query Execution", "Successfully executed test query"),
        Err(e) => report.fail("Query Execution", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_serializes_steps() {
        let mut report = DiagnosticReport::default();
        report.pass("DNS Resolution", "Resolved db to 10.0.0.1");
        assert!(report.passed());
        report.fail("TCP Connection", "connection refused");
        assert!(!report.passed());

        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["tests"][0]["status"], "PASS");
        assert_eq!(v["tests"][1]["status"], "FAIL");
        assert_eq!(v["tests"][1]["name"], "TCP Connection");
    }
}
