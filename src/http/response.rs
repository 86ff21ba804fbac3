//! Dispatch decision responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::routing::Route;

/// Body returned for every dispatched request.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DispatchDecision {
    pub request_id: String,
    pub table_version: u64,
    pub route: Option<String>,
    pub cluster: Option<String>,
}

impl DispatchDecision {
    pub fn matched(request_id: &str, table_version: u64, route: &Route) -> Self {
        Self {
            request_id: request_id.to_string(),
            table_version,
            route: Some(route.name().to_string()),
            cluster: Some(route.cluster().to_string()),
        }
    }

    pub fn no_match(request_id: &str, table_version: u64) -> Self {
        Self {
            request_id: request_id.to_string(),
            table_version,
            route: None,
            cluster: None,
        }
    }
}

impl IntoResponse for DispatchDecision {
    fn into_response(self) -> Response {
        let status = if self.route.is_some() {
            StatusCode::OK
        } else {
            StatusCode::NOT_FOUND
        };
        (status, Json(self)).into_response()
    }
}
