use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::config;
use crate::server::AppState;

/// `GET /check/:username`.
///
/// Always answers 200; existing consumers detect failure by the body
/// shape (an `error` key) rather than the status code, and that contract
/// is kept deliberately.
pub async fn check_user(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> (StatusCode, Json<Value>) {
    let status = match state.checker.check(&username).await {
        Ok(status) => status,
        Err(e) => {
            warn!("status check for {} failed: {}", username, e);
            return (StatusCode::OK, Json(json!({ "error": e })));
        }
    };

    let body = match serde_json::to_value(&status) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => {
            return (
                StatusCode::OK,
                Json(json!({ "error": "could not serialize status" })),
            );
        }
    };

    // The exclusion list lives in the config file and may change while
    // the server runs, so it is re-read per request.
    let exclude = match config::load_config(&state.config_path) {
        Ok(config) => config.exclude,
        Err(e) => {
            warn!("config reload failed, serving unfiltered status: {}", e);
            Vec::new()
        }
    };

    (
        StatusCode::OK,
        Json(Value::Object(apply_exclusions(body, &exclude))),
    )
}

fn apply_exclusions(mut body: Map<String, Value>, exclude: &[String]) -> Map<String, Value> {
    for field in exclude {
        body.remove(field);
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusions_remove_named_fields() {
        let mut body = Map::new();
        body.insert("username".to_string(), json!("alice"));
        body.insert("time_online".to_string(), json!("01:23"));
        body.insert("count_connection".to_string(), json!(2));

        let filtered = apply_exclusions(
            body,
            &["time_online".to_string(), "not_a_field".to_string()],
        );

        assert!(filtered.contains_key("username"));
        assert!(filtered.contains_key("count_connection"));
        assert!(!filtered.contains_key("time_online"));
    }
}
