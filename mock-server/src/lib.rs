use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};

/// Calls received so far, per action name.
pub type Calls = Arc<RwLock<HashMap<String, u64>>>;

/// Return code for an action the server does not implement.
pub const RET_CODE_NOT_FOUND: i64 = 160;

pub fn app() -> Router {
    let calls: Calls = Arc::new(RwLock::new(HashMap::new()));
    Router::new().route("/", post(dispatch)).with_state(calls)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn dispatch(
    State(calls): State<Calls>,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let mut fields = match parse_body(&body) {
        Ok(fields) => fields,
        Err(msg) => return (StatusCode::BAD_REQUEST, msg).into_response(),
    };
    let action = match query
        .get("Action")
        .cloned()
        .or_else(|| fields.get("Action").and_then(Value::as_str).map(str::to_string))
    {
        Some(action) if !action.is_empty() => action,
        _ => return (StatusCode::BAD_REQUEST, "missing Action").into_response(),
    };
    *calls.write().await.entry(action.clone()).or_insert(0) += 1;
    debug!(%action, "dispatching");

    match action.as_str() {
        "Echo" => {
            fields.insert("Action".into(), json!("EchoResponse"));
            fields.insert("RetCode".into(), json!(0));
            Json(Value::Object(fields)).into_response()
        }
        "Sleep" => {
            let millis = fields.get("Millis").and_then(Value::as_u64).unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(millis)).await;
            Json(json!({"Action": "SleepResponse", "RetCode": 0})).into_response()
        }
        "Fail" => (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response(),
        "CallCount" => {
            let target = fields.get("Target").and_then(Value::as_str).unwrap_or_default();
            let count = calls.read().await.get(target).copied().unwrap_or(0);
            Json(json!({"Action": "CallCountResponse", "RetCode": 0, "Count": count}))
                .into_response()
        }
        other => {
            info!(action = %other, "unknown action");
            Json(json!({
                "Action": format!("{other}Response"),
                "RetCode": RET_CODE_NOT_FOUND,
                "Message": format!("Action [{other}] not found"),
            }))
            .into_response()
        }
    }
}

fn parse_body(body: &[u8]) -> Result<Map<String, Value>, String> {
    if body.is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_slice(body) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err("body must be a JSON object".to_string()),
        Err(e) => Err(format!("malformed JSON body: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_parses_to_no_fields() {
        assert!(parse_body(b"").unwrap().is_empty());
    }

    #[test]
    fn object_body_parses() {
        let fields = parse_body(br#"{"Action":"Echo","N":1}"#).unwrap();
        assert_eq!(fields["Action"], "Echo");
        assert_eq!(fields["N"], 1);
    }

    #[test]
    fn array_body_is_rejected() {
        assert_eq!(parse_body(b"[]").unwrap_err(), "body must be a JSON object");
    }

    #[test]
    fn malformed_body_is_rejected() {
        assert!(parse_body(b"{").unwrap_err().starts_with("malformed JSON body"));
    }
}
