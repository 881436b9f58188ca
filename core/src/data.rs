//! Decoded ("data") form of action payloads and its wire codec.
//!
//! The wire format is a JSON object body, with the action name duplicated in
//! the `Action` query parameter. Decoding a request merges the body with its
//! query parameters, query values winning.

use serde_json::{Map, Value};

use crate::http::{HttpRequest, HttpResponse};

/// Name of the parameter that carries the action name.
pub const ACTION_KEY: &str = "Action";

/// Field name to value mapping of a decoded request or response.
pub type DataMap = Map<String, Value>;

/// Decode a raw request into its data form.
pub fn decode_request(request: &HttpRequest) -> Result<DataMap, String> {
    let mut data = decode_object(&request.body)?;
    for (key, value) in &request.query {
        data.insert(key.clone(), Value::String(value.clone()));
    }
    Ok(data)
}

/// Decode a raw response body. An empty body decodes to an empty map.
pub fn decode_response(response: &HttpResponse) -> Result<DataMap, String> {
    decode_object(&response.body)
}

/// Encode `data` into the body of `response` as compact JSON.
pub fn encode_response(data: &DataMap, response: &mut HttpResponse) -> Result<(), String> {
    let body = serde_json::to_vec(data).map_err(|e| e.to_string())?;
    response.set_header("Content-Type", "application/json");
    response.set_body(body);
    Ok(())
}

/// The action name a raw request carries, from the query or, failing that,
/// the body.
pub fn request_action(request: &HttpRequest) -> String {
    if let Some(action) = request.get_query(ACTION_KEY) {
        return action.to_string();
    }
    decode_object(&request.body)
        .ok()
        .and_then(|data| data.get(ACTION_KEY).and_then(Value::as_str).map(str::to_string))
        .unwrap_or_default()
}

fn decode_object(body: &[u8]) -> Result<DataMap, String> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(DataMap::new());
    }
    match serde_json::from_slice(body).map_err(|e| e.to_string())? {
        Value::Object(map) => Ok(map),
        other => Err(format!("expected a JSON object, got {}", kind_of(&other))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
