//! The action client: typed request in, typed response out.
//!
//! # Design
//! `ActionClient` owns a `Config`, a `Credential` and an optional
//! `Transport`. Invoking an action splits into a pure `build_request` step,
//! the transport round-trip, and a pure `parse_response` step, so the only
//! side effect of an invocation is the single `Transport::send`. That makes
//! re-invoking after a failure safe.
//!
//! The transport is swappable: production code uses `HttpTransport`, tests
//! install a `MockTransport`, and the invocation logic is the same.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::{Config, LogLevel};
use crate::credential::{Anonymous, Credential};
use crate::data::{self, DataMap, ACTION_KEY};
use crate::error::{ActionError, ConfigError, InvokeError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::retry::Retry;
use crate::transport::{HttpTransport, Transport};

/// Emit a `tracing` event at `$level` if the action's threshold allows it.
macro_rules! action_event {
    ($threshold:expr, $level:expr, $($arg:tt)+) => {
        if $threshold.allows($level) {
            match $level {
                LogLevel::Debug => tracing::debug!($($arg)+),
                LogLevel::Info => tracing::info!($($arg)+),
                LogLevel::Warn => tracing::warn!($($arg)+),
                LogLevel::Error => tracing::error!($($arg)+),
            }
        }
    };
}

/// Invokes named actions against the backend.
#[derive(Debug)]
pub struct ActionClient {
    config: Config,
    credential: Arc<dyn Credential>,
    transport: Option<Arc<dyn Transport>>,
}

impl ActionClient {
    /// A client that talks to `config.base_url` over HTTP, retrying network
    /// failures `config.max_retries` times.
    pub fn new(config: Config, credential: impl Credential + 'static) -> Self {
        let http = HttpTransport::new(&config);
        let transport: Arc<dyn Transport> = if config.max_retries > 0 {
            Arc::new(Retry::new(http, config.max_retries))
        } else {
            Arc::new(http)
        };
        Self {
            config,
            credential: Arc::new(credential),
            transport: Some(transport),
        }
    }

    /// A client with no transport. Every invocation fails with
    /// `ConfigError::MissingTransport` until `set_transport` is called.
    pub fn without_transport(config: Config, credential: impl Credential + 'static) -> Self {
        Self {
            config,
            credential: Arc::new(credential),
            transport: None,
        }
    }

    /// An unsigned client with the default config and no transport.
    pub fn anonymous() -> Self {
        Self::without_transport(Config::new(), Anonymous)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn set_transport(&mut self, transport: impl Transport + 'static) {
        self.transport = Some(Arc::new(transport));
    }

    pub fn has_transport(&self) -> bool {
        self.transport.is_some()
    }

    /// Invoke `action` with `request` and decode the reply into `Resp`.
    pub fn invoke_action<Req, Resp>(&self, action: &str, request: &Req) -> Result<Resp, InvokeError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned + Serialize + Default,
    {
        self.invoke(action, request, None)
    }

    /// Like `invoke_action`, but gives up with a timeout once `deadline` has
    /// elapsed.
    pub fn invoke_action_within<Req, Resp>(
        &self,
        action: &str,
        request: &Req,
        deadline: Duration,
    ) -> Result<Resp, InvokeError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned + Serialize + Default,
    {
        self.invoke(action, request, Some(deadline))
    }

    /// Out-parameter form of `invoke_action`. `response` is only assigned
    /// when the invocation succeeds.
    pub fn invoke_action_into<Req, Resp>(
        &self,
        action: &str,
        request: &Req,
        response: &mut Resp,
    ) -> Result<(), InvokeError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned + Serialize + Default,
    {
        *response = self.invoke(action, request, None)?;
        Ok(())
    }

    fn invoke<Req, Resp>(
        &self,
        action: &str,
        request: &Req,
        deadline: Option<Duration>,
    ) -> Result<Resp, InvokeError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned + Serialize + Default,
    {
        let transport = self
            .transport
            .as_ref()
            .ok_or_else(|| InvokeError::new(action, ConfigError::MissingTransport))?;

        let mut raw = self
            .build_request(action, request)
            .map_err(|e| InvokeError::new(action, e))?;
        raw.timeout = deadline;
        self.credential
            .sign(&mut raw)
            .map_err(|e| InvokeError::new(action, ActionError::Sign(e)))?;

        let level = self.config.action_level(action);
        action_event!(level, LogLevel::Debug, action, url = %raw.url, "invoking action");

        let started = Instant::now();
        let result = transport
            .send(raw)
            .map_err(ActionError::from)
            .and_then(|response| parse_response(&response));
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(response) => {
                action_event!(level, LogLevel::Info, action, elapsed_ms, "action succeeded");
                Ok(response)
            }
            Err(err) => {
                action_event!(level, LogLevel::Error, action, elapsed_ms, error = %err, "action failed");
                Err(InvokeError::new(action, err))
            }
        }
    }

    /// Build the raw request for `action`: a JSON object body carrying the
    /// request fields plus `Action`, with `Action` also in the query.
    pub fn build_request<Req>(&self, action: &str, request: &Req) -> Result<HttpRequest, ActionError>
    where
        Req: Serialize + ?Sized,
    {
        let value = serde_json::to_value(request).map_err(|e| ActionError::Encode(e.to_string()))?;
        let mut fields = match value {
            Value::Object(fields) => fields,
            Value::Null => DataMap::new(),
            _ => {
                return Err(ActionError::Encode(
                    "request must serialize to a JSON object".to_string(),
                ))
            }
        };
        fields.insert(ACTION_KEY.to_string(), Value::String(action.to_string()));
        let body = serde_json::to_vec(&fields).map_err(|e| ActionError::Encode(e.to_string()))?;

        let mut raw = HttpRequest::new(HttpMethod::Post, &self.config.base_url);
        raw.set_query(ACTION_KEY, action);
        raw.set_header("Content-Type", "application/json");
        raw.set_header("User-Agent", &self.config.full_user_agent());
        raw.set_body(body);
        Ok(raw)
    }
}

/// Decode a raw response into `Resp`.
///
/// Non-2xx statuses, malformed bodies and a non-zero `RetCode` are errors.
/// Unknown fields are ignored. Fields the body omits, or sends as `null`,
/// keep their value from `Resp::default()`; an empty body decodes to the
/// default itself.
pub fn parse_response<Resp>(response: &HttpResponse) -> Result<Resp, ActionError>
where
    Resp: DeserializeOwned + Serialize + Default,
{
    if !response.is_success() {
        return Err(ActionError::Status {
            status: response.status,
            body: response.body_text(),
        });
    }
    let fields = data::decode_response(response).map_err(ActionError::Decode)?;
    check_ret_code(&fields)?;
    let merged = overlay_on_default::<Resp>(fields)?;
    serde_json::from_value(merged).map_err(|e| ActionError::Decode(e.to_string()))
}

/// `fields` laid over the JSON form of `Resp::default()`.
fn overlay_on_default<Resp>(fields: DataMap) -> Result<Value, ActionError>
where
    Resp: Serialize + Default,
{
    let base = serde_json::to_value(Resp::default()).map_err(|e| ActionError::Decode(e.to_string()))?;
    let Value::Object(mut merged) = base else {
        return Ok(Value::Object(fields));
    };
    for (key, value) in fields {
        if !value.is_null() {
            merged.insert(key, value);
        }
    }
    Ok(Value::Object(merged))
}

fn check_ret_code(fields: &DataMap) -> Result<(), ActionError> {
    let ret_code = match fields.get("RetCode") {
        None | Some(Value::Null) => return Ok(()),
        Some(value) => value
            .as_i64()
            .ok_or_else(|| ActionError::Decode(format!("RetCode is not an integer: {value}")))?,
    };
    if ret_code == 0 {
        return Ok(());
    }
    let message = fields
        .get("Message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Err(ActionError::Server { ret_code, message })
}
