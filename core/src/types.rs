//! Payloads shared by every action.
//!
//! Concrete actions define their own request and response types. Field names
//! follow the backend's PascalCase convention. Response types implement
//! `Default`; fields the backend omits keep their default value.

use serde::{Deserialize, Serialize};

/// Request with no action-specific fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonRequest {}

/// The envelope every backend response carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct CommonResponse {
    pub action: String,
    pub ret_code: i64,
    pub message: String,
}
