use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::deserialize_messages;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Transport,
    Domain,
    Validation,
}

/// Body of a non-2xx HTTP response, when the server sent one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, deserialize_with = "deserialize_messages")]
    pub message: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("api reported status {status_code}")]
pub struct DomainFailure {
    pub status_code: i64,
    pub error: Option<String>,
    pub messages: Vec<String>,
}

impl DomainFailure {
    pub fn is_not_found(&self) -> bool {
        self.status_code == 404
    }
}
