use serde::{Deserialize, Deserializer, Serialize};

use crate::error::DomainFailure;

pub fn is_success_status(status_code: i64) -> bool {
    (200..300).contains(&status_code)
}

/// `message` arrives either as a single string or as a list of strings.
pub(crate) fn deserialize_messages<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(message)) => vec![message],
        Some(OneOrMany::Many(messages)) => messages,
        None => Vec::new(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub total_records: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            current_page: 1,
            page_size: 10,
            total_pages: 0,
            total_records: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub status_code: i64,
    #[serde(default, deserialize_with = "deserialize_messages")]
    pub message: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status_code: 200,
            message: Vec::new(),
            data: Some(data),
            error: None,
            pagination: None,
        }
    }

    pub fn failed(status_code: i64, error: impl Into<String>) -> Self {
        Self {
            status_code,
            message: Vec::new(),
            data: None,
            error: Some(error.into()),
            pagination: None,
        }
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    pub fn with_messages<I, S>(mut self, messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.message = messages.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_success(&self) -> bool {
        is_success_status(self.status_code)
    }

    /// The embedded status is authoritative: an HTTP 200 may still carry a
    /// failed `statusCode`.
    pub fn failure(&self) -> Option<DomainFailure> {
        if self.is_success() {
            return None;
        }
        Some(DomainFailure {
            status_code: self.status_code,
            error: self.error.clone(),
            messages: self.message.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u32,
    pub limit: u32,
    pub term: Option<String>,
    pub kind: Option<String>,
}

impl ListQuery {
    pub fn page(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
            term: None,
            kind: None,
        }
    }

    /// Blank terms are dropped so the query routes to the plain listing.
    pub fn with_term(mut self, term: &str) -> Self {
        let term = term.trim();
        self.term = (!term.is_empty()).then(|| term.to_string());
        self
    }

    pub fn with_kind(mut self, kind: Option<&str>) -> Self {
        self.kind = kind
            .map(str::trim)
            .filter(|kind| !kind.is_empty())
            .map(str::to_string);
        self
    }

    pub fn is_search(&self) -> bool {
        self.term.is_some()
    }

    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(4);
        if let Some(term) = &self.term {
            pairs.push(("term".to_string(), term.clone()));
        }
        pairs.push(("page".to_string(), self.page.to_string()));
        pairs.push(("limit".to_string(), self.limit.to_string()));
        if let Some(kind) = &self.kind {
            pairs.push(("type".to_string(), kind.clone()));
        }
        pairs
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
