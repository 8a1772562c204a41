//! Turns transport and domain failures into the single line a user sees.

use std::collections::BTreeMap;

use shared::error::DomainFailure;

use crate::{config::ClientSettings, error::TransportError};

#[derive(Debug, Clone)]
pub struct MessageCatalog {
    fallback: String,
    labels: BTreeMap<String, String>,
}

impl MessageCatalog {
    pub fn new<I, K, V>(fallback: impl Into<String>, labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fallback: fallback.into(),
            labels: labels
                .into_iter()
                .map(|(key, label)| (key.into(), label.into()))
                .collect(),
        }
    }

    pub fn from_settings(settings: &ClientSettings) -> Self {
        Self::new(
            settings.fallback_error_message.clone(),
            settings.field_labels.clone(),
        )
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    pub fn label<'a>(&'a self, field: &'a str) -> &'a str {
        self.labels.get(field).map_or(field, String::as_str)
    }

    pub fn transport_message(&self, err: &TransportError) -> String {
        let extracted = match err {
            TransportError::Status {
                body: Some(body), ..
            } => pick_message(body.error.as_deref(), &body.message),
            _ => None,
        };
        self.localize(extracted.as_deref().unwrap_or(&self.fallback))
    }

    pub fn domain_message(&self, failure: &DomainFailure) -> String {
        let extracted = pick_message(failure.error.as_deref(), &failure.messages);
        self.localize(extracted.as_deref().unwrap_or(&self.fallback))
    }

    /// Whole-word substitution of backend field keys with display labels.
    /// Words are runs of alphanumerics and `_`, so `identification` does not
    /// match inside `identificationType`.
    pub fn localize(&self, message: &str) -> String {
        let mut out = String::with_capacity(message.len());
        let mut word_start: Option<usize> = None;

        for (idx, ch) in message.char_indices() {
            if is_word_char(ch) {
                word_start.get_or_insert(idx);
                continue;
            }
            if let Some(start) = word_start.take() {
                out.push_str(self.label(&message[start..idx]));
            }
            out.push(ch);
        }
        if let Some(start) = word_start {
            out.push_str(self.label(&message[start..]));
        }

        out
    }
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// `error` first, then the joined `message` list; blanks count as absent.
pub fn pick_message(error: Option<&str>, messages: &[String]) -> Option<String> {
    if let Some(error) = error.map(str::trim).filter(|e| !e.is_empty()) {
        return Some(error.to_string());
    }
    let parts: Vec<&str> = messages
        .iter()
        .map(|m| m.trim())
        .filter(|m| !m.is_empty())
        .collect();
    (!parts.is_empty()).then(|| parts.join(", "))
}

#[cfg(test)]
#[path = "tests/messages_tests.rs"]
mod tests;
