//! Headless reactive-form model: values, touched/enabled flags, validation
//! rules and dependent-field resets.

use std::{collections::BTreeMap, fmt};

use serde_json::{Map, Number, Value};
use shared::domain::IdentificationType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Decimal,
    Boolean,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    Required,
    MinLength(usize),
    MaxLength(usize),
    Email,
    Numeric,
    /// Digits-only when the sibling `type_field` names a national registry
    /// document (`dni`, `ruc`).
    Identification { type_field: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    Required,
    TooShort { min: usize },
    TooLong { max: usize },
    InvalidEmail,
    NonNumeric,
    NotANumber,
    Flagged(String),
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => write!(f, "is required"),
            Self::TooShort { min } => write!(f, "must be at least {min} characters"),
            Self::TooLong { max } => write!(f, "must be at most {max} characters"),
            Self::InvalidEmail => write!(f, "must be a valid email address"),
            Self::NonNumeric => write!(f, "must contain digits only"),
            Self::NotANumber => write!(f, "must be a number"),
            Self::Flagged(reason) => write!(f, "{reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: &'static str,
    pub error: FieldError,
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub default: String,
    pub rules: Vec<Rule>,
    /// Business identity key; locked while editing an existing record.
    pub identity: bool,
}

impl FieldSpec {
    pub fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            default: String::new(),
            rules: Vec::new(),
            identity: false,
        }
    }

    pub fn text(name: &'static str) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub fn integer(name: &'static str) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    pub fn decimal(name: &'static str) -> Self {
        Self::new(name, FieldKind::Decimal)
    }

    pub fn boolean(name: &'static str) -> Self {
        Self::new(name, FieldKind::Boolean).default_value("false")
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = value.into();
        self
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn required(self) -> Self {
        self.rule(Rule::Required)
    }

    pub fn identity(mut self) -> Self {
        self.identity = true;
        self
    }

    pub fn is_required(&self) -> bool {
        self.rules.contains(&Rule::Required)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FormSpec {
    fields: Vec<FieldSpec>,
    resets: Vec<(&'static str, &'static str)>,
}

impl FormSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// A user edit of `trigger` clears `target` and its warning.
    pub fn reset_on_change(mut self, trigger: &'static str, target: &'static str) -> Self {
        self.resets.push((trigger, target));
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FieldState {
    value: String,
    enabled: bool,
    touched: bool,
    warning: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Form {
    spec: FormSpec,
    state: BTreeMap<&'static str, FieldState>,
}

impl Form {
    pub fn new(spec: FormSpec) -> Self {
        let mut form = Self {
            spec,
            state: BTreeMap::new(),
        };
        form.reset();
        form
    }

    pub fn spec(&self) -> &FormSpec {
        &self.spec
    }

    pub fn reset(&mut self) {
        self.state = self
            .spec
            .fields
            .iter()
            .map(|field| {
                (
                    field.name,
                    FieldState {
                        value: field.default.clone(),
                        enabled: true,
                        touched: false,
                        warning: None,
                    },
                )
            })
            .collect();
    }

    /// Fills fields from a record without running dependent resets.
    pub fn patch(&mut self, record: &Value) {
        let Some(object) = record.as_object() else {
            return;
        };
        for (name, field) in self.state.iter_mut() {
            if let Some(value) = object.get(*name) {
                field.value = value_to_text(value);
            }
        }
    }

    /// A user edit. Returns false for unknown or disabled fields, which
    /// are left untouched.
    pub fn set_value(&mut self, name: &str, value: impl Into<String>) -> bool {
        let value = value.into();
        let Some(field) = self.state.get_mut(name).filter(|field| field.enabled) else {
            return false;
        };
        let changed = field.value != value;
        field.value = value;
        field.warning = None;

        if changed {
            let targets: Vec<&'static str> = self
                .spec
                .resets
                .iter()
                .filter(|(trigger, _)| *trigger == name)
                .map(|(_, target)| *target)
                .collect();
            for target in targets {
                if let Some(dependent) = self.state.get_mut(target).filter(|field| field.enabled) {
                    dependent.value.clear();
                    dependent.warning = None;
                }
            }
        }
        true
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.state.get(name).map(|field| field.value.as_str())
    }

    pub fn set_enabled(&mut self, name: &str, enabled: bool) {
        if let Some(field) = self.state.get_mut(name) {
            field.enabled = enabled;
        }
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.state.get(name).is_some_and(|field| field.enabled)
    }

    pub fn set_identity_enabled(&mut self, enabled: bool) {
        let identity: Vec<&'static str> = self
            .spec
            .fields
            .iter()
            .filter(|field| field.identity)
            .map(|field| field.name)
            .collect();
        for name in identity {
            self.set_enabled(name, enabled);
        }
    }

    pub fn touch(&mut self, name: &str) {
        if let Some(field) = self.state.get_mut(name) {
            field.touched = true;
        }
    }

    pub fn mark_all_touched(&mut self) {
        for field in self.state.values_mut() {
            field.touched = true;
        }
    }

    pub fn is_touched(&self, name: &str) -> bool {
        self.state.get(name).is_some_and(|field| field.touched)
    }

    pub fn set_warning(&mut self, name: &str, warning: impl Into<String>) {
        if let Some(field) = self.state.get_mut(name) {
            field.warning = Some(warning.into());
        }
    }

    pub fn clear_warning(&mut self, name: &str) {
        if let Some(field) = self.state.get_mut(name) {
            field.warning = None;
        }
    }

    pub fn warning(&self, name: &str) -> Option<&str> {
        self.state.get(name).and_then(|field| field.warning.as_deref())
    }

    /// Disabled fields are skipped; a warning blocks submission like an error.
    pub fn validate(&self) -> Vec<FieldIssue> {
        let mut issues = Vec::new();
        for spec in &self.spec.fields {
            let Some(state) = self.state.get(spec.name) else {
                continue;
            };
            if !state.enabled {
                continue;
            }
            for error in self.field_errors(spec, state) {
                issues.push(FieldIssue {
                    field: spec.name,
                    error,
                });
            }
        }
        issues
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Errors a renderer should show next to `name`: only once touched.
    pub fn visible_errors(&self, name: &str) -> Vec<FieldError> {
        match (self.spec.get(name), self.state.get(name)) {
            (Some(spec), Some(state)) if state.touched && state.enabled => {
                self.field_errors(spec, state)
            }
            _ => Vec::new(),
        }
    }

    fn field_errors(&self, spec: &FieldSpec, state: &FieldState) -> Vec<FieldError> {
        let value = state.value.trim();
        let mut errors = Vec::new();

        if value.is_empty() {
            if spec.is_required() {
                errors.push(FieldError::Required);
            }
            return errors;
        }

        match spec.kind {
            FieldKind::Integer if value.parse::<i64>().is_err() => {
                errors.push(FieldError::NotANumber)
            }
            FieldKind::Decimal if value.parse::<f64>().map_or(true, |n| !n.is_finite()) => {
                errors.push(FieldError::NotANumber)
            }
            _ => {}
        }

        for rule in &spec.rules {
            let error = match rule {
                Rule::Required => None,
                Rule::MinLength(min) => (value.chars().count() < *min)
                    .then_some(FieldError::TooShort { min: *min }),
                Rule::MaxLength(max) => (value.chars().count() > *max)
                    .then_some(FieldError::TooLong { max: *max }),
                Rule::Email => (!is_email(value)).then_some(FieldError::InvalidEmail),
                Rule::Numeric => {
                    (!value.chars().all(|c| c.is_ascii_digit())).then_some(FieldError::NonNumeric)
                }
                Rule::Identification { type_field } => {
                    identification_error(self.value(type_field).unwrap_or_default(), value)
                }
            };
            errors.extend(error);
        }

        if let Some(warning) = &state.warning {
            errors.push(FieldError::Flagged(warning.clone()));
        }
        errors
    }

    /// JSON body of the enabled fields, typed by `FieldKind`. Empty
    /// optional fields are sent as `null`.
    pub fn payload(&self) -> Value {
        let mut body = Map::new();
        for spec in &self.spec.fields {
            let Some(state) = self.state.get(spec.name) else {
                continue;
            };
            if !state.enabled {
                continue;
            }
            body.insert(spec.name.to_string(), typed_value(spec, &state.value));
        }
        Value::Object(body)
    }
}

/// Cross-field rule for identification numbers. Empty values pass; the
/// `Required` rule owns emptiness.
pub fn identification_error(type_code: &str, value: &str) -> Option<FieldError> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let numeric_only = IdentificationType::from_code(type_code).requires_numeric_value();
    (numeric_only && !value.chars().all(|c| c.is_ascii_digit())).then_some(FieldError::NonNumeric)
}

fn is_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn typed_value(spec: &FieldSpec, raw: &str) -> Value {
    let raw = raw.trim();
    if raw.is_empty() {
        return match spec.kind {
            FieldKind::Text if spec.is_required() => Value::String(String::new()),
            FieldKind::Boolean => Value::Bool(false),
            _ => Value::Null,
        };
    }
    match spec.kind {
        FieldKind::Text => Value::String(raw.to_string()),
        FieldKind::Integer => raw
            .parse::<i64>()
            .map_or(Value::Null, |n| Value::Number(n.into())),
        FieldKind::Decimal => raw
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map_or(Value::Null, Value::Number),
        FieldKind::Boolean => Value::Bool(matches!(
            raw.to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "on"
        )),
    }
}

#[cfg(test)]
#[path = "tests/form_tests.rs"]
mod tests;
