//! Validation of request payloads
//!
//! A [`Schema`] turns a raw JSON value into a typed request, collecting every
//! field-level problem on the way. Failures are rendered into the short
//! human-readable messages returned to API clients.

use serde_json::{Map, Value};

use crate::core::response::ApiError;

/// Kind of problem found on a single field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    /// Field is absent or null
    Required,
    /// Field has the wrong JSON type (`string`, `object`)
    InvalidType { expected: &'static str },
    /// Field is not a valid email address
    InvalidEmail,
    /// Field does not match its expected format
    InvalidFormat,
    /// String is shorter than allowed
    TooShort { min: usize },
    /// String is longer than allowed
    TooLong { max: usize },
}

/// A single failed check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub path: String,
    pub kind: IssueKind,
}

impl FieldIssue {
    pub fn new(path: impl Into<String>, kind: IssueKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

impl std::fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let field = &self.path;
        match &self.kind {
            IssueKind::Required => write!(f, "{field} is required"),
            IssueKind::InvalidType { expected } => write!(f, "{field} must be a {expected}"),
            IssueKind::InvalidEmail => write!(f, "{field} must be a valid email address"),
            IssueKind::InvalidFormat => write!(f, "{field} is invalid"),
            IssueKind::TooShort { min } => write!(f, "{field} must be at least {min} characters"),
            IssueKind::TooLong { max } => write!(f, "{field} cannot exceed {max} characters"),
        }
    }
}

/// Ordered list of issues produced by a failed parse
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationFailure {
    pub issues: Vec<FieldIssue>,
}

impl ValidationFailure {
    pub fn single(path: impl Into<String>, kind: IssueKind) -> Self {
        Self {
            issues: vec![FieldIssue::new(path, kind)],
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }

    /// One issue yields its own text; several are joined after a prefix
    pub fn message(&self) -> String {
        match self.issues.as_slice() {
            [] => "Validation error".to_string(),
            [issue] => issue.to_string(),
            _ => format!("Validation failed: {}", self.messages().join(", ")),
        }
    }

    /// Per-issue messages, present only when there is more than one issue
    pub fn details(&self) -> Option<Vec<String>> {
        (self.issues.len() > 1).then(|| self.messages())
    }
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ValidationFailure {}

impl From<ValidationFailure> for ApiError {
    fn from(failure: ValidationFailure) -> Self {
        let error = ApiError::bad_request(failure.message());
        match failure.details() {
            Some(details) => error.with_details(details),
            None => error,
        }
    }
}

/// Types that can be parsed and checked from a JSON facet of a request
pub trait Schema: Sized {
    fn parse(value: &Value) -> Result<Self, ValidationFailure>;
}

/// Length bounds for a string field, counted in Unicode scalar values
#[derive(Debug, Clone, Copy, Default)]
pub struct Length {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Length {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn at_least(min: usize) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    pub fn between(min: usize, max: usize) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }
}

/// Field-by-field checker over a JSON object.
///
/// Every accessor records its issues and keeps going, so a single pass
/// reports all problems in field order.
pub struct ObjectValidator<'a> {
    fields: &'a Map<String, Value>,
    issues: Vec<FieldIssue>,
}

impl<'a> ObjectValidator<'a> {
    /// Start validating `value`, which must be a JSON object
    pub fn new(value: &'a Value, root: &str) -> Result<Self, ValidationFailure> {
        match value {
            Value::Object(fields) => Ok(Self {
                fields,
                issues: Vec::new(),
            }),
            Value::Null => Err(ValidationFailure::single(root, IssueKind::Required)),
            _ => Err(ValidationFailure::single(
                root,
                IssueKind::InvalidType { expected: "object" },
            )),
        }
    }

    fn present(&self, name: &str) -> Option<&'a Value> {
        self.fields.get(name).filter(|value| !value.is_null())
    }

    fn push(&mut self, name: &str, kind: IssueKind) {
        self.issues.push(FieldIssue::new(name, kind));
    }

    fn check_string(&mut self, name: &str, value: &'a Value, length: Length) -> Option<String> {
        let Some(text) = value.as_str() else {
            self.push(name, IssueKind::InvalidType { expected: "string" });
            return None;
        };

        let count = text.chars().count();
        let mut ok = true;
        if let Some(min) = length.min
            && count < min
        {
            self.push(name, IssueKind::TooShort { min });
            ok = false;
        }
        if let Some(max) = length.max
            && count > max
        {
            self.push(name, IssueKind::TooLong { max });
            ok = false;
        }

        ok.then(|| text.to_string())
    }

    /// Required string within `length`
    pub fn string(&mut self, name: &str, length: Length) -> Option<String> {
        match self.present(name) {
            Some(value) => self.check_string(name, value, length),
            None => {
                self.push(name, IssueKind::Required);
                None
            }
        }
    }

    /// Optional string; absent and null both mean "not provided".
    /// An invalid value is recorded and also yields `None`.
    pub fn optional_string(&mut self, name: &str, length: Length) -> Option<String> {
        let value = self.present(name)?;
        self.check_string(name, value, length)
    }

    fn check_email(&mut self, name: &str, value: &'a Value) -> Option<String> {
        let email = self.check_string(name, value, Length::any())?;
        if is_valid_email(&email) {
            Some(email)
        } else {
            self.push(name, IssueKind::InvalidEmail);
            None
        }
    }

    /// Required email address
    pub fn email(&mut self, name: &str) -> Option<String> {
        match self.present(name) {
            Some(value) => self.check_email(name, value),
            None => {
                self.push(name, IssueKind::Required);
                None
            }
        }
    }

    /// Optional email address
    pub fn optional_email(&mut self, name: &str) -> Option<String> {
        let value = self.present(name)?;
        self.check_email(name, value)
    }

    /// Required string accepted only if `pattern` holds
    pub fn matching(&mut self, name: &str, pattern: impl Fn(&str) -> bool) -> Option<String> {
        let text = self.string(name, Length::any())?;
        if pattern(&text) {
            Some(text)
        } else {
            self.push(name, IssueKind::InvalidFormat);
            None
        }
    }

    /// Leading integer of a number or string field, read like JavaScript's
    /// `parseInt` (`"2.5"` is 2, `" 7px"` is 7). Absent and unparsable values
    /// are `None` and never count as an issue.
    pub fn leading_integer(&self, name: &str) -> Option<i64> {
        match self.present(name)? {
            Value::Number(number) => number
                .as_i64()
                .or_else(|| number.as_f64().map(|float| float.trunc() as i64)),
            Value::String(text) => parse_leading_integer(text),
            _ => None,
        }
    }

    /// Finish validation, yielding `parsed` only if no issue was recorded
    pub fn finish<T>(self, parsed: Option<T>) -> Result<T, ValidationFailure> {
        if !self.issues.is_empty() {
            return Err(ValidationFailure {
                issues: self.issues,
            });
        }
        parsed.ok_or_else(ValidationFailure::default)
    }
}

/// Email check: dotted local part without `..`, one `@`, and a domain of
/// alphanumeric labels ending in an alphabetic TLD of two or more letters.
pub fn is_valid_email(email: &str) -> bool {
    if email.contains("..") {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    let local_ok = !local.is_empty()
        && !local.starts_with('.')
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '\'' | '+' | '-' | '.'))
        && local
            .chars()
            .last()
            .is_some_and(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-'));
    if !local_ok {
        return false;
    }

    let Some((labels, tld)) = domain.rsplit_once('.') else {
        return false;
    };

    let tld_ok = tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic());
    let labels_ok = labels.split('.').all(|label| {
        label
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric())
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });

    tld_ok && labels_ok
}

/// Optional sign followed by at least one digit, after leading whitespace.
/// Anything after the digits is ignored; out-of-range values saturate.
pub fn parse_leading_integer(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let (negative, rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }

    let magnitude = rest[..end].bytes().fold(0i64, |acc, digit| {
        acc.saturating_mul(10)
            .saturating_add(i64::from(digit - b'0'))
    });
    Some(if negative { -magnitude } else { magnitude })
}

/// Exactly 24 hexadecimal digits, either case
pub fn is_object_id(value: &str) -> bool {
    value.len() == 24 && value.chars().all(|c| c.is_ascii_hexdigit())
}
