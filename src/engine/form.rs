//! engine::form
//!
//! Submitted form fields.
//!
//! # Conventions
//!
//! - `submit` names the operation; a `-confirmed` suffix on its value
//!   marks the confirmation variant (`submit=delete-confirmed`)
//! - `<op>-confirmed` with a truthy value also confirms
//! - Operation-scoped fields are prefixed with the operation key and a `~`
//!   (`copy~dst-fsid`, `create-page~dst-archetype`, `change~title`)
//! - `return=directory` sends a successful operation back to the parent
//!   directory listing
//!
//! Truthy values are `1`, `true`, `yes`, `on` and `y`, case-insensitive.
//! Anything else, including an empty value, is false.

use std::collections::BTreeMap;

use thiserror::Error;

/// Suffix marking the confirmation variant of an operation key.
pub const CONFIRMED_SUFFIX: &str = "-confirmed";

/// Errors from parsing form input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    /// A field was not `key=value`.
    #[error("expected key=value, got '{0}'")]
    Malformed(String),

    /// A field had an empty key.
    #[error("empty field name in '{0}'")]
    EmptyKey(String),
}

/// The operation requested by `submit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submit {
    /// Operation key with any confirmation suffix removed.
    pub key: String,
    /// Whether the submit value carried the confirmation suffix.
    pub confirmed: bool,
}

/// Whether a form value counts as "yes".
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on" | "y"
    )
}

/// Submitted form fields. Later values for the same key win.
///
/// # Example
///
/// ```
/// use editflow::engine::form::Form;
///
/// let form = Form::new()
///     .with("submit", "delete-confirmed")
///     .with("return", "directory");
/// let submit = form.submit().unwrap();
/// assert_eq!(submit.key, "delete");
/// assert!(submit.confirmed);
/// assert!(form.returns_to_directory());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    fields: BTreeMap<String, String>,
}

impl Form {
    /// Create an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set a field.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set a field.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Parse one `key=value` pair. The value may be empty or contain `=`.
    pub fn parse_pair(input: &str) -> Result<(String, String), FormError> {
        let (key, value) = input
            .split_once('=')
            .ok_or_else(|| FormError::Malformed(input.to_string()))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(FormError::EmptyKey(input.to_string()));
        }
        Ok((key.to_string(), value.to_string()))
    }

    /// A field's raw value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// A field's value, trimmed, or `None` if missing or blank.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.get(key).map(str::trim).filter(|v| !v.is_empty())
    }

    /// Whether a field is present and truthy.
    pub fn is_truthy(&self, key: &str) -> bool {
        self.get(key).is_some_and(is_truthy)
    }

    /// The requested operation.
    pub fn submit(&self) -> Option<Submit> {
        let raw = self.value("submit")?;
        Some(match raw.strip_suffix(CONFIRMED_SUFFIX) {
            Some(key) => Submit {
                key: key.to_string(),
                confirmed: true,
            },
            None => Submit {
                key: raw.to_string(),
                confirmed: false,
            },
        })
    }

    /// Whether `return=directory` was submitted.
    pub fn returns_to_directory(&self) -> bool {
        self.value("return") == Some("directory")
    }

    /// An operation-scoped field: `<op>~<name>`.
    pub fn scoped(&self, op: &str, name: &str) -> Option<&str> {
        self.value(&format!("{op}~{name}"))
    }

    /// Every `<op>~<name>` field, as `(name, value)`.
    pub fn scoped_fields<'a>(&'a self, op: &str) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        let prefix = format!("{op}~");
        self.fields.iter().filter_map(move |(k, v)| {
            k.strip_prefix(prefix.as_str())
                .filter(|name| !name.is_empty())
                .map(|name| (name, v.as_str()))
        })
    }

    /// Iterate over all fields.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Form {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut form = Form::new();
        for (k, v) in iter {
            form.insert(k, v);
        }
        form
    }
}
