//! Ordered, case-insensitive HTTP header multimap.

use std::fmt;

pub use http::header;

use crate::{Error, Result};

/// HTTP header fields in insertion order.
///
/// Names compare ASCII case-insensitively and keep the casing they were
/// added with. A name may appear more than once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Creates an empty header set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Builds headers from name/value pairs, validating each one.
    pub fn from_pairs<N, V>(pairs: impl IntoIterator<Item = (N, V)>) -> Result<Self>
    where
        N: Into<String>,
        V: Into<String>,
    {
        let mut headers = Self::new();
        for (name, value) in pairs {
            headers.add(name, value)?;
        }
        Ok(headers)
    }

    /// The last value for `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Every value for `name`, in insertion order.
    #[must_use]
    pub fn values(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .collect()
    }

    /// Returns `true` if at least one value exists for `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries
            .iter()
            .any(|(key, _)| key.eq_ignore_ascii_case(name))
    }

    /// Number of fields, counting repeated names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Appends a field, keeping existing values for the same name.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let name = name.into();
        let value = value.into();
        check_name(&name)?;
        check_value(&name, &value)?;
        self.entries.push((name, value));
        Ok(())
    }

    /// Replaces every value for `name` with a single one.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let name = name.into();
        self.remove(&name);
        self.add(name, value)
    }

    /// Removes every value for `name`.
    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
    }

    /// The declared `Content-Length`, or `-1` when absent or malformed.
    #[must_use]
    pub fn content_length(&self) -> i64 {
        self.get(header::CONTENT_LENGTH.as_str())
            .and_then(|value| value.trim().parse::<i64>().ok())
            .filter(|length| *length >= 0)
            .unwrap_or(-1)
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.entries {
            writeln!(f, "{name}: {value}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = (&'a str, &'a str);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a str)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_request("header name is empty"));
    }
    if let Some(c) = name.chars().find(|c| *c <= ' ' || *c >= '\u{7f}' || *c == ':') {
        return Err(Error::invalid_request(format!(
            "unexpected char {:#04x} in header name: {name}",
            u32::from(c)
        )));
    }
    Ok(())
}

fn check_value(name: &str, value: &str) -> Result<()> {
    if let Some(c) = value
        .chars()
        .find(|c| (*c < ' ' && *c != '\t') || *c == '\u{7f}')
    {
        return Err(Error::invalid_request(format!(
            "unexpected char {:#04x} in {name} value",
            u32::from(c)
        )));
    }
    Ok(())
}
