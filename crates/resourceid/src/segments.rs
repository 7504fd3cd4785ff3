//! Positional access to `/`-separated identifiers.
//!
//! Fields are addressed from the right so that identifiers carrying a
//! longer prefix (for example an `apps/{app}/` import prefix in front of a
//! canonical `paps/...` id) still decode to the same fields.

use crate::error::{Error, Result};

/// Reject values that are empty after trimming whitespace.
pub fn require_non_empty<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    if value.trim().is_empty() {
        return Err(Error::EmptyField {
            field: field.to_string(),
        });
    }
    Ok(value)
}

/// Last `/`-separated segment of a value, or the value itself.
pub fn last_segment(value: &str) -> &str {
    value.rsplit('/').next().unwrap_or(value)
}

pub(crate) struct Segments<'a> {
    id: &'a str,
    parts: Vec<&'a str>,
}

impl<'a> Segments<'a> {
    pub(crate) fn split(id: &'a str, min: usize) -> Result<Self> {
        let parts: Vec<&str> = id.split('/').collect();
        if parts.len() < min {
            return Err(Error::invalid(
                id,
                format!(
                    "expected at least {} segments, found {}",
                    min,
                    parts.len()
                ),
            ));
        }
        Ok(Self { id, parts })
    }

    /// Segment `n` counted from the right, 1-based.
    pub(crate) fn from_right(&self, n: usize) -> &'a str {
        self.parts[self.parts.len() - n]
    }

    pub(crate) fn expect_literal(&self, n: usize, literal: &str) -> Result<()> {
        let found = self.from_right(n);
        if found != literal {
            return Err(Error::invalid(
                self.id,
                format!("expected {literal:?}, found {found:?}"),
            ));
        }
        Ok(())
    }

    pub(crate) fn field(&self, n: usize, name: &str) -> Result<String> {
        let value = self.from_right(n);
        if value.trim().is_empty() {
            return Err(Error::invalid(self.id, format!("{name} is empty")));
        }
        Ok(value.to_string())
    }

    /// Everything strictly between `left` segments from the start and
    /// `right` segments from the end, re-joined with `/`.
    pub(crate) fn middle(&self, left: usize, right: usize, name: &str) -> Result<String> {
        let end = self.parts.len() - right;
        if left >= end {
            return Err(Error::invalid(self.id, format!("{name} is missing")));
        }
        let value = self.parts[left..end].join("/");
        if self.parts[left..end].iter().any(|p| p.trim().is_empty()) {
            return Err(Error::invalid(self.id, format!("{name} is empty")));
        }
        Ok(value)
    }

    pub(crate) fn first(&self) -> &'a str {
        self.parts[0]
    }
}
