//! Path parameter module
//!
//! Splits the part of a path that follows a prefix route into its
//! `/`-separated segments and converts them to typed values.

use std::fmt::Display;
use std::str::FromStr;

use crate::error::ApiError;

/// Percent-decoded segments following a prefix pattern
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PathParams {
    segments: Vec<String>,
}

impl PathParams {
    /// Split `rest` on `/` and require exactly `expected` segments.
    pub fn extract(rest: &str, expected: usize) -> Result<Self, ApiError> {
        let raw: Vec<&str> = rest.split('/').collect();
        if raw.len() != expected {
            return Err(ApiError::bad_request("Invalid URL"));
        }

        let segments = raw
            .into_iter()
            .map(|segment| {
                urlencoding::decode(segment)
                    .map(std::borrow::Cow::into_owned)
                    .map_err(|e| ApiError::bad_request(format!("Invalid URL: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { segments })
    }

    /// Segment as text
    pub fn text(&self, index: usize) -> &str {
        self.segments.get(index).map_or("", String::as_str)
    }

    /// Segment converted to a number; `name` labels the error message
    pub fn number<T>(&self, index: usize, name: &str) -> Result<T, ApiError>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.text(index)
            .parse()
            .map_err(|e| ApiError::bad_request(format!("Invalid {name}: {e}")))
    }
}
