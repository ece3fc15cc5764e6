// ABOUTME: DNS-compatible subdomain validation.
// ABOUTME: Ensures requested subdomains follow RFC 1123 label requirements.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubdomainError {
    #[error("subdomain cannot be empty")]
    Empty,

    #[error("subdomain exceeds maximum length of 63 characters")]
    TooLong,

    #[error("subdomain cannot start with a hyphen")]
    StartsWithHyphen,

    #[error("subdomain cannot end with a hyphen")]
    EndsWithHyphen,

    #[error("invalid character in subdomain: '{0}'")]
    InvalidChar(char),
}

/// A single DNS label requested by a caller, normalized to lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subdomain(String);

impl Subdomain {
    pub fn new(value: &str) -> Result<Self, SubdomainError> {
        let value = value.trim().to_ascii_lowercase();

        if value.is_empty() {
            return Err(SubdomainError::Empty);
        }

        if value.len() > 63 {
            return Err(SubdomainError::TooLong);
        }

        if value.starts_with('-') {
            return Err(SubdomainError::StartsWithHyphen);
        }

        if value.ends_with('-') {
            return Err(SubdomainError::EndsWithHyphen);
        }

        if let Some(c) = value
            .chars()
            .find(|c| !c.is_ascii_lowercase() && !c.is_ascii_digit() && *c != '-')
        {
            return Err(SubdomainError::InvalidChar(c));
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Subdomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
