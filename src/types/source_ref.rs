// ABOUTME: Source repository reference parsing.
// ABOUTME: Handles formats like org/repo and org/repo#branch.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseSourceRefError {
    #[error("source reference cannot be empty")]
    Empty,

    #[error("invalid character in source reference: {0}")]
    InvalidChar(char),

    #[error("invalid source reference format: {0} (expected organization/repository[#branch])")]
    InvalidFormat(String),
}

/// A repository on the source host, optionally pinned to a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    organization: String,
    repository: String,
    branch: Option<String>,
}

impl SourceRef {
    pub fn parse(input: &str) -> Result<Self, ParseSourceRefError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseSourceRefError::Empty);
        }

        let (path, branch) = match input.split_once('#') {
            Some((path, branch)) if !branch.is_empty() => (path, Some(branch)),
            Some(_) => return Err(ParseSourceRefError::InvalidFormat(input.to_string())),
            None => (input, None),
        };

        for c in path.chars() {
            if !c.is_ascii_alphanumeric() && c != '/' && c != '.' && c != '-' && c != '_' {
                return Err(ParseSourceRefError::InvalidChar(c));
            }
        }
        if let Some(branch) = branch
            && let Some(c) = branch.chars().find(|c| {
                !c.is_ascii_alphanumeric() && !matches!(c, '/' | '.' | '-' | '_')
            })
        {
            return Err(ParseSourceRefError::InvalidChar(c));
        }

        let mut parts = path.split('/');
        let (Some(organization), Some(repository), None) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(ParseSourceRefError::InvalidFormat(input.to_string()));
        };
        if organization.is_empty() || repository.is_empty() || repository.starts_with('.') {
            return Err(ParseSourceRefError::InvalidFormat(input.to_string()));
        }

        Ok(Self {
            organization: organization.to_string(),
            repository: repository.trim_end_matches(".git").to_string(),
            branch: branch.map(str::to_string),
        })
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    /// Organization comparison is case-insensitive, matching how source hosts treat owners.
    pub fn belongs_to(&self, organization: &str) -> bool {
        self.organization.eq_ignore_ascii_case(organization)
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.organization, self.repository)?;
        if let Some(branch) = &self.branch {
            write!(f, "#{}", branch)?;
        }
        Ok(())
    }
}
