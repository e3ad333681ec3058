use std::fmt;

use regex::Regex;

use crate::error::{Result, RosterError};

/// What a "find a person" search accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchTerm {
    Email(String),
    /// 8-digit university ID.
    Huid(String),
}

impl SearchTerm {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Email(value) | Self::Huid(value) => value,
        }
    }
}

impl fmt::Display for SearchTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Email(value) => write!(f, "email {value}"),
            Self::Huid(value) => write!(f, "HUID {value}"),
        }
    }
}

#[derive(Debug)]
pub struct SearchTermValidator {
    email: Regex,
    huid: Regex,
}

impl SearchTermValidator {
    pub fn new() -> Result<Self> {
        Ok(Self {
            email: Regex::new(concat!(
                r#"^(?:[^<>()\[\]\\.,;:\s@"]+(?:\.[^<>()\[\]\\.,;:\s@"]+)*|".+")"#,
                r"@(?:\[[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\]",
                r"|(?:[a-zA-Z\-0-9]+\.)+[a-zA-Z]{2,})$",
            ))?,
            huid: Regex::new(r"^[0-9]{8}$")?,
        })
    }

    pub fn parse(&self, raw: &str) -> Result<SearchTerm> {
        let trimmed = raw.trim();
        if self.huid.is_match(trimmed) {
            return Ok(SearchTerm::Huid(trimmed.to_string()));
        }
        if self.email.is_match(trimmed) {
            return Ok(SearchTerm::Email(trimmed.to_string()));
        }
        Err(RosterError::InvalidSearchTerm(trimmed.to_string()))
    }
}
