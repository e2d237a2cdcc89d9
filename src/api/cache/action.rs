//! Cache management actions carried in the query string

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::domain::DomainError;

/// Query parameter naming the action, e.g. `?cachetop=flush`
pub const ACTION_PARAM: &str = "cachetop";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    /// Delete the current page's entry
    Clear,
    /// Same as `Clear`
    Flush,
    /// Flush the whole store
    FlushAll,
}

impl CacheAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheAction::Clear => "clear",
            CacheAction::Flush => "flush",
            CacheAction::FlushAll => "flush-all",
        }
    }

    /// Finds a recognised action in a query string. Unknown values are ignored.
    pub fn from_query(query: Option<&str>) -> Option<Self> {
        query?
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(name, _)| *name == ACTION_PARAM)
            .and_then(|(_, value)| value.parse().ok())
    }
}

impl fmt::Display for CacheAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "clear" => Ok(CacheAction::Clear),
            "flush" => Ok(CacheAction::Flush),
            "flush-all" => Ok(CacheAction::FlushAll),
            other => Err(DomainError::validation(format!(
                "Unknown cache action: {}",
                other
            ))),
        }
    }
}

/// Removes the action parameter, returning what is left of the query
pub fn strip_action(query: Option<&str>) -> Option<String> {
    let rest: Vec<&str> = query?
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| pair.split('=').next() != Some(ACTION_PARAM))
        .collect();

    if rest.is_empty() {
        None
    } else {
        Some(rest.join("&"))
    }
}

/// Body returned after a management action
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ActionResponse {
    pub action: String,
    pub flushed: bool,
}

impl ActionResponse {
    pub fn new(action: CacheAction, flushed: bool) -> Self {
        Self {
            action: action.as_str().to_string(),
            flushed,
        }
    }
}
