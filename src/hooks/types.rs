//! Core types for the hook broker

use serde::{Deserialize, Serialize};
use std::fmt;

/// The catch-all tag whose callbacks run on every dispatch
pub const ALL_TAG: &str = "all";

/// Default number of leading arguments a callback receives
pub const DEFAULT_ACCEPTED_ARGS: usize = 1;

/// Callback ordering key within a tag. Lower runs earlier, negatives allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HookPriority(pub i32);

impl HookPriority {
    pub const FIRST: Self = Self(i32::MIN);
    pub const DEFAULT: Self = Self(10);
    pub const LAST: Self = Self(i32::MAX);
}

impl Default for HookPriority {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<i32> for HookPriority {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl fmt::Display for HookPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a dispatch chains return values or discards them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchKind {
    Filter,
    Action,
}

impl fmt::Display for DispatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filter => write!(f, "filter"),
            Self::Action => write!(f, "action"),
        }
    }
}

/// Tags fired by the request router and the install/upgrade scripts
pub mod tags {
    // Request routing
    pub const DO_PARSE_REQUEST: &str = "do_parse_request";
    pub const QUERY_VARS: &str = "query_vars";
    pub const REQUEST: &str = "request";
    pub const PARSE_REQUEST: &str = "parse_request";
    pub const HQ_HEADERS: &str = "hq_headers";
    pub const SEND_HEADERS: &str = "send_headers";
    pub const QUERY_STRING: &str = "query_string";
    pub const HQ: &str = "hq";

    // Install and upgrade
    pub const HQ_INSTALL: &str = "hq_install";
    pub const HQ_UPGRADE: &str = "hq_upgrade";
    pub const DBDELTA_QUERIES: &str = "dbdelta_queries";
    pub const DBDELTA_CREATE_QUERIES: &str = "dbdelta_create_queries";
    pub const DBDELTA_INSERT_QUERIES: &str = "dbdelta_insert_queries";
    pub const SHOULD_UPGRADE_GLOBAL_TABLES: &str = "hq_should_upgrade_global_tables";

    // Plugin lifecycle prefixes, joined with a plugin basename
    pub const ACTIVATE_PREFIX: &str = "activate_";
    pub const DEACTIVATE_PREFIX: &str = "deactivate_";
    pub const UNINSTALL_PREFIX: &str = "uninstall_";
}
