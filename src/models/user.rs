use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque id handed out by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        UserId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity injected into request extensions by the auth middleware.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: UserId,
    // may remove catalog listings
    pub is_admin: bool,
}

impl CurrentUser {
    pub fn new(id: impl Into<String>) -> Self {
        CurrentUser {
            id: UserId::new(id),
            is_admin: false,
        }
    }

    pub fn admin(id: impl Into<String>) -> Self {
        CurrentUser {
            id: UserId::new(id),
            is_admin: true,
        }
    }
}
