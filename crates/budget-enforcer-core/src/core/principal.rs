// crates/budget-enforcer-core/src/core/principal.rs
// ============================================================================
// Module: Identity Principals
// Description: IAM users and groups targeted by an enforcement sweep.
// Purpose: Give the sweep a single principal type for both listings.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A principal is an IAM user or group identified by its name. The sweep never
//! owns principal lifecycle; it only attaches a policy reference to them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Principal category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    /// IAM user.
    User,
    /// IAM group.
    Group,
}

impl PrincipalKind {
    /// Returns the stable label for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Group => "group",
        }
    }
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// IAM user or group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Principal {
    /// Principal category.
    pub kind: PrincipalKind,
    /// User or group name.
    pub name: String,
}

impl Principal {
    /// Creates a user principal.
    #[must_use]
    pub fn user(name: impl Into<String>) -> Self {
        Self {
            kind: PrincipalKind::User,
            name: name.into(),
        }
    }

    /// Creates a group principal.
    #[must_use]
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            kind: PrincipalKind::Group,
            name: name.into(),
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}
