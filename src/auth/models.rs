use serde::{Deserialize, Serialize};
use std::fmt;

/// User roles for RBAC.
///
/// The order of variants matters: it defines the privilege hierarchy.
/// `User` is the least privileged, `Admin` is the most.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Registered reader (comments, bookmarks).
    #[default]
    User = 0,
    /// Can manage blog posts, deal models and comments.
    Editor = 1,
    /// Full administrative access, including users and settings.
    Admin = 2,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Editor => write!(f, "editor"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl Role {
    /// Returns `true` if `self` has at least the required role.
    pub fn has_access(&self, required: Role) -> bool {
        *self >= required
    }

    /// Editors and admins may manage content.
    pub fn is_staff(&self) -> bool {
        self.has_access(Role::Editor)
    }
}

/// Claims carried by the signed session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id.
    pub sub: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    /// Issued at (Unix seconds).
    pub iat: i64,
    /// Expiry (Unix seconds).
    pub exp: i64,
}
