//! Route partitions: which role, if any, a path belongs to.

use refugio_api::Role;

/// Root of the public login area.
pub const LOGIN_ROUTE: &str = "/login";

/// Which part of the site a path falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    /// Reachable by anyone.
    Public,
    /// `/login` and everything under it. Public, and never bounced for
    /// authenticated callers (registration lives here).
    Login,
    /// Reserved for one role.
    Protected(Role),
}

impl Partition {
    /// Role required to enter, if any.
    pub fn required_role(self) -> Option<Role> {
        match self {
            Partition::Protected(role) => Some(role),
            Partition::Public | Partition::Login => None,
        }
    }
}

/// Classify `path` by plain prefix, the same way for every request.
///
/// The role prefixes do not overlap each other or `/login`, so at most one
/// partition matches. Prefix matching is intentionally byte-wise: anything
/// that merely starts with a role root is still treated as protected.
pub fn classify(path: &str) -> Partition {
    if let Some(role) = Role::ALL
        .into_iter()
        .find(|role| path.starts_with(role.home_route()))
    {
        return Partition::Protected(role);
    }
    if path.starts_with(LOGIN_ROUTE) {
        return Partition::Login;
    }
    Partition::Public
}
