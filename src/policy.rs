//! Authorization policy for administrative actions
//!
//! The registry and election system never hard-code who may act as an
//! administrator; they ask an injected [`AuthorizationPolicy`].

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Identity seeded as the sole administrator of a default chain.
pub const GENESIS_ADMIN: &str = "GENESIS_ADMIN";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    /// Approve or reject pending citizen registrations
    ApproveCitizens,
    /// Administrative override of the election lifecycle (cancellation)
    ManageElections,
}

impl Permission {
    pub const ALL: [Permission; 2] = [Permission::ApproveCitizens, Permission::ManageElections];
}

pub trait AuthorizationPolicy: Send + Sync {
    fn permits(&self, identity: &str, permission: Permission) -> bool;
}

/// Identity → permission set allow-list.
#[derive(Debug, Clone, Default)]
pub struct AdminAllowList {
    grants: HashMap<String, HashSet<Permission>>,
}

impl AdminAllowList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow-list holding only [`GENESIS_ADMIN`] with every permission.
    pub fn genesis() -> Self {
        Self::with_admins([GENESIS_ADMIN])
    }

    /// Every listed identity receives every permission.
    pub fn with_admins<I, S>(admins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list = Self::new();
        for admin in admins {
            list = list.grant_all(admin);
        }
        list
    }

    pub fn grant(mut self, identity: impl Into<String>, permission: Permission) -> Self {
        self.grants
            .entry(identity.into())
            .or_default()
            .insert(permission);
        self
    }

    pub fn grant_all(mut self, identity: impl Into<String>) -> Self {
        self.grants
            .entry(identity.into())
            .or_default()
            .extend(Permission::ALL);
        self
    }
}

impl AuthorizationPolicy for AdminAllowList {
    fn permits(&self, identity: &str, permission: Permission) -> bool {
        self.grants
            .get(identity)
            .is_some_and(|perms| perms.contains(&permission))
    }
}
