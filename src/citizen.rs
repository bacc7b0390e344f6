//! Citizen registry with an administrator-gated approval workflow
//!
//! Records are keyed by public key. A record starts `Pending` and moves
//! exactly once, to `Approved` or `Rejected`.

use crate::crypto::content_id;
use crate::error::{ChainError, Result};
use crate::policy::{AuthorizationPolicy, Permission};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CitizenStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citizen {
    pub id: String,
    pub public_key: String,
    pub name: String,
    pub date_of_birth: String,
    pub register_date: DateTime<Utc>,
    pub status: CitizenStatus,
    /// Administrator who processed the registration (approval or rejection)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_date: Option<DateTime<Utc>>,
}

impl Citizen {
    pub fn is_approved(&self) -> bool {
        self.status == CitizenStatus::Approved
    }
}

pub struct CitizenRegistry {
    /// Public key → record
    citizens: RwLock<HashMap<String, Citizen>>,
    policy: Arc<dyn AuthorizationPolicy>,
}

impl CitizenRegistry {
    pub fn new(policy: Arc<dyn AuthorizationPolicy>) -> Self {
        Self {
            citizens: RwLock::new(HashMap::new()),
            policy,
        }
    }

    /// Fails with `NotAuthorized` unless `identity` holds `permission`.
    pub fn authorize(&self, identity: &str, permission: Permission) -> Result<()> {
        if self.policy.permits(identity, permission) {
            Ok(())
        } else {
            Err(ChainError::NotAuthorized(format!(
                "{} lacks {:?}",
                identity, permission
            )))
        }
    }

    pub fn register(&self, name: &str, date_of_birth: &str, public_key: &str) -> Result<Citizen> {
        let mut citizens = self.citizens.write();

        if citizens.contains_key(public_key) {
            return Err(ChainError::AlreadyRegistered(public_key.to_string()));
        }

        let citizen = Citizen {
            id: content_id(name, public_key),
            public_key: public_key.to_string(),
            name: name.to_string(),
            date_of_birth: date_of_birth.to_string(),
            register_date: Utc::now(),
            status: CitizenStatus::Pending,
            approved_by: None,
            approval_date: None,
        };

        citizens.insert(public_key.to_string(), citizen.clone());
        info!(citizen_id = %citizen.id, "citizen.registered");
        Ok(citizen)
    }

    pub fn approve(&self, citizen_id: &str, approver_key: &str) -> Result<Citizen> {
        self.process(citizen_id, approver_key, CitizenStatus::Approved)
    }

    pub fn reject(&self, citizen_id: &str, approver_key: &str) -> Result<Citizen> {
        self.process(citizen_id, approver_key, CitizenStatus::Rejected)
    }

    fn process(&self, citizen_id: &str, approver_key: &str, outcome: CitizenStatus) -> Result<Citizen> {
        let mut citizens = self.citizens.write();

        self.authorize(approver_key, Permission::ApproveCitizens)?;

        let citizen = citizens
            .values_mut()
            .find(|c| c.id == citizen_id)
            .ok_or_else(|| ChainError::NotFound(format!("citizen {}", citizen_id)))?;

        if citizen.status != CitizenStatus::Pending {
            return Err(ChainError::AlreadyProcessed(citizen_id.to_string()));
        }

        citizen.status = outcome;
        citizen.approved_by = Some(approver_key.to_string());
        citizen.approval_date = Some(Utc::now());

        info!(citizen_id = %citizen.id, status = ?outcome, "citizen.processed");
        Ok(citizen.clone())
    }

    pub fn get_citizen(&self, public_key: &str) -> Option<Citizen> {
        self.citizens.read().get(public_key).cloned()
    }

    /// Every record, oldest registration first.
    pub fn all_citizens(&self) -> Vec<Citizen> {
        let mut citizens: Vec<Citizen> = self.citizens.read().values().cloned().collect();
        citizens.sort_by(|a, b| {
            a.register_date
                .cmp(&b.register_date)
                .then_with(|| a.id.cmp(&b.id))
        });
        citizens
    }

    /// True iff a record exists for `public_key` and it is approved.
    pub fn is_approved_citizen(&self, public_key: &str) -> bool {
        self.citizens
            .read()
            .get(public_key)
            .is_some_and(Citizen::is_approved)
    }
}
