//! Single-slot election state machine layered on the citizen registry
//!
//! At most one election is `InProgress`. Ending or cancelling it moves the
//! election into history and frees the slot for the next one.

use crate::citizen::CitizenRegistry;
use crate::crypto::{content_id, sha256_hex};
use crate::error::{ChainError, Result};
use crate::policy::Permission;
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElectionStatus {
    NotStarted,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub public_key: String,
    pub platform: String,
    /// Filled in by the tally when the election ends
    pub vote_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Election {
    pub id: String,
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: ElectionStatus,
    /// Registration order
    pub candidates: Vec<Candidate>,
    /// Voter public key → candidate id
    pub votes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Candidate>,
}

impl Election {
    fn open(name: &str, duration_days: u32, sequence: usize) -> Self {
        let start_date = Utc::now();
        let end_date = start_date
            .checked_add_signed(TimeDelta::days(i64::from(duration_days)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let id = sha256_hex(&[
            name.as_bytes(),
            &start_date.timestamp_nanos_opt().unwrap_or_default().to_le_bytes(),
            &sequence.to_le_bytes(),
        ]);

        Election {
            id,
            name: name.to_string(),
            start_date,
            end_date,
            status: ElectionStatus::InProgress,
            candidates: Vec::new(),
            votes: BTreeMap::new(),
            winner: None,
        }
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == ElectionStatus::InProgress
    }

    pub fn candidate(&self, candidate_id: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id == candidate_id)
    }

    pub fn has_voted(&self, voter: &str) -> bool {
        self.votes.contains_key(voter)
    }

    /// Counts the votes into each candidate and picks the winner.
    ///
    /// Only a strictly greater count replaces the leader, so on a tie the
    /// candidate registered first wins. No votes means no winner.
    pub fn tally(&mut self) -> Option<Candidate> {
        let mut counts: HashMap<&str, u64> = HashMap::new();
        for candidate_id in self.votes.values() {
            *counts.entry(candidate_id.as_str()).or_insert(0) += 1;
        }

        let mut leader: Option<usize> = None;
        let mut max_votes = 0;
        for (i, candidate) in self.candidates.iter_mut().enumerate() {
            candidate.vote_count = counts.get(candidate.id.as_str()).copied().unwrap_or(0);
            if candidate.vote_count > max_votes {
                max_votes = candidate.vote_count;
                leader = Some(i);
            }
        }

        self.winner = leader.map(|i| self.candidates[i].clone());
        self.winner.clone()
    }
}

#[derive(Debug, Default)]
struct ElectionSlots {
    current: Option<Election>,
    history: Vec<Election>,
}

impl ElectionSlots {
    fn active_mut(&mut self) -> Result<&mut Election> {
        self.current
            .as_mut()
            .filter(|e| e.is_in_progress())
            .ok_or(ChainError::NoActiveElection)
    }

    fn retire(&mut self) -> Result<Election> {
        let election = self.current.take().ok_or(ChainError::NoActiveElection)?;
        self.history.push(election.clone());
        Ok(election)
    }
}

pub struct ElectionSystem {
    registry: Arc<CitizenRegistry>,
    slots: RwLock<ElectionSlots>,
}

impl ElectionSystem {
    pub fn new(registry: Arc<CitizenRegistry>) -> Self {
        Self {
            registry,
            slots: RwLock::new(ElectionSlots::default()),
        }
    }

    pub fn start(&self, name: &str, duration_days: u32) -> Result<Election> {
        let mut slots = self.slots.write();

        if slots.current.as_ref().is_some_and(Election::is_in_progress) {
            return Err(ChainError::ElectionInProgress);
        }

        let election = Election::open(name, duration_days, slots.history.len());
        info!(election_id = %election.id, name = %election.name, duration_days, "election.started");
        slots.current = Some(election.clone());
        Ok(election)
    }

    pub fn register_candidate(&self, name: &str, public_key: &str, platform: &str) -> Result<Candidate> {
        let mut slots = self.slots.write();
        let election = slots.active_mut()?;

        if !self.registry.is_approved_citizen(public_key) {
            return Err(ChainError::NotApprovedCitizen(public_key.to_string()));
        }
        if election.candidates.iter().any(|c| c.public_key == public_key) {
            return Err(ChainError::AlreadyCandidate(public_key.to_string()));
        }

        let candidate = Candidate {
            id: content_id(name, public_key),
            name: name.to_string(),
            public_key: public_key.to_string(),
            platform: platform.to_string(),
            vote_count: 0,
        };
        election.candidates.push(candidate.clone());

        info!(election_id = %election.id, candidate_id = %candidate.id, "election.candidate_registered");
        Ok(candidate)
    }

    pub fn cast_vote(&self, voter_public_key: &str, candidate_id: &str) -> Result<()> {
        let mut slots = self.slots.write();
        let election = slots.active_mut()?;

        if !self.registry.is_approved_citizen(voter_public_key) {
            return Err(ChainError::NotApprovedCitizen(voter_public_key.to_string()));
        }
        if election.has_voted(voter_public_key) {
            return Err(ChainError::AlreadyVoted(voter_public_key.to_string()));
        }
        if election.candidate(candidate_id).is_none() {
            return Err(ChainError::InvalidCandidate(candidate_id.to_string()));
        }

        election
            .votes
            .insert(voter_public_key.to_string(), candidate_id.to_string());
        Ok(())
    }

    /// Tallies the active election, completes it and clears the slot.
    pub fn end(&self) -> Result<Election> {
        let mut slots = self.slots.write();
        let election = slots.active_mut()?;

        election.tally();
        election.status = ElectionStatus::Completed;

        let election = slots.retire()?;
        info!(
            election_id = %election.id,
            votes = election.votes.len(),
            winner = ?election.winner.as_ref().map(|w| w.id.as_str()),
            "election.completed"
        );
        Ok(election)
    }

    /// Administrative override: discards the active election without a tally.
    pub fn cancel(&self, approver_key: &str) -> Result<Election> {
        self.registry
            .authorize(approver_key, Permission::ManageElections)?;

        let mut slots = self.slots.write();
        let election = slots.active_mut()?;
        election.status = ElectionStatus::Cancelled;

        let election = slots.retire()?;
        info!(election_id = %election.id, cancelled_by = %approver_key, "election.cancelled");
        Ok(election)
    }

    pub fn current_election(&self) -> Option<Election> {
        self.slots.read().current.clone()
    }

    pub fn current_candidates(&self) -> Vec<Candidate> {
        self.slots
            .read()
            .current
            .as_ref()
            .map(|e| e.candidates.clone())
            .unwrap_or_default()
    }

    pub fn past_elections(&self) -> Vec<Election> {
        self.slots.read().history.clone()
    }
}
