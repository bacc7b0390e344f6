use crate::citizen::{Citizen, CitizenRegistry};
use crate::election::{Candidate, Election, ElectionSystem};
use crate::error::ChainError;
use crate::mempool::TransactionPool;
use crate::policy::{AdminAllowList, AuthorizationPolicy};
use crate::transaction::{Transaction, TxData, ELECTION_IDENTITY, SYSTEM_IDENTITY};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info};

use super::validation::{validate_blocks, verify_blocks};

pub type Sha256Hash = [u8; 32];

/// `prev_hash` of the genesis block.
pub const GENESIS_PREV_HASH: Sha256Hash = [0u8; 32];

/// Fixed genesis timestamp (unix ms) so every node derives the same genesis hash.
pub const GENESIS_TIMESTAMP: i64 = 1_672_531_200_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    /// Unix milliseconds
    pub timestamp: i64,
    pub transactions: Vec<Transaction>,
    #[serde(with = "hex::serde")]
    pub hash: Sha256Hash,
    #[serde(with = "hex::serde")]
    pub prev_hash: Sha256Hash,
}

/// SHA-256 over the decimal index and timestamp, the JSON rendering of the
/// transactions, then the raw previous hash.
fn block_digest(index: u64, timestamp: i64, transactions_json: &str, prev_hash: &Sha256Hash) -> Sha256Hash {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}{}{}", index, timestamp, transactions_json).as_bytes());
    hasher.update(prev_hash);
    hasher.finalize().into()
}

impl Block {
    pub fn new(
        index: u64,
        transactions: Vec<Transaction>,
        prev_hash: Sha256Hash,
    ) -> Result<Self, ChainError> {
        Self::with_timestamp(index, chrono::Utc::now().timestamp_millis(), transactions, prev_hash)
    }

    pub fn with_timestamp(
        index: u64,
        timestamp: i64,
        transactions: Vec<Transaction>,
        prev_hash: Sha256Hash,
    ) -> Result<Self, ChainError> {
        let mut block = Block {
            index,
            timestamp,
            transactions,
            hash: [0u8; 32],
            prev_hash,
        };
        block.hash = block.calculate_hash()?;
        Ok(block)
    }

    pub fn genesis() -> Self {
        Block {
            index: 0,
            timestamp: GENESIS_TIMESTAMP,
            transactions: Vec::new(),
            // JSON rendering of an empty transaction list
            hash: block_digest(0, GENESIS_TIMESTAMP, "[]", &GENESIS_PREV_HASH),
            prev_hash: GENESIS_PREV_HASH,
        }
    }

    pub fn calculate_hash(&self) -> Result<Sha256Hash, ChainError> {
        let transactions = serde_json::to_string(&self.transactions).map_err(|e| {
            ChainError::InvalidBlock(format!(
                "Transactions of block {} cannot be serialized: {}",
                self.index, e
            ))
        })?;
        Ok(block_digest(self.index, self.timestamp, &transactions, &self.prev_hash))
    }

    pub fn hash_str(&self) -> String {
        hex::encode(self.hash)
    }
}

/// Aggregate root: the only entry point for mutating ledger state.
///
/// Each subsystem guards itself (blocks, pool, registry, election slot). The
/// `commit` lock additionally serializes every check → mutate → pool
/// sequence and block cuts, so no two composite operations interleave.
pub struct Chain {
    blocks: RwLock<Vec<Block>>,
    pool: Mutex<TransactionPool>,
    registry: Arc<CitizenRegistry>,
    elections: ElectionSystem,
    commit: Mutex<()>,
}

impl Default for Chain {
    fn default() -> Self {
        Self::new(Arc::new(AdminAllowList::genesis()))
    }
}

impl Chain {
    pub fn new(policy: Arc<dyn AuthorizationPolicy>) -> Self {
        let registry = Arc::new(CitizenRegistry::new(policy));
        Chain {
            blocks: RwLock::new(vec![Block::genesis()]),
            pool: Mutex::new(TransactionPool::new()),
            elections: ElectionSystem::new(registry.clone()),
            registry,
            commit: Mutex::new(()),
        }
    }

    /// Raw, unauthenticated value transfer.
    pub fn add_transaction(&self, from: &str, to: &str, amount: u64) -> Result<Transaction, ChainError> {
        let _commit = self.commit.lock();
        let tx = Transaction::new(from, to, amount);
        self.pool.lock().try_add(tx.clone())?;
        debug!(tx_id = %tx.id, amount, "transaction.pooled");
        Ok(tx)
    }

    /// Pools a client-built value transfer after checking its id and signature.
    ///
    /// Tagged payloads are only ever attached by the chain's own operations,
    /// so a submission carrying `data` is rejected.
    pub fn submit_signed_transaction(&self, tx: Transaction) -> Result<Transaction, ChainError> {
        if let Some(data) = &tx.data {
            return Err(ChainError::InvalidTransaction(format!(
                "{} transactions cannot be submitted",
                data.tag()
            )));
        }
        tx.validate()?;
        tx.verify_signature()?;

        let _commit = self.commit.lock();
        self.pool.lock().try_add(tx.clone())?;
        debug!(tx_id = %tx.id, "transaction.pooled_signed");
        Ok(tx)
    }

    /// Runs `action` and pools `shell` tagged with the payload it returns.
    ///
    /// The shell id is checked against the pool before `action` runs, so a
    /// pool rejection never follows a registry or election mutation.
    fn commit_tagged<F>(&self, kind: &str, shell: Transaction, action: F) -> Result<Transaction, ChainError>
    where
        F: FnOnce() -> Result<TxData, ChainError>,
    {
        let _commit = self.commit.lock();

        if self.pool.lock().contains(&shell.id) {
            return Err(ChainError::PoolInsertFailed(kind.to_string()));
        }

        let tx = shell.with_data(action()?);
        self.pool
            .lock()
            .try_add(tx.clone())
            .map_err(|_| ChainError::PoolInsertFailed(kind.to_string()))?;
        debug!(tx_id = %tx.id, tx_type = tx.tx_type(), "transaction.pooled");
        Ok(tx)
    }

    pub fn add_citizen_registration(
        &self,
        name: &str,
        date_of_birth: &str,
        public_key: &str,
    ) -> Result<Transaction, ChainError> {
        self.commit_tagged(
            "citizen registration",
            Transaction::new(SYSTEM_IDENTITY, public_key, 0),
            || {
                let citizen = self.registry.register(name, date_of_birth, public_key)?;
                Ok(TxData::CitizenRegistration { citizen })
            },
        )
    }

    pub fn approve_citizen(&self, citizen_id: &str, approver_key: &str) -> Result<Transaction, ChainError> {
        self.commit_tagged(
            "citizen approval",
            Transaction::new(SYSTEM_IDENTITY, citizen_id, 0),
            || {
                self.registry.approve(citizen_id, approver_key)?;
                Ok(TxData::CitizenApproval {
                    citizen_id: citizen_id.to_string(),
                    approver_key: approver_key.to_string(),
                })
            },
        )
    }

    pub fn reject_citizen(&self, citizen_id: &str, approver_key: &str) -> Result<Transaction, ChainError> {
        self.commit_tagged(
            "citizen rejection",
            Transaction::new(SYSTEM_IDENTITY, citizen_id, 0),
            || {
                self.registry.reject(citizen_id, approver_key)?;
                Ok(TxData::CitizenRejection {
                    citizen_id: citizen_id.to_string(),
                    approver_key: approver_key.to_string(),
                })
            },
        )
    }

    pub fn start_election(&self, name: &str, duration_days: u32) -> Result<Transaction, ChainError> {
        self.commit_tagged(
            "election start",
            Transaction::new(SYSTEM_IDENTITY, ELECTION_IDENTITY, 0),
            || {
                let election = self.elections.start(name, duration_days)?;
                Ok(TxData::ElectionStart {
                    election_id: election.id,
                    name: election.name,
                    duration_days,
                })
            },
        )
    }

    pub fn register_candidate(
        &self,
        name: &str,
        public_key: &str,
        platform: &str,
    ) -> Result<Transaction, ChainError> {
        self.commit_tagged(
            "candidate registration",
            Transaction::new(SYSTEM_IDENTITY, public_key, 0),
            || {
                let candidate = self.elections.register_candidate(name, public_key, platform)?;
                Ok(TxData::CandidateRegistration {
                    candidate_id: candidate.id,
                    name: candidate.name,
                    platform: candidate.platform,
                })
            },
        )
    }

    /// The vote transaction is authored by the voter, not the system.
    pub fn cast_vote(&self, voter_public_key: &str, candidate_id: &str) -> Result<Transaction, ChainError> {
        self.commit_tagged(
            "vote",
            Transaction::new(voter_public_key, ELECTION_IDENTITY, 0),
            || {
                self.elections.cast_vote(voter_public_key, candidate_id)?;
                Ok(TxData::VoteCast {
                    candidate_id: candidate_id.to_string(),
                })
            },
        )
    }

    pub fn end_election(&self) -> Result<Transaction, ChainError> {
        self.commit_tagged(
            "election end",
            Transaction::new(SYSTEM_IDENTITY, ELECTION_IDENTITY, 0),
            || {
                let election = self.elections.end()?;
                Ok(TxData::ElectionEnd {
                    election_id: election.id,
                    winner: election.winner.map(|w| w.id),
                })
            },
        )
    }

    pub fn cancel_election(&self, approver_key: &str) -> Result<Transaction, ChainError> {
        self.commit_tagged(
            "election cancel",
            Transaction::new(SYSTEM_IDENTITY, ELECTION_IDENTITY, 0),
            || {
                let election = self.elections.cancel(approver_key)?;
                Ok(TxData::ElectionCancel {
                    election_id: election.id,
                    cancelled_by: approver_key.to_string(),
                })
            },
        )
    }

    /// Moves every pooled transaction into a new block on top of the tip.
    pub fn cut_block(&self) -> Result<Block, ChainError> {
        let _commit = self.commit.lock();
        let mut blocks = self.blocks.write();

        let (index, prev_hash) = {
            let tip = blocks.last().ok_or(ChainError::EmptyChain)?;
            (tip.index + 1, tip.hash)
        };

        let transactions = {
            let mut pool = self.pool.lock();
            let transactions = pool.drain_all();
            pool.clear();
            transactions
        };

        let block = Block::new(index, transactions, prev_hash)?;
        info!(
            index = block.index,
            tx_count = block.transactions.len(),
            hash = %block.hash_str(),
            "block.cut"
        );
        blocks.push(block.clone());
        Ok(block)
    }

    pub fn validate(&self) -> bool {
        validate_blocks(&self.blocks.read())
    }

    /// Like [`Chain::validate`], reporting which block failed and why.
    pub fn verify(&self) -> Result<(), ChainError> {
        verify_blocks(&self.blocks.read())
    }

    pub fn blocks(&self) -> Vec<Block> {
        self.blocks.read().clone()
    }

    pub fn block(&self, index: u64) -> Option<Block> {
        let index = usize::try_from(index).ok()?;
        self.blocks.read().get(index).cloned()
    }

    pub fn latest_block(&self) -> Result<Block, ChainError> {
        self.blocks.read().last().cloned().ok_or(ChainError::EmptyChain)
    }

    pub fn height(&self) -> usize {
        self.blocks.read().len()
    }

    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.pool.lock().drain_all()
    }

    pub fn pool_size(&self) -> usize {
        self.pool.lock().len()
    }

    /// Looks in the blocks first, then in the pool.
    pub fn find_transaction(&self, id: &str) -> Option<Transaction> {
        let confirmed = self
            .blocks
            .read()
            .iter()
            .flat_map(|b| b.transactions.iter())
            .find(|tx| tx.id == id)
            .cloned();
        confirmed.or_else(|| self.pool.lock().get(id).cloned())
    }

    pub fn get_citizen(&self, public_key: &str) -> Option<Citizen> {
        self.registry.get_citizen(public_key)
    }

    pub fn all_citizens(&self) -> Vec<Citizen> {
        self.registry.all_citizens()
    }

    pub fn current_election(&self) -> Option<Election> {
        self.elections.current_election()
    }

    pub fn current_candidates(&self) -> Vec<Candidate> {
        self.elections.current_candidates()
    }

    pub fn past_elections(&self) -> Vec<Election> {
        self.elections.past_elections()
    }
}
