/// Transaction types for CitizenChain
use crate::citizen::Citizen;
use crate::crypto::{sha256_hex, KeyPair};
use crate::error::ChainError;
use serde::{Deserialize, Serialize};

/// Maximum serialized transaction size in bytes (100KB) to prevent DoS
pub const MAX_TRANSACTION_SIZE: usize = 100_000;

/// Sender of every tagged system transaction.
pub const SYSTEM_IDENTITY: &str = "SYSTEM";

/// Counterparty of election-wide system transactions.
pub const ELECTION_IDENTITY: &str = "ELECTION";

/// Typed payload of a tagged system transaction, serialized with a `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxData {
    CitizenRegistration {
        citizen: Citizen,
    },
    CitizenApproval {
        citizen_id: String,
        approver_key: String,
    },
    CitizenRejection {
        citizen_id: String,
        approver_key: String,
    },
    ElectionStart {
        election_id: String,
        name: String,
        duration_days: u32,
    },
    CandidateRegistration {
        candidate_id: String,
        name: String,
        platform: String,
    },
    VoteCast {
        candidate_id: String,
    },
    ElectionEnd {
        election_id: String,
        winner: Option<String>,
    },
    ElectionCancel {
        election_id: String,
        cancelled_by: String,
    },
}

impl TxData {
    pub fn tag(&self) -> &'static str {
        match self {
            TxData::CitizenRegistration { .. } => "CITIZEN_REGISTRATION",
            TxData::CitizenApproval { .. } => "CITIZEN_APPROVAL",
            TxData::CitizenRejection { .. } => "CITIZEN_REJECTION",
            TxData::ElectionStart { .. } => "ELECTION_START",
            TxData::CandidateRegistration { .. } => "CANDIDATE_REGISTRATION",
            TxData::VoteCast { .. } => "VOTE_CAST",
            TxData::ElectionEnd { .. } => "ELECTION_END",
            TxData::ElectionCancel { .. } => "ELECTION_CANCEL",
        }
    }
}

/// A value transfer or a tagged system action.
///
/// `id` is derived from `from`, `to`, `timestamp`, `amount` and `nonce`; the
/// random nonce keeps two otherwise identical transactions created in the
/// same millisecond apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub from: String,
    pub to: String,
    /// Currency base units; zero for non-monetary actions
    pub amount: u64,
    /// Creation instant in unix milliseconds
    pub timestamp: i64,
    #[serde(default)]
    pub nonce: u64,
    /// Hex compact ECDSA signature by `from` over `signable_message()`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<TxData>,
}

impl Transaction {
    pub fn new(from: impl Into<String>, to: impl Into<String>, amount: u64) -> Self {
        Self::with_parts(
            from,
            to,
            amount,
            chrono::Utc::now().timestamp_millis(),
            rand::random::<u64>(),
        )
    }

    /// Builds a transaction from explicit parts, reproducing a specific id.
    pub fn with_parts(
        from: impl Into<String>,
        to: impl Into<String>,
        amount: u64,
        timestamp: i64,
        nonce: u64,
    ) -> Self {
        let mut tx = Transaction {
            id: String::new(),
            from: from.into(),
            to: to.into(),
            amount,
            timestamp,
            nonce,
            signature: None,
            data: None,
        };
        tx.id = tx.calculate_id();
        tx
    }

    pub fn with_data(mut self, data: TxData) -> Self {
        self.data = Some(data);
        self
    }

    pub fn calculate_id(&self) -> String {
        sha256_hex(&[
            self.from.as_bytes(),
            &[0u8],
            self.to.as_bytes(),
            &[0u8],
            &self.timestamp.to_le_bytes(),
            &self.amount.to_le_bytes(),
            &self.nonce.to_le_bytes(),
        ])
    }

    /// Type tag of the payload, `TRANSFER` for plain value transfers.
    pub fn tx_type(&self) -> &'static str {
        self.data.as_ref().map(TxData::tag).unwrap_or("TRANSFER")
    }

    /// Bytes covered by the signature: the id plus the serialized payload.
    pub fn signable_message(&self) -> Result<Vec<u8>, ChainError> {
        let mut message = Vec::new();
        message.extend_from_slice("TX:".as_bytes());
        message.extend_from_slice(self.id.as_bytes());
        if let Some(data) = &self.data {
            let payload = serde_json::to_vec(data).map_err(|e| {
                ChainError::InvalidTransaction(format!("Payload serialization failed: {}", e))
            })?;
            message.extend_from_slice(&payload);
        }
        Ok(message)
    }

    /// Signs as `from`; the key pair must own that identity.
    pub fn sign(&mut self, keypair: &KeyPair) -> Result<(), ChainError> {
        if keypair.identity() != self.from {
            return Err(ChainError::InvalidTransaction(
                "Signing key does not match the sender identity".to_string(),
            ));
        }
        let message = self.signable_message()?;
        let signature = keypair.sign(&message)?;
        self.signature = Some(hex::encode(signature));
        Ok(())
    }
}
