/// Validation logic for transactions separated from type definitions
use crate::crypto::{identity_to_public_key, verify_signature};
use crate::error::ChainError;
use crate::transaction::types::{Transaction, MAX_TRANSACTION_SIZE};

impl Transaction {
    /// Stateless checks: identities present, id intact, size bounded.
    pub fn validate(&self) -> Result<(), ChainError> {
        if self.id.is_empty() {
            return Err(ChainError::InvalidTransaction(
                "Transaction id cannot be empty".to_string(),
            ));
        }
        if self.from.is_empty() || self.to.is_empty() {
            return Err(ChainError::InvalidTransaction(
                "Sender and recipient cannot be empty".to_string(),
            ));
        }

        let expected = self.calculate_id();
        if self.id != expected {
            return Err(ChainError::InvalidTransaction(format!(
                "Transaction id mismatch. Expected {}, but got {}.",
                expected, self.id
            )));
        }

        self.validate_size()
    }

    pub fn validate_size(&self) -> Result<(), ChainError> {
        let serialized = serde_json::to_vec(self)
            .map_err(|e| ChainError::InvalidTransaction(format!("Serialization failed: {}", e)))?;

        if serialized.len() > MAX_TRANSACTION_SIZE {
            return Err(ChainError::InvalidTransaction(format!(
                "Transaction too large: {} bytes (max: {})",
                serialized.len(),
                MAX_TRANSACTION_SIZE
            )));
        }
        Ok(())
    }

    /// ECDSA verification of `signature` against the `from` identity.
    pub fn verify_signature(&self) -> Result<(), ChainError> {
        let signature = self.signature.as_ref().ok_or_else(|| {
            ChainError::InvalidTransaction("Transaction not signed".to_string())
        })?;
        let signature_bytes = hex::decode(signature)
            .map_err(|e| ChainError::CryptoError(format!("Invalid signature encoding: {}", e)))?;
        let public_key = identity_to_public_key(&self.from)?;

        let message = self.signable_message()?;
        verify_signature(&public_key, &message, &signature_bytes)
    }
}
