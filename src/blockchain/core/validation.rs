use crate::error::ChainError;

use super::chain::Block;

/// Walks `blocks` and reports the first integrity failure: a stored hash that
/// does not match its recomputation, or a `prev_hash` that does not point at
/// the preceding block.
pub fn verify_blocks(blocks: &[Block]) -> Result<(), ChainError> {
    for (i, block) in blocks.iter().enumerate() {
        let expected = block.calculate_hash()?;
        if block.hash != expected {
            return Err(ChainError::InvalidBlock(format!(
                "Hash mismatch at block {}. Expected {}, but got {}.",
                i,
                hex::encode(expected),
                hex::encode(block.hash)
            )));
        }

        if i > 0 && block.prev_hash != blocks[i - 1].hash {
            return Err(ChainError::InvalidBlock(format!(
                "Invalid previous block hash at block {}. Expected {}, but got {}.",
                i,
                hex::encode(blocks[i - 1].hash),
                hex::encode(block.prev_hash)
            )));
        }
    }
    Ok(())
}

pub fn validate_blocks(blocks: &[Block]) -> bool {
    verify_blocks(blocks).is_ok()
}
