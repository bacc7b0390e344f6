//! Transaction pool (mempool)
//!
//! Staging area for transactions awaiting inclusion in a block. The pool is
//! owned by the [`Chain`](crate::blockchain::Chain), which serializes access.

use crate::error::ChainError;
use crate::transaction::Transaction;
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone, Default)]
pub struct TransactionPool {
    transactions: HashMap<String, Transaction>,
    /// Insertion order, used when a block is cut
    order: VecDeque<String>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_add(&mut self, tx: Transaction) -> Result<(), ChainError> {
        if tx.id.is_empty() {
            return Err(ChainError::InvalidTransaction(
                "Transaction id cannot be empty".to_string(),
            ));
        }
        if self.transactions.contains_key(&tx.id) {
            return Err(ChainError::DuplicateTransaction(tx.id));
        }

        self.order.push_back(tx.id.clone());
        self.transactions.insert(tx.id.clone(), tx);
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.transactions.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Transaction> {
        self.transactions.get(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Transaction> {
        let tx = self.transactions.remove(id)?;
        self.order.retain(|pooled| pooled != id);
        Some(tx)
    }

    /// Snapshot of every pooled transaction, in insertion order.
    pub fn drain_all(&self) -> Vec<Transaction> {
        self.order
            .iter()
            .filter_map(|id| self.transactions.get(id))
            .cloned()
            .collect()
    }

    pub fn clear(&mut self) {
        self.transactions.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}
