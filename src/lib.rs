//! CitizenChain - A permissioned ledger for a virtual nation
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Ledger
//! - [`blockchain`] - Blocks, the chain aggregate and integrity validation
//! - [`transaction`] - Transaction types, identity and signing
//! - [`mempool`] - Pending transaction pool
//!
//! ## Governance
//! - [`policy`] - Authorization policy for administrative actions
//! - [`citizen`] - Citizen registry and approval workflow
//! - [`election`] - Single-slot election lifecycle and tally
//!
//! ## Cryptography
//! - [`crypto`] - Hashing, secp256k1 signatures and identities
//!
//! ## Node & Integration
//! - [`node`] - Node process (scheduler, API, shutdown)
//! - `api` - REST API (feature `api`)
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;
pub mod mempool;
pub mod transaction;

// ============================================================================
// Governance
// ============================================================================
pub mod citizen;
pub mod election;
pub mod policy;

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;

// ============================================================================
// Node & Integration
// ============================================================================
#[cfg(feature = "api")]
pub mod api;
pub mod node;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
