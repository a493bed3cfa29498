//! rowfs: Virtual File Tree Over a Flat Row Store
//!
//! Reconstructs a hierarchical file tree from a remote, flat, row-oriented
//! workspace store and exposes it through a file-system-provider contract
//! with per-root caching, synthesized change notification, and soft-delete
//! aware mutations.

pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod memory;
pub mod path;
pub mod provider;
pub mod registry;
pub mod remote;
pub mod tree;
pub mod types;
