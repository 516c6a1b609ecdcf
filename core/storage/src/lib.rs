//! Adapter abstractions for Offsync.
//!
//! This module defines the two collaborator seams of the sync core: a
//! local adapter for on-device storage and a remote adapter for the
//! network source of truth. In-memory implementations of both are
//! provided for testing and development.
//!
//! # Design Principles
//! - Adapter isolation: no storage- or transport-specific logic leaks
//!   into the sync core
//! - Async operations: every adapter call is a suspension point
//! - Unified error semantics: adapters report through the common error type

pub mod adapter;
pub mod memory;

pub use adapter::{LocalAdapter, RemoteAdapter};
pub use memory::{MemoryLocalAdapter, MemoryRemoteAdapter, RemoteCall};
