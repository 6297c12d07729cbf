//! Session state subsystem.
//!
//! # Data Flow
//! ```text
//! channel connect  → registry.rs (register as Unknown)
//! login message    → registry.rs (role + identity)
//! availability     → pools.rs (ProviderPool / RequesterPool)
//! disconnect/sweep → store.rs (remove + cascade out of both pools)
//! ```
//!
//! # Design Decisions
//! - Registry and pools live behind one `SessionStore` so pool invariants
//!   are checked against the registry in a single place
//! - Pools are insertion-ordered; the oldest entry is selected first
//! - Every mutation is idempotent and never fails

pub mod pools;
pub mod registry;
pub mod store;

pub use pools::{AvailabilityPools, OrderedSet};
pub use registry::{Role, Session, SessionError, SessionId, SessionRegistry};
pub use store::{InMemoryStore, PoolStats, SessionStore};
