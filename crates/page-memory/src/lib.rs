//! Canonical-URL-keyed page/link graph store.
//!
//! Holds every discovered page and its outgoing links, the session-global
//! visited-link set, the LIFO backtracking stack, and the recorded edges
//! used by reporting layers. All writes happen inside a single agent's
//! tick, and ticks are strictly interleaved, so plain locks are enough.

pub mod canonical;
pub mod model;
pub mod store;

pub use canonical::canonicalize;
pub use model::{Edge, ElementTestResult, PageDetails, PageRecord};
pub use store::PageMemory;
