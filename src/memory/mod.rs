//! In-memory backend
//!
//! Searches walk the descriptor objects directly along compiled segment
//! paths:
//!
//! 1. Group the predicate chain by scope
//! 2. Keep shells whose root-scope predicates all hold
//! 3. Keep the submodels satisfying every submodel-scope predicate, narrowing
//!    the shell copy-on-write
//! 4. Count, then sort and page

mod filter;
mod locking;
mod search;
mod sorter;
mod storage;

pub use filter::ShellFilter;
pub use locking::LockingRegistryStorage;
pub use search::search;
pub use sorter::ShellSorter;
pub use storage::InMemoryRegistry;
