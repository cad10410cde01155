//! Storage for synchronization progress.
//!
//! The state file is read once before scheduling and written once after the
//! run completes:
//!
//! ```text
//! state.json
//! └── <server>
//!     ├── channels/<channel>                 # plain channel records
//!     └── forums/<group>/threads/<thread-id> # thread records
//! ```

pub mod state;

// Re-export for convenience
pub use state::StateStore;
