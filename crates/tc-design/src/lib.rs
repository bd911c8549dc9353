//! tc-design: design-point records for offdesign solves.
//!
//! A converged design solve is captured as a [`DesignRecord`]: every
//! connection variable, the capacity and performance values derived from
//! the solution, and the design-point energy flow of each bus member.
//! Offdesign solves read the record to freeze released values and to
//! anchor characteristic curves.
//!
//! Records are plain JSON so they can be inspected and diffed. A
//! fingerprint of the topology guards against replaying a record onto a
//! different network.

pub mod hash;
pub mod store;
pub mod types;

pub use hash::topology_fingerprint;
pub use store::{DesignStore, load_record, save_record};
pub use types::{DesignRecord, FORMAT_VERSION};

pub type DesignResult<T> = Result<T, DesignError>;

#[derive(thiserror::Error, Debug)]
pub enum DesignError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("design record not found: {name}")]
    NotFound { name: String },

    #[error("unsupported design record format {found} (this build reads {expected})")]
    Format { found: u32, expected: u32 },
}
