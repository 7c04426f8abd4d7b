//! Topology Reconciliation
//!
//! Validated, operator-confirmed, atomic replacement of a cluster's stored
//! topology.
//!
//! # Flow
//!
//! 1. Load the stored record (inconsistent records are used with a warning)
//! 2. Parse the candidate strictly
//! 3. Reject changes to immutable fields
//! 4. Compare the canonical original with the candidate bytes
//! 5. Show a unified diff and ask for confirmation
//! 6. Persist atomically
//!
//! # Example
//!
//! ```rust,no_run
//! use topo_core::{PipelineConfig, ReconciliationPipeline, TerminalConfirm};
//! use topo_store::{FileMetadataStore, StoreConfig};
//!
//! let store = FileMetadataStore::new(StoreConfig::resolve(None)?);
//! let confirm = TerminalConfirm::new();
//! let pipeline = ReconciliationPipeline::new(store, confirm, PipelineConfig::default());
//! let outcome = pipeline.change_config("prod", "prod.yaml", false, &mut std::io::stdout())?;
//! println!("{outcome:?}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod confirm;
pub mod diff;
pub mod error;
pub mod pipeline;

pub use config::PipelineConfig;
pub use confirm::{ConfirmationGate, TerminalConfirm};
pub use diff::{diff_lines, DiffLine, DiffPresenter, DiffStats, LineChange};
pub use error::{ChangeConfigError, ChangeConfigResult, ConfirmError};
pub use pipeline::{
    ChangeOutcome, PipelineStage, ReconciliationPipeline, CONFIRM_PROMPT, NOTHING_CHANGED,
    NO_CHANGE_MESSAGE, REJECTED_PREFIX,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
