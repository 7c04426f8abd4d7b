//! Error types for topology reconciliation
//!
//! Every failure names the stage that aborted the pipeline so callers can
//! tell a rejected candidate from an operator cancellation or a failed
//! commit.

use std::io;
use std::path::PathBuf;

use topo_model::{CodecError, ImmutableFieldViolation, NameError, TopologyError};
use topo_store::StoreError;

use crate::pipeline::PipelineStage;

/// Failure of the interactive confirmation step
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfirmError {
    /// Operator answered no (or accepted the default)
    #[error("change declined by operator")]
    Declined,

    /// Prompt was interrupted before an answer was given
    #[error("confirmation interrupted")]
    Interrupted,

    /// No usable terminal to ask on
    #[error("cannot ask for confirmation: {0}")]
    Terminal(String),
}

/// Reason a change-config run stopped short of committing
#[derive(Debug, thiserror::Error)]
pub enum ChangeConfigError {
    /// Cluster name rejected before touching the store
    #[error("invalid cluster name: {0}")]
    InvalidName(#[from] NameError),

    /// No metadata record for the cluster
    #[error("cluster '{0}' not found")]
    NotFound(String),

    /// Store could not produce a usable record
    #[error("failed to load metadata of cluster '{name}': {source}")]
    Load {
        /// Cluster name
        name: String,
        /// Underlying store failure
        #[source]
        source: StoreError,
    },

    /// Candidate file could not be read
    #[error("failed to read topology file {path}: {source}")]
    ReadCandidate {
        /// Candidate file
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: io::Error,
    },

    /// Candidate is not a well-formed topology
    #[error("new topology could not be parsed: {0}")]
    Parse(#[source] CodecError),

    /// Candidate parsed but is internally inconsistent
    #[error("new topology is invalid: {0}")]
    Invalid(#[source] TopologyError),

    /// Candidate changes a field that must stay fixed
    #[error("new topology rejected: {0}")]
    ImmutableField(#[from] ImmutableFieldViolation),

    /// Current topology could not be encoded for comparison
    #[error("failed to encode current topology: {0}")]
    Encode(#[source] CodecError),

    /// Operator output could not be written
    #[error("failed to write output: {0}")]
    Output(#[source] io::Error),

    /// Operator declined or interrupted the confirmation
    #[error("operation aborted by user")]
    Cancelled,

    /// Confirmation could not be asked at all
    #[error("{0}")]
    Confirmation(#[source] ConfirmError),

    /// Confirmed change could not be persisted
    #[error(
        "failed to save metadata of cluster '{name}': {source}; \
         the confirmed change was NOT persisted, re-run change-config to apply it"
    )]
    Save {
        /// Cluster name
        name: String,
        /// Underlying store failure
        #[source]
        source: StoreError,
    },
}

impl ChangeConfigError {
    /// Stage the pipeline was in when it aborted
    #[must_use]
    pub fn stage(&self) -> PipelineStage {
        match self {
            Self::InvalidName(_) | Self::NotFound(_) | Self::Load { .. } => PipelineStage::Loaded,
            Self::ReadCandidate { .. } | Self::Parse(_) | Self::Invalid(_) => PipelineStage::Parsed,
            Self::ImmutableField(_) => PipelineStage::Validated,
            Self::Encode(_) => PipelineStage::Compared,
            Self::Output(_) | Self::Cancelled | Self::Confirmation(_) => {
                PipelineStage::AwaitingConfirmation
            }
            Self::Save { .. } => PipelineStage::Committed,
        }
    }

    /// Check if the operator stopped the run
    #[inline]
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<ConfirmError> for ChangeConfigError {
    fn from(err: ConfirmError) -> Self {
        match err {
            ConfirmError::Declined | ConfirmError::Interrupted => Self::Cancelled,
            terminal @ ConfirmError::Terminal(_) => Self::Confirmation(terminal),
        }
    }
}

/// Result alias for reconciliation
pub type ChangeConfigResult<T> = Result<T, ChangeConfigError>;
