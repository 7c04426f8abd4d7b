//! Reconciliation pipeline
//!
//! Applies an operator-supplied replacement topology to a stored cluster:
//!
//! ```text
//! Loaded -> Parsed -> Validated -> Compared -> NoChange
//!                                          \-> AwaitingConfirmation -> Committed
//! ```
//!
//! Any stage may abort. Nothing is written to the store before the
//! operator confirms (or confirmation is skipped), and a failed save leaves
//! the previous record in place.

use std::fmt;
use std::io::Write;
use std::path::Path;

use topo_model::{validate_cluster_name, ImmutableFieldValidator, TopologyCodec};
use topo_store::{ClusterMetadata, MetadataStore, StoreError};
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::confirm::ConfirmationGate;
use crate::diff::DiffPresenter;
use crate::error::{ChangeConfigError, ChangeConfigResult};

/// Prefix of every rejection message
pub const REJECTED_PREFIX: &str = "New topology could not be saved: ";

/// Printed after a rejection
pub const NOTHING_CHANGED: &str = "Nothing changed.";

/// Printed when the candidate equals the stored topology
pub const NO_CHANGE_MESSAGE: &str = "The file has nothing changed";

/// Question asked before committing
pub const CONFIRM_PROMPT: &str =
    "Please check change highlight above, do you want to apply the change? [y/N]:";

const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[93m";
const RESET: &str = "\x1b[0m";

/// Stage of a change-config run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    /// Stored metadata loaded
    Loaded,
    /// Candidate decoded
    Parsed,
    /// Immutable fields checked
    Validated,
    /// Canonical original compared with candidate bytes
    Compared,
    /// Candidate equals stored topology
    NoChange,
    /// Diff shown, waiting for the operator
    AwaitingConfirmation,
    /// Candidate persisted
    Committed,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Loaded => "loaded",
            Self::Parsed => "parsed",
            Self::Validated => "validated",
            Self::Compared => "compared",
            Self::NoChange => "no-change",
            Self::AwaitingConfirmation => "awaiting-confirmation",
            Self::Committed => "committed",
        };
        f.write_str(s)
    }
}

/// Successful end of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// Candidate matched the stored topology, nothing written
    NoChange,
    /// Candidate persisted
    Applied {
        /// Store revision after the save
        revision: u64,
    },
}

impl ChangeOutcome {
    /// Final stage reached
    #[must_use]
    pub fn stage(&self) -> PipelineStage {
        match self {
            Self::NoChange => PipelineStage::NoChange,
            Self::Applied { .. } => PipelineStage::Committed,
        }
    }
}

/// Validate, diff, confirm and commit a replacement topology
#[derive(Debug)]
pub struct ReconciliationPipeline<S, G> {
    store: S,
    gate: G,
    config: PipelineConfig,
    codec: TopologyCodec,
    validator: ImmutableFieldValidator,
}

impl<S, G> ReconciliationPipeline<S, G>
where
    S: MetadataStore,
    G: ConfirmationGate,
{
    /// Create pipeline over `store`, asking `gate` before commits
    #[must_use]
    pub fn new(store: S, gate: G, config: PipelineConfig) -> Self {
        Self {
            store,
            gate,
            config,
            codec: TopologyCodec::new(),
            validator: ImmutableFieldValidator::new(),
        }
    }

    /// Underlying store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Presentation settings
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Replace the topology of cluster `name` with the contents of
    /// `config_path`
    ///
    /// Operator-facing messages, the diff and the follow-up hint are
    /// written to `out`.
    ///
    /// # Errors
    /// Returns the [`ChangeConfigError`] of the stage that aborted. In every
    /// error case the stored record is unchanged.
    pub fn change_config<W: Write + ?Sized>(
        &self,
        name: &str,
        config_path: impl AsRef<Path>,
        skip_confirm: bool,
        out: &mut W,
    ) -> ChangeConfigResult<ChangeOutcome> {
        let metadata = self.load(name)?;

        let path = config_path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ChangeConfigError::ReadCandidate {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(cluster = name, path = %path.display(), len = bytes.len(), "read candidate");

        let label = path.display().to_string();
        self.reconcile(metadata, &bytes, &label, skip_confirm, out)
    }

    /// Same as [`Self::change_config`] with the candidate already in memory
    ///
    /// # Errors
    /// See [`Self::change_config`].
    pub fn change_config_bytes<W: Write + ?Sized>(
        &self,
        name: &str,
        candidate: &[u8],
        skip_confirm: bool,
        out: &mut W,
    ) -> ChangeConfigResult<ChangeOutcome> {
        let metadata = self.load(name)?;
        self.reconcile(metadata, candidate, "candidate", skip_confirm, out)
    }

    fn load(&self, name: &str) -> ChangeConfigResult<ClusterMetadata> {
        validate_cluster_name(name)?;

        let err = match self.store.load(name) {
            Ok(metadata) => {
                debug!(cluster = name, revision = metadata.revision(), "loaded metadata");
                return Ok(metadata);
            }
            Err(err) => err,
        };

        match err.into_recovered() {
            Ok((metadata, reason)) => {
                warn!(cluster = name, %reason, "continuing with metadata that failed validation");
                Ok(metadata)
            }
            Err(StoreError::NotFound(_)) => Err(ChangeConfigError::NotFound(name.to_string())),
            Err(source) => Err(ChangeConfigError::Load {
                name: name.to_string(),
                source,
            }),
        }
    }

    fn reconcile<W: Write + ?Sized>(
        &self,
        mut metadata: ClusterMetadata,
        candidate_bytes: &[u8],
        candidate_label: &str,
        skip_confirm: bool,
        out: &mut W,
    ) -> ChangeConfigResult<ChangeOutcome> {
        let name = metadata.name().to_string();

        let candidate = match self.codec.decode(candidate_bytes) {
            Ok(topology) => topology,
            Err(err) => {
                self.reject(out, &err);
                return Err(ChangeConfigError::Parse(err));
            }
        };
        if let Err(err) = candidate.validate() {
            self.reject(out, &err);
            return Err(ChangeConfigError::Invalid(err));
        }
        debug!(cluster = %name, nodes = candidate.node_count(), "parsed candidate");

        if let Err(violation) = self.validator.check_diff(metadata.topology(), &candidate) {
            self.reject(out, &violation);
            return Err(violation.into());
        }
        debug!(cluster = %name, "immutable fields unchanged");

        // Raw candidate bytes against the canonical original: a candidate
        // that only differs in formatting still goes through confirmation.
        let current = self
            .codec
            .encode(metadata.topology())
            .map_err(ChangeConfigError::Encode)?;
        if current.as_bytes() == candidate_bytes {
            info!(cluster = %name, "candidate identical to stored topology");
            writeln!(out, "{NO_CHANGE_MESSAGE}").map_err(ChangeConfigError::Output)?;
            return Ok(ChangeOutcome::NoChange);
        }

        let candidate_text = String::from_utf8_lossy(candidate_bytes);
        let stats = DiffPresenter::new()
            .with_context(self.config.context_lines)
            .with_color(self.config.color)
            .with_labels(format!("{name} (stored)"), candidate_label)
            .render(&current, &candidate_text, out)
            .map_err(ChangeConfigError::Output)?;
        debug!(
            cluster = %name,
            added = stats.added,
            removed = stats.removed,
            hunks = stats.hunks,
            "rendered diff"
        );

        if skip_confirm {
            debug!(cluster = %name, "confirmation skipped");
        } else {
            out.flush().map_err(ChangeConfigError::Output)?;
            if let Err(err) = self.gate.confirm(&self.prompt()) {
                let err = ChangeConfigError::from(err);
                if err.is_cancellation() {
                    info!(cluster = %name, "change cancelled by operator");
                }
                return Err(err);
            }
        }

        metadata.set_topology(candidate);
        let revision = self
            .store
            .save(&name, &metadata)
            .map_err(|source| ChangeConfigError::Save {
                name: name.clone(),
                source,
            })?;
        info!(cluster = %name, revision, "committed new topology");

        // Already persisted; a broken sink must not turn this into a failure.
        if let Err(err) = writeln!(
            out,
            "Applied successfully, please use `{} reload {name} [-N <nodes>] [-R <roles>]` to reload config.",
            self.config.program_name
        ) {
            warn!(cluster = %name, error = %err, "failed to print follow-up hint");
        }

        Ok(ChangeOutcome::Applied { revision })
    }

    fn reject<W: Write + ?Sized>(&self, out: &mut W, cause: &dyn fmt::Display) {
        let written = if self.config.color {
            writeln!(out, "{RED}{REJECTED_PREFIX}{RESET}{cause}\n{NOTHING_CHANGED}")
        } else {
            writeln!(out, "{REJECTED_PREFIX}{cause}\n{NOTHING_CHANGED}")
        };
        if let Err(err) = written {
            warn!(error = %err, "failed to print rejection");
        }
    }

    fn prompt(&self) -> String {
        if self.config.color {
            format!("{YELLOW}{CONFIRM_PROMPT}{RESET}")
        } else {
            CONFIRM_PROMPT.to_string()
        }
    }
}
