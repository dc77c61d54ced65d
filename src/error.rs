//! Error taxonomy.
//!
//! Errors are layered so each one stops where it is supposed to:
//!
//! - [`HostFault`] never leaves an adapter; the safe-invoke wrapper turns
//!   it into [`CapabilityError`].
//! - [`CapabilityError`] never leaves the pipeline; it skips a step or, for
//!   a mandatory step, becomes a [`ChainFailure`].
//! - [`CastRejection`] and [`ChainFailure`] stay inside the one cast they
//!   describe.
//! - [`ResolveError`] is the only error allowed to stop initialization.

use thiserror::Error;

use crate::capability::Operation;
use crate::core::{CasterId, ResourceKey, SpellId};
use crate::effects::StepPath;
use crate::resolver::VersionCoordinate;

/// Low-level failure reported by the host bridge.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostFault {
    /// The symbol does not exist on this host build.
    #[error("missing symbol {owner}#{name}")]
    MissingSymbol { owner: String, name: String },

    /// The symbol exists but its shape is not what the adapter expects.
    #[error("incompatible layout for {symbol}: expected {expected}, found {found}")]
    IncompatibleLayout {
        symbol: String,
        expected: String,
        found: String,
    },

    /// The host refused the call.
    #[error("host rejected call: {0}")]
    Rejected(String),
}

/// Failure of a single capability operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    /// The active adapter cannot perform this operation on this host.
    #[error("capability {operation} unavailable: {reason}")]
    Unavailable { operation: Operation, reason: String },
}

impl CapabilityError {
    /// Create an unavailable error.
    pub fn unavailable(operation: Operation, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            operation,
            reason: reason.into(),
        }
    }

    /// The operation that failed.
    #[must_use]
    pub fn operation(&self) -> Operation {
        match self {
            Self::Unavailable { operation, .. } => *operation,
        }
    }
}

/// Result of a capability operation.
pub type CapabilityResult<T> = Result<T, CapabilityError>;

/// Startup resolution failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The host reported a version with no registered adapter.
    #[error("unsupported host version {reported:?} (supported: {})", format_supported(.supported))]
    UnsupportedHostVersion {
        reported: String,
        supported: Vec<VersionCoordinate>,
    },

    /// Resolution already ran for this slot.
    #[error("capabilities already resolved for host {0}")]
    AlreadyResolved(VersionCoordinate),
}

fn format_supported(supported: &[VersionCoordinate]) -> String {
    supported
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Why a cast was refused before any side effect.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CastRejection {
    /// The permission layer said no.
    #[error("cast not permitted")]
    NotPermitted,

    /// No session is open for the caster.
    #[error("no session open for {0}")]
    NoSession(CasterId),

    /// A pool cannot cover the declared cost.
    #[error("insufficient {resource}: need {required}, have {available}")]
    InsufficientResources {
        resource: ResourceKey,
        required: i64,
        available: i64,
    },

    /// The spell is still cooling down.
    #[error("{spell} on cooldown for {remaining_ticks} more ticks")]
    OnCooldown { spell: SpellId, remaining_ticks: u64 },
}

/// A chain could not be carried out.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainFailure {
    /// A mandatory step hit an unavailable capability.
    #[error("mandatory step {step} failed: {source}")]
    MandatoryStepUnavailable {
        step: StepPath,
        #[source]
        source: CapabilityError,
    },

    /// A mandatory step had nothing to act on.
    #[error("mandatory step {step} could not be realized: {reason}")]
    MandatoryStepUnrealizable { step: StepPath, reason: String },

    /// Sub-chains nested past the configured limit.
    #[error("step {step} nests sub-chains deeper than {limit}")]
    SubChainTooDeep { step: StepPath, limit: usize },
}

/// Session snapshot encoding failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("failed to encode caster state: {0}")]
    Encode(String),

    #[error("failed to decode caster state: {0}")]
    Decode(String),
}

/// Umbrella error for callers that want a single type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpellcoreError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Capability(#[from] CapabilityError),

    #[error(transparent)]
    Rejected(#[from] CastRejection),

    #[error("chain execution failure: {0}")]
    ChainExecution(#[from] ChainFailure),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}
