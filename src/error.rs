//! Error types for the tour planning core.
//!
//! Infeasibility is an expected outcome and gets its own variant so callers
//! can tell "no solution exists" apart from "could not determine whether a
//! solution exists" (solver unavailable or failed).

use thiserror::Error;

use crate::catalog::NodeId;

/// Result type alias for planner operations.
pub type Result<T> = std::result::Result<T, PlanError>;

#[derive(Error, Debug)]
pub enum PlanError {
    /// A caller-supplied parameter is out of range or self-contradictory.
    /// Detected before model construction, never retried.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// An arc in the catalog input references a node that was never declared.
    #[error("unknown node in distance table: {0}")]
    UnknownNode(NodeId),

    /// No recorded walking route between two locations.
    #[error("no route recorded from {from} to {to}")]
    NoRoute { from: NodeId, to: NodeId },

    /// The home address could not be resolved to walking distances.
    #[error("could not resolve home address '{address}': {reason}")]
    AddressResolution { address: String, reason: String },

    /// The constraint set has no satisfying assignment (cap too tight,
    /// minimum stamp count unreachable, ...). Carries no partial solution.
    #[error("the tour model is infeasible")]
    Infeasible,

    /// No usable solver backend, including the bundled default. Unreachable
    /// while the default backend is compiled in unconditionally; it exists
    /// for builds that gate every backend behind a feature.
    #[error("no usable solver backend: {0}")]
    SolverUnavailable(String),

    /// The backend terminated abnormally (not infeasible, not optimal).
    #[error("solver failed: {0}")]
    SolverFailure(String),

    /// A solved day has no unique non-stamp start node. Signals a builder
    /// defect or a malformed solved model; fatal, not retried.
    #[error("no unique start node found for day {day}")]
    NoStartNode { day: usize },

    /// A reconstructed tour revisits a node or a stamp point appears on more
    /// than one day. Fatal internal-invariant violation.
    #[error("inconsistent tour on day {day}: node {node} repeated")]
    InconsistentTour { day: usize, node: NodeId },
}
