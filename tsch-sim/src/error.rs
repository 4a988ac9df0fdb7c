//! Error types for the TSCH network-formation simulator.

use thiserror::Error;

/// Errors the core simulator can report.
///
/// There are no recoverable runtime errors once a simulation is running: the
/// virtual clock cannot fail and random draws are always well-defined. Every
/// variant here corresponds to a precondition checked before or at the start
/// of a simulation.
#[derive(Debug, Error)]
pub enum SimError {
    /// A configuration value (timeslot template, scheduling parameters, node
    /// group composition) does not satisfy the constraints in the standard
    /// or in this simulator's own scheduling model.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// An operation was requested that the current simulator state does not
    /// support (e.g. rejoining a node that does not belong to the node
    /// group being simulated).
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

pub type Result<T> = std::result::Result<T, SimError>;
