//! Error taxonomy for parsing and forward kinematics.
//!
//! Every error here is fatal for the operation that produced it: a parse
//! error aborts the whole file, an FK error aborts the whole frame, and the
//! tensor assembler propagates the first FK error instead of emitting a
//! partial buffer.

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// All failure modes of the skeleton parser, motion parser and FK engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A bone block in the skeleton description is missing a required field
    /// or carries an unparseable value.
    #[error("malformed skeleton description: {0}")]
    MalformedSkeleton(String),

    /// The hierarchy section references a joint that was never declared.
    #[error("hierarchy references undeclared joint `{0}`")]
    UnknownJoint(String),

    /// The hierarchy edges do not form a tree rooted at `root`.
    #[error("invalid hierarchy: {0}")]
    InvalidHierarchy(String),

    /// The motion description contains a non-numeric value or a structurally
    /// broken channel group.
    #[error("malformed motion description: {0}")]
    MalformedMotion(String),

    /// A frame carries no channel values for a joint that has at least one
    /// active degree of freedom.
    #[error("frame has no channel values for joint `{0}`")]
    MissingChannel(String),

    /// A frame's channel group for a joint has fewer values than the joint's
    /// active degrees of freedom.
    #[error("joint `{joint}` expects {expected} channel values, got {got}")]
    ChannelCountMismatch {
        joint: String,
        expected: usize,
        got: usize,
    },
}
