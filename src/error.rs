//! Error types for the configuration expression engine.
//!
//! Every rejection surfaces as an [`ExpressionError`] carrying the raw input
//! exactly as the caller supplied it. The reason strings are a public
//! contract: operators and tooling pattern-match them verbatim, so all
//! formatting lives here and nowhere else.

use thiserror::Error;

use crate::scope::Level;
use crate::scope::Operation;
use crate::setting::Setting;

/// Error raised while parsing, validating, or applying a configuration
/// expression.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExpressionError {
    /// The input does not have the shape of a configuration expression and
    /// no more precise reason can be given (bad scope prefix, non-numeric
    /// id, misplaced `stripe`/`node` keyword).
    #[error("Invalid input: '{input}'")]
    Malformed {
        /// The raw input, verbatim.
        input: String,
    },

    /// The input parses structurally but is rejected for a specific,
    /// enumerated [`Reason`].
    #[error("Invalid input: '{input}'. Reason: {reason}")]
    Rejected {
        /// The raw input, verbatim.
        input: String,
        /// Why the expression was rejected.
        reason: Reason,
    },

    /// Two expressions over the same setting address the same target in
    /// conflicting forms (whole-map vs per-entry). Raised by the duplicate
    /// detector so the change protocol can abort the batch.
    #[error("Incompatible or duplicate configurations: {left} and {right}")]
    Conflict {
        /// Canonical text of the first expression.
        left: String,
        /// Canonical text of the second expression.
        right: String,
    },
}

impl ExpressionError {
    pub(crate) fn malformed(input: &str) -> Self {
        ExpressionError::Malformed { input: input.to_string() }
    }

    pub(crate) fn rejected(input: &str, reason: Reason) -> Self {
        ExpressionError::Rejected { input: input.to_string(), reason }
    }
}

/// The closed set of rejection reasons.
///
/// The display strings are part of the external contract; see the crate
/// documentation for the full taxonomy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Reason {
    /// The input carries a scope prefix but no setting name at all.
    #[error("valid setting name not found")]
    SettingNameNotFound,

    /// The setting name is not in the catalog. Lookup is case-sensitive.
    #[error("Invalid setting name: '{0}'")]
    InvalidSettingName(String),

    /// A sub-key was supplied for a scalar setting.
    #[error("{setting} is not a map and must not have a key")]
    NotAMap {
        /// The scalar setting that received a key.
        setting: Setting,
    },

    /// A stripe or node id of `0` was supplied. Ids are 1-based.
    #[error("Expected {0} ID to be greater than 0")]
    IdNotPositive(IdKind),

    /// The catalog allows no operation at all for this setting at this
    /// scope.
    #[error("{setting} does not allow any operation at {level} level")]
    NoOperation {
        /// The addressed setting.
        setting: Setting,
        /// The scope level of the expression.
        level: Level,
    },

    /// The catalog allows other operations at this scope, but not the one
    /// requested.
    #[error("{setting} does not allow operation {operation} at {level} level")]
    OperationNotAllowed {
        /// The addressed setting.
        setting: Setting,
        /// The rejected operation.
        operation: Operation,
        /// The scope level of the expression.
        level: Level,
    },

    /// A value was supplied, but the setting can be neither set nor
    /// bootstrapped at this scope.
    #[error("{setting} cannot be set at {level} level")]
    NotSettable {
        /// The addressed setting.
        setting: Setting,
        /// The scope level of the expression.
        level: Level,
    },

    /// The setting is write-only: it admits no read and no clear anywhere.
    #[error("{setting} cannot be read or cleared")]
    NotReadableOrClearable {
        /// The write-only setting.
        setting: Setting,
    },

    /// An empty right-hand side was supplied for a setting that cannot be
    /// cleared at this scope.
    #[error("{setting} requires a value")]
    ValueRequired {
        /// The addressed setting.
        setting: Setting,
    },

    /// A write operation was requested without a right-hand side.
    #[error("Operation {0} requires a value")]
    OperationRequiresValue(Operation),

    /// A read or clear operation was requested with a right-hand side.
    #[error("Operation {0} must not have a value")]
    OperationRejectsValue(Operation),

    /// The stripe id does not exist in the target topology.
    #[error("Invalid stripe ID: {stripe_id}. Cluster contains: {stripe_count} stripe(s)")]
    StripeNotFound {
        /// The requested stripe id.
        stripe_id: u32,
        /// How many stripes the cluster actually contains.
        stripe_count: usize,
    },

    /// The node id does not exist in the target stripe.
    #[error("Invalid node ID: {node_id}. Stripe ID: {stripe_id} contains: {node_count} node(s)")]
    NodeNotFound {
        /// The requested node id.
        node_id: u32,
        /// The stripe that was searched.
        stripe_id: u32,
        /// How many nodes the stripe actually contains.
        node_count: usize,
    },

    /// The value does not parse into the setting's native type.
    #[error("Invalid value for {setting}: '{value}'")]
    IllegalValue {
        /// The addressed setting.
        setting: Setting,
        /// The offending value.
        value: String,
    },
}

/// Which kind of 1-based id failed the positivity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    /// A stripe id in the scope prefix.
    Stripe,
    /// A node id in the scope prefix.
    Node,
}

impl std::fmt::Display for IdKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdKind::Stripe => write!(f, "stripe"),
            IdKind::Node => write!(f, "node"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_display() {
        let err = ExpressionError::malformed("stripe.-1.backup-dir");
        assert_eq!(err.to_string(), "Invalid input: 'stripe.-1.backup-dir'");
    }

    #[test]
    fn rejected_display() {
        let err = ExpressionError::rejected("stripe.0.backup-dir", Reason::IdNotPositive(IdKind::Stripe));
        assert_eq!(
            err.to_string(),
            "Invalid input: 'stripe.0.backup-dir'. Reason: Expected stripe ID to be greater than 0"
        );
    }

    #[test]
    fn conflict_display() {
        let err = ExpressionError::Conflict {
            left: "offheap-resources.main=1GB".to_string(),
            right: "offheap-resources=main:1GB".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Incompatible or duplicate configurations: offheap-resources.main=1GB and offheap-resources=main:1GB"
        );
    }

    #[test]
    fn apply_reason_display() {
        assert_eq!(
            Reason::StripeNotFound { stripe_id: 2, stripe_count: 1 }.to_string(),
            "Invalid stripe ID: 2. Cluster contains: 1 stripe(s)"
        );
        assert_eq!(
            Reason::NodeNotFound { node_id: 2, stripe_id: 1, node_count: 1 }.to_string(),
            "Invalid node ID: 2. Stripe ID: 1 contains: 1 node(s)"
        );
    }
}
