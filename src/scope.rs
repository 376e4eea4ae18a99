//! Addressing scopes and operations.
//!
//! A configuration expression targets the whole cluster, one stripe, or one
//! node within a stripe. Stripe and node ids are 1-based; `0` is rejected at
//! parse time.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// The target of one configuration expression.
///
/// Ids are 1-based positions in the topology, not stable identifiers: the
/// second node of the first stripe is always `Node { stripe_id: 1, node_id: 2 }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    /// The whole cluster. Node-level settings addressed here fan out to
    /// every node.
    Cluster,
    /// One stripe. Node-level settings addressed here fan out to every node
    /// of the stripe.
    Stripe {
        /// 1-based stripe id.
        stripe_id: u32,
    },
    /// One node of one stripe.
    Node {
        /// 1-based stripe id.
        stripe_id: u32,
        /// 1-based node id within the stripe.
        node_id: u32,
    },
}

impl Scope {
    /// The granularity of this scope, without ids.
    pub const fn level(&self) -> Level {
        match self {
            Scope::Cluster => Level::Cluster,
            Scope::Stripe { .. } => Level::Stripe,
            Scope::Node { .. } => Level::Node,
        }
    }

    /// The stripe id, if this scope addresses one.
    pub const fn stripe_id(&self) -> Option<u32> {
        match self {
            Scope::Cluster => None,
            Scope::Stripe { stripe_id } | Scope::Node { stripe_id, .. } => Some(*stripe_id),
        }
    }

    /// The node id, if this scope addresses one.
    pub const fn node_id(&self) -> Option<u32> {
        match self {
            Scope::Node { node_id, .. } => Some(*node_id),
            _ => None,
        }
    }

    /// Canonical namespace prefix, `.`-separated, including the trailing
    /// separator (empty for cluster scope).
    pub(crate) fn prefix(&self) -> String {
        match self {
            Scope::Cluster => String::new(),
            Scope::Stripe { stripe_id } => format!("stripe.{stripe_id}."),
            Scope::Node { stripe_id, node_id } => format!("stripe.{stripe_id}.node.{node_id}."),
        }
    }
}

/// Scope granularity, used to index the setting catalog's capability matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Cluster-wide.
    Cluster,
    /// One stripe.
    Stripe,
    /// One node.
    Node,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Cluster => write!(f, "cluster"),
            Level::Stripe => write!(f, "stripe"),
            Level::Node => write!(f, "node"),
        }
    }
}

/// The intended use of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Read the current value.
    Get,
    /// Write a new value.
    Set,
    /// Clear the value.
    Unset,
    /// Initial bootstrap write, performed once when a node first starts.
    Config,
}

impl Operation {
    /// All operations, in catalog order.
    pub const fn all() -> &'static [Operation] {
        &[Operation::Get, Operation::Set, Operation::Unset, Operation::Config]
    }

    /// The lowercase wire name of this operation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Operation::Get => "get",
            Operation::Set => "set",
            Operation::Unset => "unset",
            Operation::Config => "config",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an operation name fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOperationError(String);

impl fmt::Display for ParseOperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid operation: {}", self.0)
    }
}

impl std::error::Error for ParseOperationError {}

impl std::str::FromStr for Operation {
    type Err = ParseOperationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "get" => Ok(Operation::Get),
            "set" => Ok(Operation::Set),
            "unset" => Ok(Operation::Unset),
            "config" => Ok(Operation::Config),
            _ => Err(ParseOperationError(s.to_string())),
        }
    }
}
