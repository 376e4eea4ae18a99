//! Configuration expression engine for the Larch clustered server.
//!
//! Operators describe and mutate cluster topology through one textual
//! grammar, used identically on the command line, in persisted property
//! files, and on the cluster-wide change protocol:
//!
//! ```text
//! stripe.1.node.2.backup-dir=/var/tc
//! offheap-resources.main=1GB
//! failover-priority=availability
//! ```
//!
//! This crate is the engine behind that grammar:
//!
//! - [`Setting`] — the catalog: every recognized setting with its
//!   capability matrix (scope level × operation), map/scalar nature, and
//!   default value.
//! - [`Expression`] — one parsed line: parser, canonical text, validator
//!   ([`Expression::validate`]), matcher ([`Expression::selects`]), and
//!   duplicate detector ([`Expression::duplicates`]).
//! - [`Cluster`] / [`Stripe`] / [`Node`] — the topology the applier
//!   ([`Expression::apply`]) mutates.
//! - [`props`] — properties documents and change-protocol batch coalescing.
//!
//! The engine is a pure value-level library: expressions are immutable once
//! parsed, the catalog is static data, and nothing here blocks or performs
//! I/O. Error strings are a public contract; tooling pattern-matches them
//! verbatim.
//!
//! # Example
//!
//! ```
//! use larch_config::{Cluster, Expression, Node, Stripe};
//!
//! let mut cluster = Cluster::new(vec![Stripe::new(vec![Node::new("node1", "localhost")])]);
//! Expression::parse("stripe.1.node.1:security-dir=foo/bar")?.apply(&mut cluster)?;
//! assert_eq!(
//!     cluster.node(1, 1).unwrap().security_dir.as_deref(),
//!     Some(std::path::Path::new("foo/bar")),
//! );
//! # Ok::<(), larch_config::ExpressionError>(())
//! ```

pub mod error;
pub mod expression;
pub mod names;
pub mod props;
pub mod scope;
pub mod setting;
pub mod topology;

pub use error::ExpressionError;
pub use error::IdKind;
pub use error::Reason;
pub use expression::Expression;
pub use names::NodeNameSupplier;
pub use names::RandomNodeName;
pub use scope::Level;
pub use scope::Operation;
pub use scope::Scope;
pub use setting::ParseSettingError;
pub use setting::Setting;
pub use topology::Cluster;
pub use topology::Node;
pub use topology::Stripe;
