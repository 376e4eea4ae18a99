//! Parsing and validation of configuration expressions.
//!
//! One expression is one line of the configuration grammar:
//!
//! ```text
//! [stripe.<id>[.node.<id>]<SEP>]<setting>[.<key>][=<value>]
//! ```
//!
//! where `<SEP>` is `.` or `:` interchangeably. Parsing eagerly consults the
//! setting catalog, so an [`Expression`] in hand is always addressable: the
//! setting admits at least one operation at the parsed scope, and the
//! presence or absence of the right-hand side is legal for it. Operation
//! specific checks happen in [`Expression::validate`].
//!
//! Expressions are immutable values. The raw input is kept verbatim for
//! error messages; `Display` always renders the canonical `.`-separated
//! form, and equality is over the canonical form only.

use std::fmt;
use std::str::FromStr;

use crate::error::ExpressionError;
use crate::error::IdKind;
use crate::error::Reason;
use crate::names::NodeNameSupplier;
use crate::names::RandomNodeName;
use crate::scope::Operation;
use crate::scope::Scope;
use crate::setting::Setting;

/// One parsed configuration expression.
///
/// # Example
/// ```
/// use larch_config::{Expression, Scope, Setting};
///
/// let expr: Expression = "stripe.1.node.2.backup-dir=/var/tc".parse().unwrap();
/// assert_eq!(expr.setting(), Setting::NodeBackupDir);
/// assert_eq!(expr.scope(), Scope::Node { stripe_id: 1, node_id: 2 });
/// assert_eq!(expr.value(), Some("/var/tc"));
/// ```
#[derive(Debug, Clone)]
pub struct Expression {
    setting: Setting,
    scope: Scope,
    key: Option<String>,
    value: Option<String>,
    raw: String,
}

impl Expression {
    /// Parse a raw expression.
    ///
    /// Rejections carry the raw input verbatim, prefixed with
    /// `Invalid input: '<raw>'`.
    pub fn parse(raw: &str) -> Result<Expression, ExpressionError> {
        let (lhs, value) = match raw.split_once('=') {
            Some((lhs, value)) => (lhs, Some(value.to_string())),
            None => (raw, None),
        };

        let (scope, setting_ref) = split_namespace(raw, lhs)?;

        // A map key may itself contain dots, so only the first segment is
        // the setting name.
        let (name, key) = match setting_ref.split_once('.') {
            Some((name, key)) => (name, Some(key.to_string())),
            None => (setting_ref, None),
        };

        if name.is_empty() {
            return Err(ExpressionError::rejected(raw, Reason::SettingNameNotFound));
        }
        // The scope keywords never name a setting; seeing one here means the
        // prefix shape was wrong (repeated or inverted segments).
        if name == "stripe" || name == "node" {
            return Err(ExpressionError::malformed(raw));
        }

        let setting = Setting::from_name(name).ok_or_else(|| {
            ExpressionError::rejected(raw, Reason::InvalidSettingName(name.to_string()))
        })?;

        if key.is_some() && !setting.is_map() {
            return Err(ExpressionError::rejected(raw, Reason::NotAMap { setting }));
        }

        let expression = Expression {
            setting,
            scope,
            key,
            value,
            raw: raw.to_string(),
        };
        expression.check_catalog()?;
        Ok(expression)
    }

    /// Build the default expression for `setting` at `scope`, using the
    /// default node-name supplier.
    ///
    /// The result is `<prefix><setting>=<default>` parsed back through
    /// [`Expression::parse`], so illegal (scope, value-presence)
    /// combinations are rejected here, without a separate
    /// [`Expression::validate`] call.
    pub fn value_of(setting: Setting, scope: Scope) -> Result<Expression, ExpressionError> {
        Expression::value_of_with(setting, scope, &RandomNodeName)
    }

    /// Like [`Expression::value_of`], with an injected node-name supplier.
    pub fn value_of_with(
        setting: Setting,
        scope: Scope,
        names: &dyn NodeNameSupplier,
    ) -> Result<Expression, ExpressionError> {
        let value = setting.default_text(names).unwrap_or_default();
        format!("{}{}={}", scope.prefix(), setting, value).parse()
    }

    /// The addressed setting.
    pub fn setting(&self) -> Setting {
        self.setting
    }

    /// The addressed scope.
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// The stripe id, for stripe- and node-scoped expressions.
    pub fn stripe_id(&self) -> Option<u32> {
        self.scope.stripe_id()
    }

    /// The node id, for node-scoped expressions.
    pub fn node_id(&self) -> Option<u32> {
        self.scope.node_id()
    }

    /// The map sub-key, when one was addressed.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// The right-hand side. `None` when the expression had no `=`,
    /// `Some("")` when the right-hand side was empty (which means "clear").
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// The input this expression was parsed from, verbatim.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Whether a non-empty right-hand side is present.
    pub fn has_value(&self) -> bool {
        matches!(self.value.as_deref(), Some(v) if !v.is_empty())
    }

    /// Check this expression against an intended operation.
    ///
    /// The capability matrix is consulted first, then the value shape:
    /// `get`/`unset` must not carry a value, `set` requires a non-empty
    /// value, `config` requires a right-hand side (which may be empty).
    pub fn validate(&self, operation: Operation) -> Result<(), ExpressionError> {
        let level = self.scope.level();
        if !self.setting.allows(level, operation) {
            let reason = match operation {
                Operation::Get | Operation::Unset if self.setting.is_write_only() => {
                    Reason::NotReadableOrClearable { setting: self.setting }
                }
                _ => Reason::OperationNotAllowed {
                    setting: self.setting,
                    operation,
                    level,
                },
            };
            return Err(self.rejected(reason));
        }
        match operation {
            Operation::Get | Operation::Unset => {
                if self.has_value() {
                    return Err(self.rejected(Reason::OperationRejectsValue(operation)));
                }
            }
            Operation::Set => {
                if !self.has_value() {
                    return Err(self.rejected(Reason::OperationRequiresValue(operation)));
                }
            }
            Operation::Config => {
                if self.value.is_none() {
                    return Err(self.rejected(Reason::OperationRequiresValue(operation)));
                }
            }
        }
        Ok(())
    }

    /// Whether this (user-supplied) expression selects `stored`, a property
    /// key from the configuration store.
    ///
    /// The settings must be identical, this scope must be a prefix of the
    /// stored scope (with equal ids where both specify them), and the map
    /// keys must be equal on both sides. Values play no part.
    pub fn selects(&self, stored: &Expression) -> bool {
        if self.setting != stored.setting {
            return false;
        }
        let scope_is_prefix = match (self.scope, stored.scope) {
            (Scope::Cluster, _) => true,
            (Scope::Stripe { stripe_id: a }, Scope::Stripe { stripe_id: b })
            | (Scope::Stripe { stripe_id: a }, Scope::Node { stripe_id: b, .. }) => a == b,
            (
                Scope::Node { stripe_id: a, node_id: n },
                Scope::Node { stripe_id: b, node_id: m },
            ) => a == b && n == m,
            _ => false,
        };
        scope_is_prefix && self.key == stored.key
    }

    /// Parse `stored` and test [`Expression::selects`] against it.
    pub fn matches_config_key(&self, stored: &str) -> Result<bool, ExpressionError> {
        Ok(self.selects(&Expression::parse(stored)?))
    }

    /// Whether this expression and `other` target the same
    /// (setting, scope, key) — values may differ.
    ///
    /// For a map setting addressed without a key, mixing the whole-map form
    /// (`offheap-resources=…`) with the keyless read/clear form
    /// (`offheap-resources`), or a keyed form with a keyless one, is
    /// reported as [`ExpressionError::Conflict`] so batch coalescing can
    /// abort. The relation is symmetric.
    pub fn duplicates(&self, other: &Expression) -> Result<bool, ExpressionError> {
        if self.setting != other.setting || self.scope != other.scope {
            return Ok(false);
        }
        if !self.setting.is_map() {
            return Ok(true);
        }
        match (&self.key, &other.key) {
            (Some(a), Some(b)) => Ok(a == b),
            (None, None) if self.has_value() == other.has_value() => Ok(true),
            _ => Err(ExpressionError::Conflict {
                left: self.to_string(),
                right: other.to_string(),
            }),
        }
    }

    /// Catalog checks performed at parse time, with the operation implied
    /// by the shape of the right-hand side: absent means read, empty means
    /// clear, non-empty means write.
    fn check_catalog(&self) -> Result<(), ExpressionError> {
        let level = self.scope.level();
        if !self.setting.allows_any_operation(level) {
            return Err(self.rejected(Reason::NoOperation {
                setting: self.setting,
                level,
            }));
        }
        match self.value.as_deref() {
            None => {
                if !self.setting.allows(level, Operation::Get)
                    && !self.setting.allows(level, Operation::Unset)
                {
                    return Err(
                        self.rejected(Reason::NotReadableOrClearable { setting: self.setting })
                    );
                }
            }
            Some("") => {
                if self.setting.requires_value() {
                    return Err(self.rejected(Reason::ValueRequired { setting: self.setting }));
                }
            }
            Some(_) => {
                if !self.setting.allows(level, Operation::Set)
                    && !self.setting.allows(level, Operation::Config)
                {
                    return Err(self.rejected(Reason::NotSettable {
                        setting: self.setting,
                        level,
                    }));
                }
            }
        }
        Ok(())
    }

    pub(crate) fn rejected(&self, reason: Reason) -> ExpressionError {
        ExpressionError::rejected(&self.raw, reason)
    }
}

impl fmt::Display for Expression {
    /// The canonical text: `.`-separated, re-parseable to an equal
    /// expression.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.scope.prefix(), self.setting)?;
        if let Some(key) = &self.key {
            write!(f, ".{key}")?;
        }
        if let Some(value) = &self.value {
            write!(f, "={value}")?;
        }
        Ok(())
    }
}

impl FromStr for Expression {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Expression::parse(s)
    }
}

impl PartialEq for Expression {
    /// Equality is over the canonical form: the raw input (and its choice
    /// of separator) does not participate.
    fn eq(&self, other: &Self) -> bool {
        self.setting == other.setting
            && self.scope == other.scope
            && self.key == other.key
            && self.value == other.value
    }
}

impl Eq for Expression {}

/// Split the scope prefix off `lhs` (the part of the raw input before `=`),
/// returning the scope and the remaining `setting[.key]` reference.
///
/// Inner prefix separators are strictly `.`; only the boundary before the
/// setting reference admits `.` or `:`. Anything that starts like a prefix
/// but does not match one of the three legal shapes is malformed.
fn split_namespace<'a>(raw: &str, lhs: &'a str) -> Result<(Scope, &'a str), ExpressionError> {
    if lhs != "stripe" && !lhs.starts_with("stripe.") && !lhs.starts_with("stripe:") {
        return Ok((Scope::Cluster, lhs));
    }
    let rest = lhs["stripe".len()..]
        .strip_prefix('.')
        .ok_or_else(|| ExpressionError::malformed(raw))?;
    let (token, sep, rest) = split_id_token(rest);
    let stripe_id = parse_id(raw, token, IdKind::Stripe)?;
    match sep {
        // "stripe.1" with no setting reference, or "stripe.1:..." which
        // cannot be followed by a node segment.
        None | Some(':') => Ok((Scope::Stripe { stripe_id }, rest)),
        Some(_) => {
            if rest == "node" || rest.starts_with("node.") || rest.starts_with("node:") {
                let rest = rest["node".len()..]
                    .strip_prefix('.')
                    .ok_or_else(|| ExpressionError::malformed(raw))?;
                let (token, _, rest) = split_id_token(rest);
                let node_id = parse_id(raw, token, IdKind::Node)?;
                Ok((Scope::Node { stripe_id, node_id }, rest))
            } else {
                Ok((Scope::Stripe { stripe_id }, rest))
            }
        }
    }
}

/// Split an id token off `s`, stopping at the first `.` or `:`.
fn split_id_token(s: &str) -> (&str, Option<char>, &str) {
    match s.find(['.', ':']) {
        Some(i) => (&s[..i], s[i..].chars().next(), &s[i + 1..]),
        None => (s, None, ""),
    }
}

/// Parse a 1-based id. Non-numeric tokens (including signs) are malformed
/// with no further reason; `0` gets the dedicated positivity message.
fn parse_id(raw: &str, token: &str, kind: IdKind) -> Result<u32, ExpressionError> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ExpressionError::malformed(raw));
    }
    let id: u32 = token
        .parse()
        .map_err(|_| ExpressionError::malformed(raw))?;
    if id == 0 {
        return Err(ExpressionError::rejected(raw, Reason::IdNotPositive(kind)));
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::Level;

    fn parse(raw: &str) -> Expression {
        Expression::parse(raw).expect(raw)
    }

    fn parse_err(raw: &str) -> String {
        Expression::parse(raw).expect_err(raw).to_string()
    }

    #[test]
    fn cluster_scope_expression() {
        let expr = parse("offheap-resources.main=1GB");
        assert_eq!(expr.setting(), Setting::OffheapResources);
        assert_eq!(expr.scope(), Scope::Cluster);
        assert_eq!(expr.key(), Some("main"));
        assert_eq!(expr.value(), Some("1GB"));
        assert_eq!(expr.stripe_id(), None);
        assert_eq!(expr.node_id(), None);
    }

    #[test]
    fn both_separators_parse_to_the_same_expression() {
        assert_eq!(
            parse("stripe.1.node.1.security-dir=foo/bar"),
            parse("stripe.1.node.1:security-dir=foo/bar")
        );
        assert_eq!(parse("stripe.2.backup-dir"), parse("stripe.2:backup-dir"));
    }

    #[test]
    fn display_is_canonical() {
        assert_eq!(
            parse("stripe.1.node.1:security-dir=foo/bar").to_string(),
            "stripe.1.node.1.security-dir=foo/bar"
        );
        assert_eq!(parse("stripe.1:data-dirs.main=").to_string(), "stripe.1.data-dirs.main=");
        assert_eq!(parse("backup-dir").to_string(), "backup-dir");
    }

    #[test]
    fn raw_input_is_preserved_verbatim() {
        let expr = parse("stripe.1:backup-dir=foo");
        assert_eq!(expr.raw(), "stripe.1:backup-dir=foo");
        assert_eq!(expr.to_string(), "stripe.1.backup-dir=foo");
    }

    #[test]
    fn roundtrip_through_display() {
        for raw in [
            "backup-dir",
            "backup-dir=",
            "backup-dir=a/b",
            "stripe.4.log-dir=logs",
            "stripe.1.node.2.data-dirs.main=foo",
            "tc-properties.a.b.c=d.e.f",
            "offheap-resources=main:1GB,second:2GB",
        ] {
            let expr = parse(raw);
            assert_eq!(expr, parse(&expr.to_string()), "{raw}");
        }
    }

    #[test]
    fn value_may_contain_separators_and_equals() {
        let expr = parse("tc-properties.root=a=b:c.d");
        assert_eq!(expr.key(), Some("root"));
        assert_eq!(expr.value(), Some("a=b:c.d"));
    }

    #[test]
    fn missing_setting_name() {
        assert_eq!(parse_err(""), "Invalid input: ''. Reason: valid setting name not found");
        assert_eq!(
            parse_err("stripe.1"),
            "Invalid input: 'stripe.1'. Reason: valid setting name not found"
        );
        assert_eq!(
            parse_err("stripe.1.node.1"),
            "Invalid input: 'stripe.1.node.1'. Reason: valid setting name not found"
        );
    }

    #[test]
    fn unknown_setting_name() {
        assert_eq!(parse_err("foo"), "Invalid input: 'foo'. Reason: Invalid setting name: 'foo'");
        assert_eq!(
            parse_err("stripe.1:foo"),
            "Invalid input: 'stripe.1:foo'. Reason: Invalid setting name: 'foo'"
        );
        assert_eq!(
            parse_err("foo.stripe.1.node.1.foo"),
            "Invalid input: 'foo.stripe.1.node.1.foo'. Reason: Invalid setting name: 'foo'"
        );
        assert_eq!(
            parse_err("stripe.1.foo.node.1.foo"),
            "Invalid input: 'stripe.1.foo.node.1.foo'. Reason: Invalid setting name: 'foo'"
        );
    }

    #[test]
    fn bad_ids() {
        assert_eq!(
            parse_err("stripe.0.backup-dir"),
            "Invalid input: 'stripe.0.backup-dir'. Reason: Expected stripe ID to be greater than 0"
        );
        assert_eq!(
            parse_err("stripe.1.node.0.backup-dir"),
            "Invalid input: 'stripe.1.node.0.backup-dir'. Reason: Expected node ID to be greater than 0"
        );
        assert_eq!(parse_err("stripe.-1.backup-dir"), "Invalid input: 'stripe.-1.backup-dir'");
        assert_eq!(parse_err("stripe.+1.backup-dir"), "Invalid input: 'stripe.+1.backup-dir'");
        assert_eq!(parse_err("stripe.foo.backup-dir"), "Invalid input: 'stripe.foo.backup-dir'");
        assert_eq!(
            parse_err("stripe.1.node.-1.backup-dir"),
            "Invalid input: 'stripe.1.node.-1.backup-dir'"
        );
        assert_eq!(
            parse_err("stripe.1.node.foo.backup-dir"),
            "Invalid input: 'stripe.1.node.foo.backup-dir'"
        );
    }

    #[test]
    fn bad_prefix_shapes() {
        for raw in [
            "node.1.stripe.1.backup-dir",
            "stripe.1.stripe.1.backup-dir",
            "stripe.1.node.1.stripe.1.backup-dir",
            "stripe.1.node.1.node.1.backup-dir",
            "stripe.backup-dir",
            "stripe:backup-dir",
            "stripe",
        ] {
            assert_eq!(parse_err(raw), format!("Invalid input: '{raw}'"));
        }
    }

    #[test]
    fn key_on_scalar_setting() {
        assert_eq!(
            parse_err("backup-dir.key"),
            "Invalid input: 'backup-dir.key'. Reason: backup-dir is not a map and must not have a key"
        );
    }

    #[test]
    fn eager_catalog_checks() {
        assert_eq!(
            parse_err("stripe.1.node.1.failover-priority"),
            "Invalid input: 'stripe.1.node.1.failover-priority'. Reason: failover-priority does not allow any operation at node level"
        );
        assert_eq!(
            parse_err("name=foo"),
            "Invalid input: 'name=foo'. Reason: name cannot be set at cluster level"
        );
        assert_eq!(
            parse_err("license-file"),
            "Invalid input: 'license-file'. Reason: license-file cannot be read or cleared"
        );
        assert_eq!(
            parse_err("license-file="),
            "Invalid input: 'license-file='. Reason: license-file requires a value"
        );
        // a bootstrap-only write is enough to accept a value at node scope
        assert!(Expression::parse("stripe.1.node.1.name=foo").is_ok());
    }

    #[test]
    fn validate_checks_capability_before_value_shape() {
        let expr = parse("backup-dir=");
        assert_eq!(
            expr.validate(Operation::Config).unwrap_err().to_string(),
            "Invalid input: 'backup-dir='. Reason: backup-dir does not allow operation config at cluster level"
        );
        assert_eq!(
            expr.validate(Operation::Set).unwrap_err().to_string(),
            "Invalid input: 'backup-dir='. Reason: Operation set requires a value"
        );
        assert!(expr.validate(Operation::Unset).is_ok());
    }

    #[test]
    fn value_of_uses_catalog_defaults() {
        let expr = Expression::value_of(Setting::OffheapResources, Scope::Cluster).unwrap();
        assert_eq!(expr.to_string(), "offheap-resources=main:512MB");
        assert_eq!(expr, parse(&expr.to_string()));

        let err = Expression::value_of(Setting::NodeConfigDir, Scope::Cluster).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid input: 'config-dir=%H/terracotta/config'. Reason: config-dir does not allow any operation at cluster level"
        );
    }

    #[test]
    fn value_of_generates_node_names() {
        struct Fixed;
        impl NodeNameSupplier for Fixed {
            fn generate(&self) -> String {
                "node-1234".to_string()
            }
        }
        let expr =
            Expression::value_of_with(Setting::NodeName, Scope::Node { stripe_id: 1, node_id: 1 }, &Fixed)
                .unwrap();
        assert_eq!(expr.to_string(), "stripe.1.node.1.name=node-1234");
        assert_eq!(expr.scope().level(), Level::Node);
    }

    #[test]
    fn zero_ids_from_factories_are_rejected() {
        let err =
            Expression::value_of(Setting::NodeBackupDir, Scope::Stripe { stripe_id: 0 }).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid input: 'stripe.0.backup-dir='. Reason: Expected stripe ID to be greater than 0"
        );
    }
}
