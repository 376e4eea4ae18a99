//! The setting catalog.
//!
//! Static table of every setting the configuration grammar recognizes,
//! together with its capability matrix: which scope levels it may be
//! addressed at, which operations it admits at each level, whether it is a
//! map, and its default value. Every downstream component (parser,
//! validator, matcher, applier) consults this table; nothing reaches the
//! applier without passing the (scope, operation, value-presence) checks it
//! encodes.

use std::fmt;

use crate::names::NodeNameSupplier;
use crate::scope::Level;
use crate::scope::Operation;

/// A setting recognized by the catalog.
///
/// The wire name (`Display`) is the identifier operators type:
/// `backup-dir`, `offheap-resources`, `ssl-tls`, …
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Setting {
    /// `name` — the node's symbolic name. Generated (`node-<suffix>`) when
    /// not supplied.
    NodeName,
    /// `hostname` — the address clients and peers resolve the node by.
    NodeHostname,
    /// `port` — the node's client port.
    NodePort,
    /// `group-port` — the port used for stripe-internal replication.
    NodeGroupPort,
    /// `bind-address` — the interface the client port binds to.
    NodeBindAddress,
    /// `group-bind-address` — the interface the group port binds to.
    NodeGroupBindAddress,
    /// `metadata-dir` — where the node keeps its durable metadata.
    NodeMetadataDir,
    /// `log-dir` — where the node writes its logs.
    NodeLogDir,
    /// `backup-dir` — destination for backups; unset disables backups.
    NodeBackupDir,
    /// `config-dir` — the configuration directory. Fixed at startup and
    /// addressable through no operation at runtime.
    NodeConfigDir,
    /// `tc-properties` — free-form server properties (map).
    TcProperties,
    /// `data-dirs` — named data directories (map).
    DataDirs,
    /// `cluster-name` — the cluster's symbolic name.
    ClusterName,
    /// `offheap-resources` — named off-heap memory pools (map).
    OffheapResources,
    /// `failover-priority` — `availability` or `consistency[:N]`.
    FailoverPriority,
    /// `client-reconnect-window` — how long restarted nodes wait for
    /// previously connected clients.
    ClientReconnectWindow,
    /// `client-lease-duration` — the lease granted to connected clients.
    ClientLeaseDuration,
    /// `license-file` — write-only import path for the cluster license.
    /// Consumed by the license service, not stored in the topology.
    LicenseFile,
    /// `security-dir` — root of the node's security configuration.
    SecurityDir,
    /// `audit-log-dir` — where security audit logs are written.
    SecurityAuditLogDir,
    /// `authc` — the authentication scheme.
    SecurityAuthc,
    /// `ssl-tls` — whether connections use TLS.
    SecuritySslTls,
    /// `security-whitelist` — `whitelist`: whether client whitelisting is
    /// enforced.
    SecurityWhitelist,
}

impl Setting {
    /// Every catalog entry, in property-file order.
    pub const fn all() -> &'static [Setting] {
        use Setting::*;
        &[
            NodeName,
            NodeHostname,
            NodePort,
            NodeGroupPort,
            NodeBindAddress,
            NodeGroupBindAddress,
            NodeMetadataDir,
            NodeLogDir,
            NodeBackupDir,
            NodeConfigDir,
            TcProperties,
            DataDirs,
            ClusterName,
            OffheapResources,
            FailoverPriority,
            ClientReconnectWindow,
            ClientLeaseDuration,
            LicenseFile,
            SecurityDir,
            SecurityAuditLogDir,
            SecurityAuthc,
            SecuritySslTls,
            SecurityWhitelist,
        ]
    }

    /// The wire name operators use in expressions.
    pub const fn name(&self) -> &'static str {
        match self {
            Setting::NodeName => "name",
            Setting::NodeHostname => "hostname",
            Setting::NodePort => "port",
            Setting::NodeGroupPort => "group-port",
            Setting::NodeBindAddress => "bind-address",
            Setting::NodeGroupBindAddress => "group-bind-address",
            Setting::NodeMetadataDir => "metadata-dir",
            Setting::NodeLogDir => "log-dir",
            Setting::NodeBackupDir => "backup-dir",
            Setting::NodeConfigDir => "config-dir",
            Setting::TcProperties => "tc-properties",
            Setting::DataDirs => "data-dirs",
            Setting::ClusterName => "cluster-name",
            Setting::OffheapResources => "offheap-resources",
            Setting::FailoverPriority => "failover-priority",
            Setting::ClientReconnectWindow => "client-reconnect-window",
            Setting::ClientLeaseDuration => "client-lease-duration",
            Setting::LicenseFile => "license-file",
            Setting::SecurityDir => "security-dir",
            Setting::SecurityAuditLogDir => "audit-log-dir",
            Setting::SecurityAuthc => "authc",
            Setting::SecuritySslTls => "ssl-tls",
            Setting::SecurityWhitelist => "whitelist",
        }
    }

    /// Look a setting up by its wire name. Case-sensitive.
    pub fn from_name(name: &str) -> Option<Setting> {
        Setting::all().iter().copied().find(|s| s.name() == name)
    }

    /// The operations this setting admits at the given scope level.
    ///
    /// This is the capability matrix. An empty slice means the setting
    /// cannot be addressed at that level at all.
    pub fn operations(&self, level: Level) -> &'static [Operation] {
        use Operation::*;
        match self {
            // Node identity: readable everywhere, written only at bootstrap.
            Setting::NodeName | Setting::NodeHostname | Setting::NodePort => match level {
                Level::Cluster | Level::Stripe => &[Get],
                Level::Node => &[Get, Config],
            },
            // Node network attributes: never cleared, bootstrapped at node
            // level only.
            Setting::NodeGroupPort
            | Setting::NodeBindAddress
            | Setting::NodeGroupBindAddress
            | Setting::NodeLogDir => match level {
                Level::Cluster | Level::Stripe => &[Get, Set],
                Level::Node => &[Get, Set, Config],
            },
            // Node directories and maps: fully dynamic.
            Setting::NodeMetadataDir
            | Setting::NodeBackupDir
            | Setting::SecurityDir
            | Setting::SecurityAuditLogDir
            | Setting::TcProperties
            | Setting::DataDirs => match level {
                Level::Cluster | Level::Stripe => &[Get, Set, Unset],
                Level::Node => &[Get, Set, Unset, Config],
            },
            // Cluster-wide tunables that always carry a value.
            Setting::FailoverPriority
            | Setting::ClientReconnectWindow
            | Setting::ClientLeaseDuration
            | Setting::SecuritySslTls
            | Setting::SecurityWhitelist => match level {
                Level::Cluster => &[Get, Set, Config],
                Level::Stripe | Level::Node => &[],
            },
            // Cluster-wide optionals. The cluster name is assigned at
            // activation and never cleared afterwards.
            Setting::ClusterName => match level {
                Level::Cluster => &[Get, Set, Config],
                Level::Stripe | Level::Node => &[],
            },
            Setting::SecurityAuthc | Setting::OffheapResources => match level {
                Level::Cluster => &[Get, Set, Unset, Config],
                Level::Stripe | Level::Node => &[],
            },
            Setting::NodeConfigDir => &[],
            Setting::LicenseFile => match level {
                Level::Cluster => &[Set],
                Level::Stripe | Level::Node => &[],
            },
        }
    }

    /// Whether `operation` is admitted at `level`.
    pub fn allows(&self, level: Level, operation: Operation) -> bool {
        self.operations(level).contains(&operation)
    }

    /// Whether any operation at all is admitted at `level`.
    pub fn allows_any_operation(&self, level: Level) -> bool {
        !self.operations(level).is_empty()
    }

    /// Whether the setting must always carry a non-empty value.
    ///
    /// When `false`, the empty right-hand side (`setting=`) is legal and
    /// means "clear". Note this is independent of the `unset` operation:
    /// `cluster-name` admits an empty value (the name is absent until
    /// activation) yet cannot be unset.
    pub const fn requires_value(&self) -> bool {
        !matches!(
            self,
            Setting::NodeBackupDir
                | Setting::NodeMetadataDir
                | Setting::SecurityDir
                | Setting::SecurityAuditLogDir
                | Setting::ClusterName
                | Setting::SecurityAuthc
                | Setting::TcProperties
                | Setting::DataDirs
                | Setting::OffheapResources
        )
    }

    /// Map settings carry `sub-key -> value` entries and admit the
    /// `setting.key` addressing form.
    pub const fn is_map(&self) -> bool {
        matches!(
            self,
            Setting::TcProperties | Setting::DataDirs | Setting::OffheapResources
        )
    }

    /// Write-only settings admit no read and no clear anywhere
    /// (`license-file` is imported, never stored).
    pub const fn is_write_only(&self) -> bool {
        matches!(self, Setting::LicenseFile)
    }

    /// The static default value, if any.
    ///
    /// `name` has no static default; see [`Setting::default_text`].
    pub const fn default_value(&self) -> Option<&'static str> {
        match self {
            Setting::NodeHostname => Some("%h"),
            Setting::NodePort => Some("9410"),
            Setting::NodeGroupPort => Some("9430"),
            Setting::NodeBindAddress => Some("0.0.0.0"),
            Setting::NodeGroupBindAddress => Some("0.0.0.0"),
            Setting::NodeMetadataDir => Some("%H/terracotta/metadata"),
            Setting::NodeLogDir => Some("%H/terracotta/logs"),
            Setting::NodeConfigDir => Some("%H/terracotta/config"),
            Setting::DataDirs => Some("main:%H/terracotta/user-data/main"),
            Setting::OffheapResources => Some("main:512MB"),
            Setting::ClientReconnectWindow => Some("120s"),
            Setting::ClientLeaseDuration => Some("150s"),
            Setting::SecuritySslTls => Some("false"),
            Setting::SecurityWhitelist => Some("false"),
            _ => None,
        }
    }

    /// The default value as text, generating a fresh node name when the
    /// setting is `name`. Each invocation for `name` yields a distinct
    /// value.
    pub fn default_text(&self, names: &dyn NodeNameSupplier) -> Option<String> {
        match self {
            Setting::NodeName => Some(names.generate()),
            _ => self.default_value().map(str::to_owned),
        }
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Error returned when a setting name is not in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSettingError(String);

impl fmt::Display for ParseSettingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid setting name: '{}'", self.0)
    }
}

impl std::error::Error for ParseSettingError {}

impl std::str::FromStr for Setting {
    type Err = ParseSettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Setting::from_name(s).ok_or_else(|| ParseSettingError(s.to_string()))
    }
}
