//! The cluster topology mutated by configuration expressions.
//!
//! A [`Cluster`] owns an ordered list of [`Stripe`]s, each owning an ordered
//! list of [`Node`]s; stripe and node ids are 1-based positions in those
//! lists. [`Expression::apply`] resolves its scope against a topology and
//! mutates it in place. The engine owns no locking: the host serializes
//! applications onto one topology (normally through the change-protocol
//! coordinator).
//!
//! Attributes are typed: ports are `u16`, directories are [`PathBuf`],
//! security flags are `bool`. Duration and memory-size tunables keep their
//! textual form (`120s`, `512MB`); interpreting them is the server's
//! business, not the grammar's.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::error::ExpressionError;
use crate::error::Reason;
use crate::expression::Expression;
use crate::scope::Operation;
use crate::scope::Scope;
use crate::setting::Setting;

/// The whole cluster: stripes plus cluster-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    /// The cluster's symbolic name, if one was assigned.
    pub name: Option<String>,
    /// The stripes, in id order (stripe 1 first).
    pub stripes: Vec<Stripe>,
    /// Named off-heap memory pools (`name -> size text`, e.g. `512MB`).
    pub offheap_resources: BTreeMap<String, String>,
    /// `availability` or `consistency[:N]`; unset until configured.
    pub failover_priority: Option<String>,
    /// How long a restarted node waits for previously connected clients.
    pub client_reconnect_window: String,
    /// The lease granted to connected clients.
    pub client_lease_duration: String,
    /// The authentication scheme, when security is configured.
    pub security_authc: Option<String>,
    /// Whether connections use TLS.
    pub security_ssl_tls: bool,
    /// Whether client whitelisting is enforced.
    pub security_whitelist: bool,
}

impl Cluster {
    /// Build a cluster around `stripes`, seeding every cluster-wide setting
    /// from its catalog default.
    pub fn new(stripes: Vec<Stripe>) -> Cluster {
        Cluster {
            name: None,
            stripes,
            offheap_resources: default_map(Setting::OffheapResources),
            failover_priority: None,
            client_reconnect_window: default_text(Setting::ClientReconnectWindow),
            client_lease_duration: default_text(Setting::ClientLeaseDuration),
            security_authc: None,
            security_ssl_tls: false,
            security_whitelist: false,
        }
    }

    /// The stripe with the given 1-based id.
    pub fn stripe(&self, stripe_id: u32) -> Option<&Stripe> {
        stripe_id
            .checked_sub(1)
            .and_then(|i| self.stripes.get(i as usize))
    }

    /// The node addressed by 1-based stripe and node ids.
    pub fn node(&self, stripe_id: u32, node_id: u32) -> Option<&Node> {
        self.stripe(stripe_id)?.node(node_id)
    }

    /// Total number of nodes across all stripes.
    pub fn node_count(&self) -> usize {
        self.stripes.iter().map(|s| s.nodes.len()).sum()
    }

    /// The only node of the cluster, when the topology holds exactly one.
    pub fn single_node(&self) -> Option<&Node> {
        if self.node_count() == 1 {
            self.stripes.iter().flat_map(|s| s.nodes.iter()).next()
        } else {
            None
        }
    }

    /// Apply a batch of expressions in submission order, stopping at the
    /// first failure. Each expression is individually atomic; callers that
    /// need all-or-nothing semantics apply to a clone first.
    pub fn apply_all<'a>(
        &mut self,
        expressions: impl IntoIterator<Item = &'a Expression>,
    ) -> Result<(), ExpressionError> {
        for expression in expressions {
            expression.apply(self)?;
        }
        Ok(())
    }

    /// Export the topology as its complete expression listing, the form the
    /// persistence layer stores one-per-line.
    ///
    /// Applying the listing to a freshly built default cluster of the same
    /// shape reproduces this topology. Settings whose grammar forbids an
    /// empty right-hand side are omitted while unset.
    pub fn to_expressions(&self) -> Result<Vec<Expression>, ExpressionError> {
        let mut lines: Vec<String> = Vec::new();

        if let Some(name) = &self.name {
            lines.push(format!("cluster-name={name}"));
        }
        lines.push(format!("offheap-resources={}", render_map(&self.offheap_resources)));
        if let Some(priority) = &self.failover_priority {
            lines.push(format!("failover-priority={priority}"));
        }
        lines.push(format!("client-reconnect-window={}", self.client_reconnect_window));
        lines.push(format!("client-lease-duration={}", self.client_lease_duration));
        lines.push(format!("ssl-tls={}", self.security_ssl_tls));
        lines.push(format!("whitelist={}", self.security_whitelist));
        lines.push(format!("authc={}", self.security_authc.as_deref().unwrap_or_default()));

        for (stripe_index, stripe) in self.stripes.iter().enumerate() {
            for (node_index, node) in stripe.nodes.iter().enumerate() {
                let ns = format!("stripe.{}.node.{}.", stripe_index + 1, node_index + 1);
                lines.push(format!("{ns}name={}", node.name));
                lines.push(format!("{ns}hostname={}", node.hostname));
                lines.push(format!("{ns}port={}", node.port));
                lines.push(format!("{ns}group-port={}", node.group_port));
                lines.push(format!("{ns}bind-address={}", node.bind_address));
                lines.push(format!("{ns}group-bind-address={}", node.group_bind_address));
                lines.push(format!("{ns}log-dir={}", node.log_dir.display()));
                lines.push(format!("{ns}metadata-dir={}", render_path(&node.metadata_dir)));
                lines.push(format!("{ns}backup-dir={}", render_path(&node.backup_dir)));
                lines.push(format!("{ns}security-dir={}", render_path(&node.security_dir)));
                lines.push(format!("{ns}audit-log-dir={}", render_path(&node.security_audit_log_dir)));
                lines.push(format!("{ns}data-dirs={}", render_path_map(&node.data_dirs)));
                lines.push(format!("{ns}tc-properties={}", render_map(&node.tc_properties)));
            }
        }

        lines.iter().map(|line| line.parse()).collect()
    }
}

/// One stripe: an ordered list of nodes replicating the same data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stripe {
    /// The stripe's nodes, in id order (node 1 first).
    pub nodes: Vec<Node>,
}

impl Stripe {
    /// Build a stripe from its nodes.
    pub fn new(nodes: Vec<Node>) -> Stripe {
        Stripe { nodes }
    }

    /// The node with the given 1-based id.
    pub fn node(&self, node_id: u32) -> Option<&Node> {
        node_id
            .checked_sub(1)
            .and_then(|i| self.nodes.get(i as usize))
    }
}

/// One server node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Symbolic node name.
    pub name: String,
    /// Hostname clients and peers resolve this node by.
    pub hostname: String,
    /// Client port.
    pub port: u16,
    /// Stripe-internal replication port.
    pub group_port: u16,
    /// Interface the client port binds to.
    pub bind_address: String,
    /// Interface the group port binds to.
    pub group_bind_address: String,
    /// Durable metadata directory.
    pub metadata_dir: Option<PathBuf>,
    /// Log directory.
    pub log_dir: PathBuf,
    /// Backup destination; `None` disables backups.
    pub backup_dir: Option<PathBuf>,
    /// Root of the security configuration; `None` means security off.
    pub security_dir: Option<PathBuf>,
    /// Security audit log directory.
    pub security_audit_log_dir: Option<PathBuf>,
    /// Named data directories.
    pub data_dirs: BTreeMap<String, PathBuf>,
    /// Free-form server properties.
    pub tc_properties: BTreeMap<String, String>,
}

impl Node {
    /// Build a node with the given identity, seeding every other attribute
    /// from its catalog default.
    pub fn new(name: impl Into<String>, hostname: impl Into<String>) -> Node {
        Node {
            name: name.into(),
            hostname: hostname.into(),
            port: default_port(Setting::NodePort),
            group_port: default_port(Setting::NodeGroupPort),
            bind_address: default_text(Setting::NodeBindAddress),
            group_bind_address: default_text(Setting::NodeGroupBindAddress),
            metadata_dir: Setting::NodeMetadataDir.default_value().map(PathBuf::from),
            log_dir: PathBuf::from(default_text(Setting::NodeLogDir)),
            backup_dir: None,
            security_dir: None,
            security_audit_log_dir: None,
            data_dirs: default_map(Setting::DataDirs)
                .into_iter()
                .map(|(k, v)| (k, PathBuf::from(v)))
                .collect(),
            tc_properties: BTreeMap::new(),
        }
    }
}

impl Expression {
    /// Mutate `cluster` according to this expression.
    ///
    /// Scope ids are resolved against the topology after the catalog checks
    /// already performed at parse time; out-of-range ids are a distinct
    /// error category from grammar errors. An empty or absent right-hand
    /// side clears settings that admit `unset` at this scope. Each call is
    /// atomic: the value and the target are resolved before anything is
    /// written.
    pub fn apply(&self, cluster: &mut Cluster) -> Result<(), ExpressionError> {
        debug!(expression = %self, "applying configuration expression");
        match self.setting() {
            Setting::LicenseFile => {
                // Imported by the license service; the topology holds nothing.
                debug!("license file import is handled by the license service");
                Ok(())
            }
            // Admits no operation, so no parse-valid expression reaches here.
            Setting::NodeConfigDir => Ok(()),

            Setting::ClusterName => {
                cluster.name = self.value_or_cleared().map(str::to_string);
                Ok(())
            }
            Setting::SecurityAuthc => {
                cluster.security_authc = self.value_or_cleared().map(str::to_string);
                Ok(())
            }
            Setting::FailoverPriority => {
                cluster.failover_priority = self.value_or_cleared().map(str::to_string);
                Ok(())
            }
            Setting::ClientReconnectWindow => {
                cluster.client_reconnect_window = self.required_value()?.to_string();
                Ok(())
            }
            Setting::ClientLeaseDuration => {
                cluster.client_lease_duration = self.required_value()?.to_string();
                Ok(())
            }
            Setting::SecuritySslTls => {
                cluster.security_ssl_tls = self.bool_value()?;
                Ok(())
            }
            Setting::SecurityWhitelist => {
                cluster.security_whitelist = self.bool_value()?;
                Ok(())
            }
            Setting::OffheapResources => {
                self.apply_map_on(&mut cluster.offheap_resources, |v: &str| v.to_string())
            }

            Setting::NodeName => self.set_each(cluster, self.required_value()?, |node, v| {
                node.name = v.to_string();
            }),
            Setting::NodeHostname => self.set_each(cluster, self.required_value()?, |node, v| {
                node.hostname = v.to_string();
            }),
            Setting::NodePort => {
                let port = self.port_value()?;
                self.set_each(cluster, port, |node, v| node.port = *v)
            }
            Setting::NodeGroupPort => {
                let port = self.port_value()?;
                self.set_each(cluster, port, |node, v| node.group_port = *v)
            }
            Setting::NodeBindAddress => self.set_each(cluster, self.required_value()?, |node, v| {
                node.bind_address = v.to_string();
            }),
            Setting::NodeGroupBindAddress => {
                self.set_each(cluster, self.required_value()?, |node, v| {
                    node.group_bind_address = v.to_string();
                })
            }
            Setting::NodeLogDir => self.set_each(cluster, self.required_value()?, |node, v| {
                node.log_dir = PathBuf::from(v);
            }),
            Setting::NodeMetadataDir => {
                let dir = self.value_or_cleared().map(PathBuf::from);
                self.set_each(cluster, dir, |node, v| node.metadata_dir = v.clone())
            }
            Setting::NodeBackupDir => {
                let dir = self.value_or_cleared().map(PathBuf::from);
                self.set_each(cluster, dir, |node, v| node.backup_dir = v.clone())
            }
            Setting::SecurityDir => {
                let dir = self.value_or_cleared().map(PathBuf::from);
                self.set_each(cluster, dir, |node, v| node.security_dir = v.clone())
            }
            Setting::SecurityAuditLogDir => {
                let dir = self.value_or_cleared().map(PathBuf::from);
                self.set_each(cluster, dir, |node, v| node.security_audit_log_dir = v.clone())
            }
            Setting::DataDirs => {
                let nodes = self.target_nodes(cluster)?;
                for node in nodes {
                    self.apply_map_on(&mut node.data_dirs, |v: &str| PathBuf::from(v))?;
                }
                Ok(())
            }
            Setting::TcProperties => {
                let nodes = self.target_nodes(cluster)?;
                for node in nodes {
                    self.apply_map_on(&mut node.tc_properties, |v: &str| v.to_string())?;
                }
                Ok(())
            }
        }
    }

    /// The non-empty value, or `None` when the expression means "clear".
    fn value_or_cleared(&self) -> Option<&str> {
        self.value().filter(|v| !v.is_empty())
    }

    /// The non-empty value of an expression for a setting that cannot be
    /// cleared at apply time.
    fn required_value(&self) -> Result<&str, ExpressionError> {
        self.value_or_cleared()
            .ok_or_else(|| self.rejected(Reason::OperationRequiresValue(Operation::Set)))
    }

    fn bool_value(&self) -> Result<bool, ExpressionError> {
        let value = self.required_value()?;
        value.parse().map_err(|_| {
            self.rejected(Reason::IllegalValue {
                setting: self.setting(),
                value: value.to_string(),
            })
        })
    }

    fn port_value(&self) -> Result<u16, ExpressionError> {
        let value = self.required_value()?;
        value.parse().map_err(|_| {
            self.rejected(Reason::IllegalValue {
                setting: self.setting(),
                value: value.to_string(),
            })
        })
    }

    /// Write one resolved value to every targeted node.
    fn set_each<V>(
        &self,
        cluster: &mut Cluster,
        value: V,
        mut write: impl FnMut(&mut Node, &V),
    ) -> Result<(), ExpressionError> {
        for node in self.target_nodes(cluster)? {
            write(node, &value);
        }
        Ok(())
    }

    /// Resolve the scope against the topology: cluster fans out to every
    /// node, stripe to every node of the stripe, node to exactly one.
    fn target_nodes<'c>(
        &self,
        cluster: &'c mut Cluster,
    ) -> Result<Vec<&'c mut Node>, ExpressionError> {
        match self.scope() {
            Scope::Cluster => Ok(cluster
                .stripes
                .iter_mut()
                .flat_map(|stripe| stripe.nodes.iter_mut())
                .collect()),
            Scope::Stripe { stripe_id } => {
                let stripe = self.resolve_stripe(cluster, stripe_id)?;
                Ok(stripe.nodes.iter_mut().collect())
            }
            Scope::Node { stripe_id, node_id } => {
                let stripe = self.resolve_stripe(cluster, stripe_id)?;
                let node_count = stripe.nodes.len();
                let node = stripe
                    .nodes
                    .get_mut(node_id as usize - 1)
                    .ok_or_else(|| {
                        self.rejected(Reason::NodeNotFound { node_id, stripe_id, node_count })
                    })?;
                Ok(vec![node])
            }
        }
    }

    fn resolve_stripe<'c>(
        &self,
        cluster: &'c mut Cluster,
        stripe_id: u32,
    ) -> Result<&'c mut Stripe, ExpressionError> {
        let stripe_count = cluster.stripes.len();
        cluster
            .stripes
            .get_mut(stripe_id as usize - 1)
            .ok_or_else(|| self.rejected(Reason::StripeNotFound { stripe_id, stripe_count }))
    }

    /// The three wire forms of a map setting: `setting=k1:v1,k2:v2` replaces
    /// the whole map, `setting.key=v` writes one entry, `setting.key=`
    /// removes it.
    fn apply_map_on<V>(
        &self,
        map: &mut BTreeMap<String, V>,
        parse: impl Fn(&str) -> V,
    ) -> Result<(), ExpressionError> {
        match self.key() {
            Some(key) => match self.value_or_cleared() {
                Some(value) => {
                    map.insert(key.to_string(), parse(value));
                }
                None => {
                    map.remove(key);
                }
            },
            None => match self.value_or_cleared() {
                Some(value) => *map = self.parse_map_value(value, &parse)?,
                None => map.clear(),
            },
        }
        Ok(())
    }

    fn parse_map_value<V>(
        &self,
        value: &str,
        parse: &impl Fn(&str) -> V,
    ) -> Result<BTreeMap<String, V>, ExpressionError> {
        let mut out = BTreeMap::new();
        for pair in value.split(',') {
            let (k, v) = pair.split_once(':').ok_or_else(|| {
                self.rejected(Reason::IllegalValue {
                    setting: self.setting(),
                    value: value.to_string(),
                })
            })?;
            out.insert(k.to_string(), parse(v));
        }
        Ok(out)
    }
}

fn default_text(setting: Setting) -> String {
    setting.default_value().unwrap_or_default().to_string()
}

fn default_port(setting: Setting) -> u16 {
    setting
        .default_value()
        .and_then(|v| v.parse().ok())
        .unwrap_or_default()
}

fn default_map(setting: Setting) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    if let Some(value) = setting.default_value() {
        for pair in value.split(',') {
            if let Some((k, v)) = pair.split_once(':') {
                out.insert(k.to_string(), v.to_string());
            }
        }
    }
    out
}

fn render_map(map: &BTreeMap<String, String>) -> String {
    map.iter()
        .map(|(k, v)| format!("{k}:{v}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn render_path_map(map: &BTreeMap<String, PathBuf>) -> String {
    map.iter()
        .map(|(k, v)| format!("{k}:{}", v.display()))
        .collect::<Vec<_>>()
        .join(",")
}

fn render_path(path: &Option<PathBuf>) -> String {
    path.as_deref()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}
