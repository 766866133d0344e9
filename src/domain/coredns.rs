//! CoreDNS Corefile model: zones own plugins, plugins own properties.
//!
//! ```text
//! .:53 {                      <- Zone (depth 0, name ".", port 53)
//!     kubernetes cluster.local {   <- Plugin (depth 1)
//!         pods insecure        <- Property (depth 2, leaf)
//!     }
//! }
//! ```

use std::convert::Infallible;
use std::fmt;

use indexmap::IndexMap;
use itertools::Itertools;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::node::{Node, PlainForm, PlainNode, TreeNode};

/// Default DNS port used when a zone is added without one.
pub const DEFAULT_PORT: u16 = 53;

/// Plain form of a whole Corefile: zone name to zone.
pub type PlainCorefile = IndexMap<String, PlainNode>;

fn into_args<I, S>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    args.into_iter().map(Into::into).collect()
}

fn check_depth(kind: &'static str, plain: &PlainNode, expected: usize) -> DomainResult<()> {
    if plain.depth != expected {
        return Err(DomainError::InvalidPlain {
            kind,
            name: plain.name.clone(),
            message: format!("expected depth {}, found {}", expected, plain.depth),
        });
    }
    Ok(())
}

// ============================================================
// Property
// ============================================================

/// Leaf directive nested inside a plugin block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    node: TreeNode<Infallible>,
}

impl Property {
    pub const DEPTH: usize = 2;

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            node: TreeNode::at_depth(Self::DEPTH, name, Vec::new(), []),
        }
    }

    pub fn with_args<I, S>(name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            node: TreeNode::at_depth(Self::DEPTH, name, into_args(args), []),
        }
    }

    pub fn node(&self) -> &TreeNode<Infallible> {
        &self.node
    }

    pub fn args(&self) -> &[String] {
        self.node.args()
    }
}

impl Node for Property {
    fn name(&self) -> &str {
        self.node.name()
    }

    fn render(&self) -> String {
        self.node.render()
    }
}

impl PlainForm for Property {
    fn to_plain(&self) -> PlainNode {
        self.node.to_plain()
    }

    fn from_plain(plain: &PlainNode) -> DomainResult<Self> {
        check_depth("property", plain, Self::DEPTH)?;
        if !plain.objects.is_empty() {
            return Err(DomainError::InvalidPlain {
                kind: "property",
                name: plain.name.clone(),
                message: "properties cannot own objects".to_string(),
            });
        }
        Ok(Self::with_args(plain.name.clone(), plain.args.iter().cloned()))
    }
}

// ============================================================
// Plugin
// ============================================================

/// Named directive inside a zone, optionally carrying a block of properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plugin {
    node: TreeNode<Property>,
}

impl Plugin {
    pub const DEPTH: usize = 1;

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            node: TreeNode::at_depth(Self::DEPTH, name, Vec::new(), []),
        }
    }

    pub fn with_args<I, S>(name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            node: TreeNode::at_depth(Self::DEPTH, name, into_args(args), []),
        }
    }

    /// Builder: attach a property, replacing one with the same name.
    pub fn property(mut self, property: Property) -> Self {
        self.node.add_child(property, true);
        self
    }

    pub fn cache() -> Self {
        Self::new("cache")
    }

    pub fn log() -> Self {
        Self::new("log")
    }

    pub fn errors() -> Self {
        Self::new("errors")
    }

    pub fn forward_google() -> Self {
        Self::with_args("forward", [".", "8.8.8.8", "8.8.4.4"])
    }

    pub fn forward_cloudflare() -> Self {
        Self::with_args("forward", [".", "1.1.1.1", "1.0.0.1"])
    }

    pub fn node(&self) -> &TreeNode<Property> {
        &self.node
    }

    pub fn node_mut(&mut self) -> &mut TreeNode<Property> {
        &mut self.node
    }

    pub fn args(&self) -> &[String] {
        self.node.args()
    }

    pub fn properties(&self) -> &IndexMap<String, Property> {
        self.node.children()
    }

    /// Add a property built from `name` and `args`.
    ///
    /// Returns `None` if it exists and `replace` is false.
    pub fn add_property(
        &mut self,
        name: impl Into<String>,
        args: Vec<String>,
        replace: bool,
    ) -> Option<&Property> {
        self.node.add_child(Property::with_args(name, args), replace)
    }

    pub fn remove_property(&mut self, name: &str) -> Option<Property> {
        self.node.remove_child(name)
    }
}

impl Node for Plugin {
    fn name(&self) -> &str {
        self.node.name()
    }

    fn render(&self) -> String {
        self.node.render()
    }
}

impl PlainForm for Plugin {
    fn to_plain(&self) -> PlainNode {
        self.node.to_plain()
    }

    fn from_plain(plain: &PlainNode) -> DomainResult<Self> {
        check_depth("plugin", plain, Self::DEPTH)?;
        let properties = TreeNode::<Property>::children_from_plain("plugin", plain)?;
        Ok(Self {
            node: TreeNode::at_depth(Self::DEPTH, plain.name.clone(), plain.args.clone(), properties),
        })
    }
}

// ============================================================
// Zone
// ============================================================

/// Server block for a DNS name and port, rendered as `name:port`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    node: TreeNode<Plugin>,
    port: u16,
}

impl Zone {
    pub const DEPTH: usize = 0;

    /// Create an empty zone.
    ///
    /// # Errors
    /// `DomainError::InvalidPort` if `port` is negative or above 65535.
    pub fn new(name: impl Into<String>, port: i64) -> DomainResult<Self> {
        let port = u16::try_from(port).map_err(|_| DomainError::InvalidPort(port))?;
        Ok(Self::with_port(name, port))
    }

    /// Create an empty zone on a port that is valid by type.
    pub fn with_port(name: impl Into<String>, port: u16) -> Self {
        let mut node = TreeNode::at_depth(Self::DEPTH, name, Vec::new(), []);
        node.set_display_name(format!("{}:{}", node.name(), port));
        Self { node, port }
    }

    /// Builder: attach a plugin, replacing one with the same name.
    pub fn plugin(mut self, plugin: Plugin) -> Self {
        self.node.add_child(plugin, true);
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn display_name(&self) -> &str {
        self.node.display_name()
    }

    pub fn node(&self) -> &TreeNode<Plugin> {
        &self.node
    }

    pub fn node_mut(&mut self) -> &mut TreeNode<Plugin> {
        &mut self.node
    }

    pub fn plugins(&self) -> &IndexMap<String, Plugin> {
        self.node.children()
    }

    pub fn get_plugin(&self, name: &str) -> Option<&Plugin> {
        self.node.child(name)
    }

    pub fn get_plugin_mut(&mut self, name: &str) -> Option<&mut Plugin> {
        self.node.child_mut(name)
    }

    /// Add a plugin without properties.
    ///
    /// Returns `None` if it exists and `replace` is false.
    pub fn add_plugin(
        &mut self,
        name: impl Into<String>,
        args: Vec<String>,
        replace: bool,
    ) -> Option<&Plugin> {
        self.node.add_child(Plugin::with_args(name, args), replace)
    }

    pub fn remove_plugin(&mut self, name: &str) -> Option<Plugin> {
        self.node.remove_child(name)
    }
}

impl Node for Zone {
    fn name(&self) -> &str {
        self.node.name()
    }

    fn render(&self) -> String {
        self.node.render()
    }
}

impl PlainForm for Zone {
    fn to_plain(&self) -> PlainNode {
        PlainNode {
            port: Some(self.port),
            ..self.node.to_plain()
        }
    }

    fn from_plain(plain: &PlainNode) -> DomainResult<Self> {
        check_depth("zone", plain, Self::DEPTH)?;
        let port = plain.port.ok_or_else(|| DomainError::InvalidPlain {
            kind: "zone",
            name: plain.name.clone(),
            message: "missing port".to_string(),
        })?;
        let plugins = TreeNode::<Plugin>::children_from_plain("zone", plain)?;
        let mut zone = Self::with_port(plain.name.clone(), port);
        for plugin in plugins {
            zone.node.add_child(plugin, true);
        }
        Ok(zone)
    }
}

// ============================================================
// Corefile
// ============================================================

/// Root of the configuration: an ordered set of zones.
///
/// At least one zone is required at construction. Mutations may empty it again;
/// callers that persist or deploy a Corefile check `is_empty` first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Corefile {
    node: TreeNode<Zone>,
}

impl Corefile {
    /// # Errors
    /// `DomainError::EmptyCorefile` if `zones` yields nothing.
    pub fn new(zones: impl IntoIterator<Item = Zone>) -> DomainResult<Self> {
        let node = TreeNode::at_depth(0, "", Vec::new(), zones);
        if node.children().is_empty() {
            return Err(DomainError::EmptyCorefile);
        }
        Ok(Self { node })
    }

    pub fn zones(&self) -> &IndexMap<String, Zone> {
        self.node.children()
    }

    pub fn is_empty(&self) -> bool {
        self.node.children().is_empty()
    }

    pub fn zone(&self, name: &str) -> Option<&Zone> {
        self.node.child(name)
    }

    pub fn zone_mut(&mut self, name: &str) -> Option<&mut Zone> {
        self.node.child_mut(name)
    }

    pub fn plugin(&self, zone: &str, plugin: &str) -> Option<&Plugin> {
        self.zone(zone)?.get_plugin(plugin)
    }

    pub fn plugin_mut(&mut self, zone: &str, plugin: &str) -> Option<&mut Plugin> {
        self.zone_mut(zone)?.get_plugin_mut(plugin)
    }

    /// Add an empty zone.
    ///
    /// Returns `Ok(None)` if it exists and `replace` is false.
    pub fn add_zone(
        &mut self,
        name: impl Into<String>,
        port: i64,
        replace: bool,
    ) -> DomainResult<Option<&Zone>> {
        let zone = Zone::new(name, port)?;
        Ok(self.node.add_child(zone, replace))
    }

    pub fn insert_zone(&mut self, zone: Zone, replace: bool) -> Option<&Zone> {
        self.node.add_child(zone, replace)
    }

    pub fn remove_zone(&mut self, name: &str) -> Option<Zone> {
        self.node.remove_child(name)
    }

    /// Drop every zone. The result is not deployable until a zone is added.
    pub fn reset(&mut self) {
        self.node.clear_children();
    }

    /// Zone blocks separated by a blank line.
    pub fn render(&self) -> String {
        self.node
            .children()
            .values()
            .map(Zone::render)
            .join("\n\n")
            .trim()
            .to_string()
    }

    pub fn to_plain(&self) -> PlainCorefile {
        self.node
            .children()
            .iter()
            .map(|(name, zone)| (name.clone(), zone.to_plain()))
            .collect()
    }

    pub fn from_plain(plain: &PlainCorefile) -> DomainResult<Self> {
        let zones = plain
            .iter()
            .map(|(key, zone)| {
                if key != &zone.name {
                    return Err(DomainError::InvalidPlain {
                        kind: "corefile",
                        name: key.clone(),
                        message: format!("zone key does not match name '{}'", zone.name),
                    });
                }
                Zone::from_plain(zone)
            })
            .collect::<DomainResult<Vec<_>>>()?;
        Self::new(zones)
    }
}

/// Zone `.:53` forwarding to Cloudflare with logging, errors and cache.
impl Default for Corefile {
    fn default() -> Self {
        let root = Zone::with_port(".", DEFAULT_PORT)
            .plugin(Plugin::forward_cloudflare())
            .plugin(Plugin::log())
            .plugin(Plugin::errors())
            .plugin(Plugin::cache());
        Self {
            node: TreeNode::at_depth(0, "", Vec::new(), [root]),
        }
    }
}

impl fmt::Display for Corefile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}
