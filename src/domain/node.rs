//! Generic tree core shared by every Corefile node kind.
//!
//! A `TreeNode<C>` carries the fields common to zones, plugins and properties:
//! render depth, name, display label, positional arguments and an ordered map of
//! children keyed by their name. Kinds differ only in the child type they allow
//! and in small extras (a zone's port), see `crate::domain::coredns`.

use std::convert::Infallible;

use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{instrument, trace};

use crate::domain::error::{DomainError, DomainResult};

/// Indentation unit, one per level of depth.
pub const INDENT: &str = "\t";

/// Anything that can be owned by a `TreeNode`.
pub trait Node {
    /// Key under which the owner stores this node.
    fn name(&self) -> &str;

    /// Directive block text, including this node's own indentation.
    fn render(&self) -> String;
}

/// Conversion to and from the plain persisted representation.
pub trait PlainForm: Sized {
    fn to_plain(&self) -> PlainNode;
    fn from_plain(plain: &PlainNode) -> DomainResult<Self>;
}

/// Plain, serializable form of any node kind.
///
/// `port` is only present for zones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlainNode {
    pub depth: usize,
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default)]
    pub objects: IndexMap<String, PlainNode>,
}

// Leaves are `TreeNode<Infallible>`: no child value can ever exist.
impl Node for Infallible {
    fn name(&self) -> &str {
        match *self {}
    }

    fn render(&self) -> String {
        match *self {}
    }
}

impl PlainForm for Infallible {
    fn to_plain(&self) -> PlainNode {
        match *self {}
    }

    fn from_plain(plain: &PlainNode) -> DomainResult<Self> {
        Err(DomainError::InvalidPlain {
            kind: "leaf",
            name: plain.name.clone(),
            message: "leaf nodes cannot own objects".to_string(),
        })
    }
}

/// Hierarchical directive node.
#[derive(Debug, Clone)]
pub struct TreeNode<C> {
    depth: usize,
    name: String,
    display_name: String,
    args: Vec<String>,
    children: IndexMap<String, C>,
}

impl<C: Node> TreeNode<C> {
    /// Create a node; children are keyed by their own name.
    ///
    /// # Errors
    /// `DomainError::NegativeDepth` if `depth < 0`.
    pub fn new(
        depth: i64,
        name: impl Into<String>,
        args: Vec<String>,
        children: impl IntoIterator<Item = C>,
    ) -> DomainResult<Self> {
        let depth = usize::try_from(depth).map_err(|_| DomainError::NegativeDepth(depth))?;
        Ok(Self::at_depth(depth, name, args, children))
    }

    /// Infallible constructor for kinds whose depth is fixed.
    pub(crate) fn at_depth(
        depth: usize,
        name: impl Into<String>,
        args: Vec<String>,
        children: impl IntoIterator<Item = C>,
    ) -> Self {
        let name = name.into();
        let children = children
            .into_iter()
            .map(|child| (child.name().to_string(), child))
            .collect();

        Self {
            depth,
            display_name: name.clone(),
            name,
            args,
            children,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub(crate) fn set_display_name(&mut self, display_name: String) {
        self.display_name = display_name;
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn children(&self) -> &IndexMap<String, C> {
        &self.children
    }

    pub fn child(&self, name: &str) -> Option<&C> {
        self.children.get(name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut C> {
        self.children.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.children.contains_key(name)
    }

    /// Drop every child.
    pub fn clear_children(&mut self) {
        self.children.clear();
    }

    /// Insert `child` under its name.
    ///
    /// Returns the stored child, or `None` when a child with the same name exists
    /// and `replace` is false (nothing is changed in that case). Replacing is a full
    /// overwrite that keeps the original position.
    #[instrument(level = "trace", skip(self, child), fields(owner = %self.name, child = %child.name()))]
    pub fn add_child(&mut self, child: C, replace: bool) -> Option<&C> {
        if !replace && self.children.contains_key(child.name()) {
            trace!("child exists, not replacing");
            return None;
        }
        let (index, _) = self.children.insert_full(child.name().to_string(), child);
        self.children.get_index(index).map(|(_, c)| c)
    }

    /// Remove and return the child called `name`, if present.
    #[instrument(level = "trace", skip(self), fields(owner = %self.name))]
    pub fn remove_child(&mut self, name: &str) -> Option<C> {
        self.children.shift_remove(name)
    }

    /// Render as `<indent><display_name> <args>` with an optional brace block
    /// holding one line per child.
    pub fn render(&self) -> String {
        let indent = INDENT.repeat(self.depth);
        let mut out = format!("{indent}{}", self.display_name);
        for arg in &self.args {
            out.push(' ');
            out.push_str(arg);
        }

        if !self.children.is_empty() {
            let body = self.children.values().map(Node::render).join("\n");
            out.push_str(" {\n");
            out.push_str(&body);
            out.push('\n');
            out.push_str(&indent);
            out.push('}');
        }

        out
    }
}

impl<C: Node + PlainForm> TreeNode<C> {
    /// Plain form without a port; zones add theirs on top.
    pub fn to_plain(&self) -> PlainNode {
        PlainNode {
            depth: self.depth,
            name: self.name.clone(),
            display_name: self.display_name.clone(),
            args: self.args.clone(),
            port: None,
            objects: self
                .children
                .iter()
                .map(|(key, child)| (key.clone(), child.to_plain()))
                .collect(),
        }
    }

    /// Rebuild children from a plain `objects` map.
    ///
    /// Each entry's key must match the name stored inside it.
    pub fn children_from_plain(
        kind: &'static str,
        plain: &PlainNode,
    ) -> DomainResult<Vec<C>> {
        plain
            .objects
            .iter()
            .map(|(key, object)| {
                if key != &object.name {
                    return Err(DomainError::InvalidPlain {
                        kind,
                        name: plain.name.clone(),
                        message: format!("object key '{}' does not match name '{}'", key, object.name),
                    });
                }
                C::from_plain(object)
            })
            .collect()
    }
}

impl<C: Node> Node for TreeNode<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn render(&self) -> String {
        TreeNode::render(self)
    }
}

impl<C: Node + PlainForm> PlainForm for TreeNode<C> {
    fn to_plain(&self) -> PlainNode {
        TreeNode::to_plain(self)
    }

    fn from_plain(plain: &PlainNode) -> DomainResult<Self> {
        let children = Self::children_from_plain("node", plain)?;
        let mut node = Self::new(plain.depth as i64, plain.name.clone(), plain.args.clone(), children)?;
        node.set_display_name(plain.display_name.clone());
        Ok(node)
    }
}

/// Structural equality: depth, name, ordered args and children as a map.
/// Child order and display label are ignored.
impl<C: PartialEq> PartialEq for TreeNode<C> {
    fn eq(&self, other: &Self) -> bool {
        self.depth == other.depth
            && self.name == other.name
            && self.args == other.args
            && self.children == other.children
    }
}

impl<C: Eq> Eq for TreeNode<C> {}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    type Leaf = TreeNode<Infallible>;
    type Inner = TreeNode<Leaf>;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn leaf(depth: i64, name: &str, a: &[&str]) -> Leaf {
        Leaf::new(depth, name, args(a), []).unwrap()
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(2)]
    #[case(17)]
    fn given_non_negative_depth_when_constructing_then_succeeds(#[case] depth: i64) {
        let node = leaf(depth, "obj", &[]);
        assert_eq!(node.depth(), depth as usize);
    }

    #[rstest]
    #[case(-1)]
    #[case(-42)]
    fn given_negative_depth_when_constructing_then_fails(#[case] depth: i64) {
        let result = Leaf::new(depth, "obj", vec![], []);
        assert_eq!(result.unwrap_err(), DomainError::NegativeDepth(depth));
    }

    #[test]
    fn given_leaf_when_rendering_then_single_indented_line() {
        assert_eq!(leaf(0, "obj1", &["arg1", "arg2"]).render(), "obj1 arg1 arg2");
        assert_eq!(leaf(1, "obj2", &[]).render(), "\tobj2");
    }

    #[test]
    fn given_children_when_rendering_then_brace_block_one_level_deeper() {
        let node = Inner::new(
            1,
            "plugin",
            args(&["arg"]),
            [leaf(2, "a", &["x"]), leaf(2, "b", &[])],
        )
        .unwrap();

        assert_eq!(node.render(), "\tplugin arg {\n\t\ta x\n\t\tb\n\t}");
    }

    #[test]
    fn given_existing_child_when_adding_without_replace_then_unchanged() {
        let mut node = Inner::new(1, "p", vec![], [leaf(2, "a", &["old"])]).unwrap();

        assert!(node.add_child(leaf(2, "a", &["new"]), false).is_none());
        assert_eq!(node.child("a").unwrap().args(), ["old".to_string()]);
    }

    #[test]
    fn given_existing_child_when_adding_with_replace_then_overwrites_in_place() {
        let mut node =
            Inner::new(1, "p", vec![], [leaf(2, "a", &["old"]), leaf(2, "b", &[])]).unwrap();

        let added = node.add_child(leaf(2, "a", &["new"]), true).cloned();

        assert_eq!(added, Some(leaf(2, "a", &["new"])));
        assert_eq!(node.children().keys().collect::<Vec<_>>(), ["a", "b"]);
    }

    #[test]
    fn given_missing_child_when_removing_then_none_and_unchanged() {
        let mut node = Inner::new(1, "p", vec![], [leaf(2, "a", &[])]).unwrap();

        assert!(node.remove_child("zzz").is_none());
        assert_eq!(node.children().len(), 1);
        assert_eq!(node.remove_child("a"), Some(leaf(2, "a", &[])));
        assert!(node.children().is_empty());
    }

    #[test]
    fn given_reordered_children_when_comparing_then_equal() {
        let a = Inner::new(1, "p", vec![], [leaf(2, "a", &[]), leaf(2, "b", &[])]).unwrap();
        let b = Inner::new(1, "p", vec![], [leaf(2, "b", &[]), leaf(2, "a", &[])]).unwrap();

        assert_eq!(a, b);
        assert_eq!(b, a);
    }

    #[test]
    fn given_different_arg_order_or_count_when_comparing_then_not_equal() {
        assert_ne!(leaf(2, "a", &["x", "y"]), leaf(2, "a", &["y", "x"]));
        assert_ne!(leaf(2, "a", &["x"]), leaf(2, "a", &["x", "y"]));
        assert_ne!(leaf(1, "a", &[]), leaf(2, "a", &[]));
    }

    #[test]
    fn given_nested_node_when_plain_round_trip_then_equal() {
        let node = Inner::new(1, "p", args(&["1"]), [leaf(2, "a", &["x"])]).unwrap();

        let restored = Inner::from_plain(&node.to_plain()).unwrap();

        assert_eq!(restored, node);
        assert_eq!(restored.display_name(), "p");
    }

    #[test]
    fn given_leaf_plain_with_objects_when_restoring_then_fails() {
        let mut plain = leaf(2, "a", &[]).to_plain();
        plain.objects.insert("b".into(), leaf(2, "b", &[]).to_plain());

        assert!(matches!(
            Leaf::from_plain(&plain),
            Err(DomainError::InvalidPlain { .. })
        ));
    }
}
