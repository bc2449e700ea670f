//! Segment trie.
//!
//! Nodes live in one arena and refer to each other by index: a node owns its
//! children through the tree, and the `parent` index is only used to walk back
//! up when printing a route's full path.
//!
//! Two operations, never mixed:
//!
//! - [`RouteTree::insert`] runs during registration and may create nodes;
//! - [`RouteTree::lookup`] runs per request, takes `&self`, and only writes
//!   into the caller's parameter map.
//!
//! Children are ordered literals first: a literal child is inserted at the
//! front, a parameter child is appended. A node has at most one parameter
//! child, so lookup tries every literal and then falls back to the last child.
//!
//! Request segments are percent-decoded before they are compared or
//! captured; registered labels are taken as written.

use std::borrow::Cow;
use std::collections::HashMap;

use percent_encoding::percent_decode_str;

use crate::error::RouteError;

/// Parameters captured from the path of one request, keyed by name.
pub type Params = HashMap<String, String>;

pub(crate) type NodeId = usize;

const ROOT: NodeId = 0;

/// One path segment as written at registration.
#[derive(Debug, PartialEq, Eq)]
enum Segment<'p> {
    Literal(&'p str),
    /// `:name`.
    Param(&'p str),
}

impl<'p> Segment<'p> {
    fn parse(raw: &'p str) -> Self {
        match raw.strip_prefix(':') {
            Some(name) => Self::Param(name),
            None => Self::Literal(raw),
        }
    }
}

/// Splits a path into its non-empty segments. Leading, trailing and doubled
/// slashes are ignored, so `""`, `"/"` and `"//"` all denote the root.
pub(crate) fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Decodes `%XX` escapes in one request segment. Invalid UTF-8 is replaced
/// rather than rejected.
fn decode(segment: &str) -> Cow<'_, str> {
    percent_decode_str(segment).decode_utf8_lossy()
}

#[derive(Debug)]
struct RouteNode<T> {
    label: String,
    /// Capture name for parameter nodes.
    param: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    value: T,
}

impl<T> RouteNode<T> {
    fn is_param(&self) -> bool {
        self.param.is_some()
    }
}

/// The route trie. `T` is the per-node payload; the router stores a handler
/// table there.
#[derive(Debug)]
pub(crate) struct RouteTree<T> {
    nodes: Vec<RouteNode<T>>,
}

impl<T: Default> RouteTree<T> {
    pub(crate) fn new() -> Self {
        let root = RouteNode {
            label: String::new(),
            param: None,
            parent: None,
            children: Vec::new(),
            value: T::default(),
        };
        Self { nodes: vec![root] }
    }

    /// Walks `path` from the root, creating missing nodes, and returns the
    /// terminal node. Existing nodes are reused, so inserting the same path
    /// twice yields the same node.
    pub(crate) fn insert(&mut self, path: &str) -> Result<NodeId, RouteError> {
        let mut current = ROOT;
        for raw in segments(path) {
            current = match Segment::parse(raw) {
                Segment::Literal(label) => match self.literal_child(current, label) {
                    Some(id) => id,
                    None => {
                        let id = self.push_node(current, label, None);
                        self.nodes[current].children.insert(0, id);
                        id
                    }
                },
                Segment::Param("") => {
                    return Err(RouteError::EmptyParameterName { path: path.to_owned() });
                }
                Segment::Param(name) => match self.param_child(current) {
                    Some((id, existing)) if existing == name => id,
                    Some((_, existing)) => {
                        return Err(RouteError::ConflictingParameter {
                            path: path.to_owned(),
                            existing: existing.to_owned(),
                            new: name.to_owned(),
                        });
                    }
                    None => {
                        let id = self.push_node(current, raw, Some(name));
                        self.nodes[current].children.push(id);
                        id
                    }
                },
            };
        }
        Ok(current)
    }

    fn push_node(&mut self, parent: NodeId, label: &str, param: Option<&str>) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(RouteNode {
            label: label.to_owned(),
            param: param.map(str::to_owned),
            parent: Some(parent),
            children: Vec::new(),
            value: T::default(),
        });
        id
    }
}

impl<T: Default> Default for RouteTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RouteTree<T> {
    /// Matches `path` against the tree, recording parameter captures in
    /// `params`. At each level a literal child wins; otherwise the parameter
    /// child, if any, captures the segment. There is no backtracking: once a
    /// literal matched, a dead end further down is a miss.
    ///
    /// On a miss `params` may hold captures from the levels that did match.
    pub(crate) fn lookup(&self, path: &str, params: &mut Params) -> Option<NodeId> {
        let mut current = ROOT;
        for raw in segments(path) {
            let segment = decode(raw);
            current = match self.literal_child(current, &segment) {
                Some(id) => id,
                None => {
                    let (id, name) = self.param_child(current)?;
                    params.insert(name.to_owned(), segment.into_owned());
                    id
                }
            };
        }
        Some(current)
    }

    fn literal_child(&self, node: NodeId, label: &str) -> Option<NodeId> {
        self.nodes[node]
            .children
            .iter()
            .copied()
            .find(|&id| !self.nodes[id].is_param() && self.nodes[id].label == label)
    }

    /// Parameter children are appended, so only the last child can be one.
    fn param_child(&self, node: NodeId) -> Option<(NodeId, &str)> {
        let id = *self.nodes[node].children.last()?;
        self.nodes[id].param.as_deref().map(|name| (id, name))
    }

    pub(crate) fn get(&self, id: NodeId) -> &T {
        &self.nodes[id].value
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut T {
        &mut self.nodes[id].value
    }

    /// Full path of a node, rebuilt from the parent links: `/todos/:id`.
    pub(crate) fn path_of(&self, id: NodeId) -> String {
        let mut labels = Vec::new();
        let mut current = Some(id);
        while let Some(n) = current {
            let node = &self.nodes[n];
            if node.parent.is_some() {
                labels.push(node.label.as_str());
            }
            current = node.parent;
        }
        labels.reverse();
        format!("/{}", labels.join("/"))
    }

    /// Every node in depth-first order, children in match order.
    pub(crate) fn walk(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![ROOT];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id].children.iter().rev());
        }
        order
    }
}
