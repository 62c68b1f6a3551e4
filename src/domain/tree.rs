//! Arena-based boolean condition tree.
//!
//! Every node lives in one generational arena and is addressed by a
//! [`NodeId`]. Internal nodes own their two children; the parent handle a
//! child keeps is only used to splice new operators into an existing tree.
//! One arena may hold several detached roots while an expression is being
//! assembled from individual leaves.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use generational_arena::{Arena, Index};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::condition::SearchCondition;
use crate::domain::error::{DomainError, TreeResult};

/// Handle of a node inside a [`ConditionsTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Index);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (slot, generation) = self.0.into_raw_parts();
        write!(f, "#{}v{}", slot, generation)
    }
}

/// Node variant. The declaration order is the transport ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeKind {
    And,
    Or,
    Condition,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::And => "AND",
            NodeKind::Or => "OR",
            NodeKind::Condition => "CONDITION",
        }
    }

    pub fn ordinal(&self) -> u32 {
        match self {
            NodeKind::And => 0,
            NodeKind::Or => 1,
            NodeKind::Condition => 2,
        }
    }

    pub fn from_ordinal(ordinal: u32) -> Option<Self> {
        match ordinal {
            0 => Some(NodeKind::And),
            1 => Some(NodeKind::Or),
            2 => Some(NodeKind::Condition),
            _ => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AND" => Ok(NodeKind::And),
            "OR" => Ok(NodeKind::Or),
            "CONDITION" => Ok(NodeKind::Condition),
            other => Err(DomainError::UnknownKind(other.to_string())),
        }
    }
}

/// Child slot of an internal node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Left,
    Right,
}

/// A node stored in the arena.
#[derive(Debug, Clone)]
pub struct ConditionNode {
    kind: NodeKind,
    condition: Option<SearchCondition>,
    parent: Option<Index>,
    left: Option<Index>,
    right: Option<Index>,
    left_label: u32,
    right_label: u32,
}

impl ConditionNode {
    pub(crate) fn leaf(condition: SearchCondition) -> Self {
        Self {
            kind: NodeKind::Condition,
            condition: Some(condition),
            parent: None,
            left: None,
            right: None,
            left_label: 0,
            right_label: 0,
        }
    }

    /// Internal node. `kind` must be AND or OR.
    pub(crate) fn operator(kind: NodeKind) -> Self {
        debug_assert!(kind != NodeKind::Condition);
        Self {
            kind,
            condition: None,
            parent: None,
            left: None,
            right: None,
            left_label: 0,
            right_label: 0,
        }
    }

    pub(crate) fn with_labels(mut self, left_label: u32, right_label: u32) -> Self {
        self.left_label = left_label;
        self.right_label = right_label;
        self
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Predicate of a CONDITION node, `None` for AND/OR.
    pub fn condition(&self) -> Option<&SearchCondition> {
        self.condition.as_ref()
    }

    pub fn left(&self) -> Option<NodeId> {
        self.left.map(NodeId)
    }

    pub fn right(&self) -> Option<NodeId> {
        self.right.map(NodeId)
    }

    /// MPTT left label; only meaningful right after labeling.
    pub fn left_label(&self) -> u32 {
        self.left_label
    }

    /// MPTT right label; only meaningful right after labeling.
    pub fn right_label(&self) -> u32 {
        self.right_label
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    pub(crate) fn child(&self, side: Side) -> Option<NodeId> {
        match side {
            Side::Left => self.left(),
            Side::Right => self.right(),
        }
    }
}

/// Boolean expression tree of search conditions.
#[derive(Debug, Clone)]
pub struct ConditionsTree {
    arena: Arena<ConditionNode>,
}

impl Default for ConditionsTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ConditionsTree {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
        }
    }

    /// Tree consisting of a single leaf.
    pub fn from_condition(condition: SearchCondition) -> Self {
        let mut tree = Self::new();
        tree.insert_leaf(condition);
        tree
    }

    /// Inserts a detached leaf and returns its handle.
    #[instrument(level = "trace", skip(self))]
    pub fn insert_leaf(&mut self, condition: SearchCondition) -> NodeId {
        NodeId(self.arena.insert(ConditionNode::leaf(condition)))
    }

    pub(crate) fn insert_detached(&mut self, node: ConditionNode) -> NodeId {
        NodeId(self.arena.insert(node))
    }

    pub fn get(&self, id: NodeId) -> Option<&ConditionNode> {
        self.arena.get(id.0)
    }

    pub(crate) fn node(&self, id: NodeId) -> TreeResult<&ConditionNode> {
        self.arena.get(id.0).ok_or(DomainError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> TreeResult<&mut ConditionNode> {
        self.arena.get_mut(id.0).ok_or(DomainError::UnknownNode(id))
    }

    /// Mutable access to the predicate of a CONDITION node.
    pub fn condition_mut(&mut self, id: NodeId) -> TreeResult<&mut SearchCondition> {
        let node = self.node_mut(id)?;
        let kind = node.kind;
        node.condition
            .as_mut()
            .ok_or_else(|| DomainError::InvalidState(format!("{} node {} holds no condition", kind, id)))
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// All nodes without a parent.
    pub fn roots(&self) -> Vec<NodeId> {
        self.arena
            .iter()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(idx, _)| NodeId(idx))
            .collect()
    }

    /// The root, if the arena holds exactly one tree.
    pub fn root(&self) -> Option<NodeId> {
        let roots = self.roots();
        match roots.as_slice() {
            [root] => Some(*root),
            _ => None,
        }
    }

    pub fn is_root(&self, id: NodeId) -> TreeResult<bool> {
        Ok(self.node(id)?.parent.is_none())
    }

    /// Joins `at` and the detached root `expr` with AND; returns the new node.
    pub fn and(&mut self, at: NodeId, expr: NodeId) -> TreeResult<NodeId> {
        self.combine(at, expr, NodeKind::And)
    }

    /// Joins `at` and the detached root `expr` with OR; returns the new node.
    pub fn or(&mut self, at: NodeId, expr: NodeId) -> TreeResult<NodeId> {
        self.combine(at, expr, NodeKind::Or)
    }

    /// Wraps `condition` in a new leaf and ANDs it with `at`.
    pub fn and_condition(&mut self, at: NodeId, condition: SearchCondition) -> TreeResult<NodeId> {
        self.node(at)?;
        let leaf = self.insert_leaf(condition);
        self.combine(at, leaf, NodeKind::And)
    }

    /// Wraps `condition` in a new leaf and ORs it with `at`.
    pub fn or_condition(&mut self, at: NodeId, condition: SearchCondition) -> TreeResult<NodeId> {
        self.node(at)?;
        let leaf = self.insert_leaf(condition);
        self.combine(at, leaf, NodeKind::Or)
    }

    /// Creates an operator node with `at` on the left and `expr` on the right.
    ///
    /// If `at` is embedded in a larger tree the new node takes its place
    /// under the old parent.
    #[instrument(level = "debug", skip(self))]
    fn combine(&mut self, at: NodeId, expr: NodeId, kind: NodeKind) -> TreeResult<NodeId> {
        let at_parent = self.node(at)?.parent;
        if self.node(expr)?.parent.is_some() || expr == at {
            return Err(DomainError::InvalidOperation(
                "can only combine from a root node downward".to_string(),
            ));
        }
        if self.is_ancestor(expr, at_parent) {
            return Err(DomainError::InvalidOperation(format!(
                "{} is the root above {}; combining would form a cycle",
                expr, at
            )));
        }

        let mut op = ConditionNode::operator(kind);
        op.parent = at_parent;
        op.left = Some(at.0);
        op.right = Some(expr.0);
        let op_idx = self.arena.insert(op);

        if let Some(parent_idx) = at_parent {
            self.replace_child(parent_idx, at.0, op_idx);
        }
        self.node_mut(at)?.parent = Some(op_idx);
        self.node_mut(expr)?.parent = Some(op_idx);

        debug!("combined {} and {} under {} {}", at, expr, kind, NodeId(op_idx));
        Ok(NodeId(op_idx))
    }

    /// Whether `ancestor` is on the parent chain starting at `from`.
    fn is_ancestor(&self, ancestor: NodeId, from: Option<Index>) -> bool {
        let mut current = from;
        while let Some(idx) = current {
            if idx == ancestor.0 {
                return true;
            }
            current = self.arena.get(idx).and_then(|node| node.parent);
        }
        false
    }

    fn replace_child(&mut self, parent: Index, old_child: Index, new_child: Index) {
        if let Some(node) = self.arena.get_mut(parent) {
            if node.left == Some(old_child) {
                node.left = Some(new_child);
            } else if node.right == Some(old_child) {
                node.right = Some(new_child);
            }
        }
    }

    /// Attaches the detached node `child` into an empty slot of `parent`.
    pub(crate) fn attach(&mut self, parent: NodeId, side: Side, child: NodeId) -> TreeResult<()> {
        self.node(child)?;
        let node = self.node_mut(parent)?;
        match side {
            Side::Left => node.left = Some(child.0),
            Side::Right => node.right = Some(child.0),
        }
        self.node_mut(child)?.parent = Some(parent.0);
        Ok(())
    }

    /// Removes `id` and everything below it.
    pub(crate) fn remove_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id.0];
        while let Some(idx) = stack.pop() {
            if let Some(node) = self.arena.remove(idx) {
                stack.extend(node.left);
                stack.extend(node.right);
            }
        }
    }

    /// Assigns MPTT labels to the subtree below `root`, starting at 1.
    ///
    /// Must be called on the real root before the labels are persisted;
    /// labeling a subtree numbers it as if it were a tree of its own.
    /// Returns the right label of `root`.
    #[instrument(level = "debug", skip(self))]
    pub fn apply_mptt_label(&mut self, root: NodeId) -> TreeResult<u32> {
        self.node(root)?;
        let mut label = 0;
        // (node, closing): a node is visited once on the way down and once on the way up
        let mut stack = vec![(root.0, false)];

        while let Some((idx, closing)) = stack.pop() {
            let Some(node) = self.arena.get_mut(idx) else {
                continue;
            };
            label += 1;
            if closing {
                node.right_label = label;
                continue;
            }
            node.left_label = label;
            let (left, right) = (node.left, node.right);
            stack.push((idx, true));
            stack.extend(right.map(|child| (child, false)));
            stack.extend(left.map(|child| (child, false)));
        }
        Ok(label)
    }

    /// Nodes below `node` in pre-order: node, left subtree, right subtree.
    #[instrument(level = "trace", skip(self))]
    pub fn preorder(&self, node: NodeId) -> TreeResult<Vec<NodeId>> {
        self.node(node)?;
        let mut result = Vec::new();
        let mut stack = vec![node.0];

        while let Some(idx) = stack.pop() {
            if let Some(current) = self.arena.get(idx) {
                // right first so that left is visited first
                stack.extend(current.right);
                stack.extend(current.left);
                result.push(NodeId(idx));
            }
        }
        Ok(result)
    }

    /// All CONDITION nodes reachable from `node`.
    #[instrument(level = "trace", skip(self))]
    pub fn leaf_set(&self, node: NodeId) -> TreeResult<HashSet<NodeId>> {
        Ok(self
            .preorder(node)?
            .into_iter()
            .filter(|id| {
                self.arena
                    .get(id.0)
                    .is_some_and(|n| n.kind == NodeKind::Condition)
            })
            .collect())
    }

    /// Number of levels below and including `node`.
    pub fn depth(&self, node: NodeId) -> TreeResult<usize> {
        self.node(node)?;
        let mut deepest = 0;
        let mut stack = vec![(node.0, 1)];

        while let Some((idx, level)) = stack.pop() {
            if let Some(current) = self.arena.get(idx) {
                deepest = deepest.max(level);
                stack.extend(current.left.map(|child| (child, level + 1)));
                stack.extend(current.right.map(|child| (child, level + 1)));
            }
        }
        Ok(deepest)
    }

    /// Deep copy of the tree rooted at `root`, labels included.
    ///
    /// Only whole trees can be cloned: fails with `InvalidState` when
    /// `root` has a parent.
    #[instrument(level = "debug", skip(self))]
    pub fn clone_tree(&self, root: NodeId) -> TreeResult<ConditionsTree> {
        if self.node(root)?.parent.is_some() {
            return Err(DomainError::InvalidState(
                "can't clone a tree from a non-root node".to_string(),
            ));
        }
        let mut copy = ConditionsTree::new();
        let mut stack: Vec<(Index, Option<(Index, Side)>)> = vec![(root.0, None)];

        while let Some((idx, slot)) = stack.pop() {
            let Some(node) = self.arena.get(idx) else {
                continue;
            };
            let new_idx = copy.arena.insert(ConditionNode {
                parent: slot.map(|(parent, _)| parent),
                left: None,
                right: None,
                ..node.clone()
            });
            if let Some((parent, side)) = slot {
                if let Some(new_parent) = copy.arena.get_mut(parent) {
                    match side {
                        Side::Left => new_parent.left = Some(new_idx),
                        Side::Right => new_parent.right = Some(new_idx),
                    }
                }
            }
            stack.extend(node.right.map(|child| (child, Some((new_idx, Side::Right)))));
            stack.extend(node.left.map(|child| (child, Some((new_idx, Side::Left)))));
        }
        Ok(copy)
    }

    /// Same shape, kinds and predicates below `a` here and `b` in `other`.
    /// Labels are not compared.
    pub fn structurally_eq(&self, a: NodeId, other: &ConditionsTree, b: NodeId) -> bool {
        let mut stack = vec![(a, b)];

        while let Some((a, b)) = stack.pop() {
            let (Some(mine), Some(theirs)) = (self.get(a), other.get(b)) else {
                return false;
            };
            if mine.kind != theirs.kind || mine.condition != theirs.condition {
                return false;
            }
            for (x, y) in [(mine.left(), theirs.left()), (mine.right(), theirs.right())] {
                match (x, y) {
                    (None, None) => {}
                    (Some(x), Some(y)) => stack.push((x, y)),
                    _ => return false,
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::condition::{Attribute, SearchField};

    fn cond(value: &str) -> SearchCondition {
        SearchCondition::new(SearchField::Subject, Attribute::Contains, value)
    }

    #[test]
    fn given_leaf_when_anding_then_returns_new_root() {
        let mut tree = ConditionsTree::new();
        let a = tree.insert_leaf(cond("a"));
        let b = tree.insert_leaf(cond("b"));

        let root = tree.and(a, b).unwrap();

        let node = tree.get(root).unwrap();
        assert_eq!(node.kind(), NodeKind::And);
        assert_eq!(node.left(), Some(a));
        assert_eq!(node.right(), Some(b));
        assert_eq!(tree.root(), Some(root));
        assert!(!tree.is_root(a).unwrap());
    }

    #[test]
    fn given_embedded_node_when_combining_then_splices_under_old_parent() {
        let mut tree = ConditionsTree::new();
        let a = tree.insert_leaf(cond("a"));
        let b = tree.insert_leaf(cond("b"));
        let root = tree.and(a, b).unwrap();
        let c = tree.insert_leaf(cond("c"));

        let spliced = tree.or(b, c).unwrap();

        assert_eq!(tree.get(root).unwrap().right(), Some(spliced));
        assert_eq!(tree.get(spliced).unwrap().left(), Some(b));
        assert_eq!(tree.get(spliced).unwrap().right(), Some(c));
        assert_eq!(tree.root(), Some(root));
    }

    #[test]
    fn given_node_itself_when_combining_then_rejects() {
        let mut tree = ConditionsTree::new();
        let a = tree.insert_leaf(cond("a"));
        assert!(matches!(tree.and(a, a), Err(DomainError::InvalidOperation(_))));
    }

    #[test]
    fn given_root_above_node_when_combining_then_rejects_cycle() {
        let mut tree = ConditionsTree::new();
        let a = tree.insert_leaf(cond("a"));
        let b = tree.insert_leaf(cond("b"));
        let root = tree.and(a, b).unwrap();

        let result = tree.or(a, root);

        assert!(matches!(result, Err(DomainError::InvalidOperation(_))));
        assert_eq!(tree.roots(), vec![root]);
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.preorder(root).unwrap(), vec![root, a, b]);
    }

    #[test]
    fn given_leaf_when_labeling_then_right_is_left_plus_one() {
        let mut tree = ConditionsTree::from_condition(cond("a"));
        let root = tree.root().unwrap();

        assert_eq!(tree.apply_mptt_label(root).unwrap(), 2);
        assert_eq!(tree.get(root).unwrap().left_label(), 1);
        assert_eq!(tree.get(root).unwrap().right_label(), 2);
    }

    #[test]
    fn given_removed_handle_when_accessing_then_unknown_node() {
        let mut tree = ConditionsTree::new();
        let a = tree.insert_leaf(cond("a"));
        tree.remove_subtree(a);
        assert_eq!(tree.preorder(a), Err(DomainError::UnknownNode(a)));
    }
}
