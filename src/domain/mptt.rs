//! Flat row encoding of a condition tree (modified preorder tree traversal).
//!
//! A labeled tree is stored as one row per node. Read back in ascending
//! left-label order, the rows are enough to rebuild the tree with a single
//! stack pass.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::domain::condition::{Attribute, SearchCondition, SearchField};
use crate::domain::error::{DomainError, TreeResult};
use crate::domain::tree::{ConditionNode, ConditionsTree, NodeId, NodeKind, Side};

/// One persisted node.
///
/// AND/OR rows leave `field`, `attribute` and `value` empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionRow {
    pub field: Option<String>,
    pub value: Option<String>,
    pub attribute: Option<String>,
    pub left_label: u32,
    pub right_label: u32,
    pub kind: String,
}

/// Read access to a persisted row, whatever holds it.
pub trait RowRecord {
    fn field(&self) -> Option<&str>;
    fn value(&self) -> Option<&str>;
    fn attribute(&self) -> Option<&str>;
    fn left_label(&self) -> u32;
    fn right_label(&self) -> u32;
    fn kind(&self) -> &str;
}

impl RowRecord for ConditionRow {
    fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    fn attribute(&self) -> Option<&str> {
        self.attribute.as_deref()
    }

    fn left_label(&self) -> u32 {
        self.left_label
    }

    fn right_label(&self) -> u32 {
        self.right_label
    }

    fn kind(&self) -> &str {
        &self.kind
    }
}

impl<T: RowRecord + ?Sized> RowRecord for &T {
    fn field(&self) -> Option<&str> {
        (**self).field()
    }

    fn value(&self) -> Option<&str> {
        (**self).value()
    }

    fn attribute(&self) -> Option<&str> {
        (**self).attribute()
    }

    fn left_label(&self) -> u32 {
        (**self).left_label()
    }

    fn right_label(&self) -> u32 {
        (**self).right_label()
    }

    fn kind(&self) -> &str {
        (**self).kind()
    }
}

/// How much the rebuild trusts its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RebuildMode {
    /// Reject rows that do not describe exactly one well-formed tree.
    #[default]
    Strict,
    /// Trust the row order; later rows overwrite occupied child slots.
    Lenient,
}

/// Rows for the subtree at `root`, using the labels currently stored.
///
/// Pre-order is ascending left-label order for a freshly labeled tree.
pub fn flatten(tree: &ConditionsTree, root: NodeId) -> TreeResult<Vec<ConditionRow>> {
    tree.preorder(root)?
        .into_iter()
        .map(|id| tree.node(id).map(row_from_node))
        .collect()
}

/// Labels from `root` and then flattens.
#[instrument(level = "debug", skip(tree))]
pub fn label_and_flatten(tree: &mut ConditionsTree, root: NodeId) -> TreeResult<Vec<ConditionRow>> {
    tree.apply_mptt_label(root)?;
    flatten(tree, root)
}

fn row_from_node(node: &ConditionNode) -> ConditionRow {
    let condition = node.condition();
    ConditionRow {
        field: condition.map(|c| c.field.as_str().to_string()),
        value: condition.map(|c| c.value.clone()),
        attribute: condition.map(|c| c.attribute.as_str().to_string()),
        left_label: node.left_label(),
        right_label: node.right_label(),
        kind: node.kind().as_str().to_string(),
    }
}

/// Decodes one row into a detached node carrying the row's labels.
fn node_from_row<R: RowRecord>(row: &R, position: usize) -> TreeResult<ConditionNode> {
    let kind: NodeKind = row.kind().parse()?;
    let node = match kind {
        NodeKind::Condition => {
            let field = row
                .field()
                .ok_or_else(|| DomainError::malformed(position, "condition row without field"))?;
            let attribute = row
                .attribute()
                .ok_or_else(|| DomainError::malformed(position, "condition row without attribute"))?;
            let value = row
                .value()
                .ok_or_else(|| DomainError::malformed(position, "condition row without value"))?;
            let field: SearchField = field.parse()?;
            let attribute: Attribute = attribute.parse()?;
            ConditionNode::leaf(SearchCondition::new(field, attribute, value))
        }
        operator => ConditionNode::operator(operator),
    };
    Ok(node.with_labels(row.left_label(), row.right_label()))
}

/// Rebuilds a tree from rows ordered by ascending left label.
///
/// The first row is the root. A row whose right label is below the right
/// label of the stack top nests inside it and becomes its left child;
/// otherwise finished subtrees are popped and the row becomes the right
/// child of the first node still enclosing it. Either way the row is
/// pushed, since its own children come next.
///
/// An empty row sequence produces an empty tree.
#[instrument(level = "debug", skip(rows))]
pub fn build_tree_from_rows<I>(rows: I, mode: RebuildMode) -> TreeResult<ConditionsTree>
where
    I: IntoIterator,
    I::Item: RowRecord,
{
    let strict = mode == RebuildMode::Strict;
    let mut tree = ConditionsTree::new();
    // (node, right label)
    let mut stack: Vec<(NodeId, u32)> = Vec::new();
    let mut previous_left: Option<u32> = None;

    for (position, row) in rows.into_iter().enumerate() {
        let node = node_from_row(&row, position)?;
        let (left, right) = (row.left_label(), row.right_label());

        if strict {
            if left >= right {
                return Err(DomainError::malformed(
                    position,
                    format!("left label {} is not below right label {}", left, right),
                ));
            }
            if previous_left.is_some_and(|prev| left <= prev) {
                return Err(DomainError::malformed(
                    position,
                    "rows are not ordered by ascending left label",
                ));
            }
        }
        previous_left = Some(left);

        let id = tree.insert_detached(node);

        let Some(&(top, top_right)) = stack.last() else {
            if position > 0 {
                return Err(DomainError::malformed(position, "row lies outside the root"));
            }
            stack.push((id, right));
            continue;
        };

        if right < top_right {
            attach_row(&mut tree, top, Side::Left, id, position, strict)?;
            stack.push((id, right));
        } else {
            while stack.last().is_some_and(|&(_, enclosing_right)| enclosing_right < right) {
                stack.pop();
            }
            let Some(&(parent, _)) = stack.last() else {
                return Err(DomainError::malformed(position, "row lies outside the root"));
            };
            attach_row(&mut tree, parent, Side::Right, id, position, strict)?;
            // a right child may itself be an operator whose children follow
            stack.push((id, right));
        }
    }

    if strict {
        ensure_complete(&tree)?;
    }
    debug!("rebuilt tree with {} nodes", tree.len());
    Ok(tree)
}

fn attach_row(
    tree: &mut ConditionsTree,
    parent: NodeId,
    side: Side,
    child: NodeId,
    position: usize,
    strict: bool,
) -> TreeResult<()> {
    let parent_node = tree.node(parent)?;
    let occupant = parent_node.child(side);

    if strict {
        let child_node = tree.node(child)?;
        if parent_node.kind() == NodeKind::Condition {
            return Err(DomainError::malformed(position, "condition row has children"));
        }
        if occupant.is_some() {
            return Err(DomainError::malformed(
                position,
                format!("{:?} child slot is already taken", side),
            ));
        }
        if !(parent_node.left_label() < child_node.left_label()
            && child_node.right_label() < parent_node.right_label())
        {
            return Err(DomainError::malformed(position, "row does not nest inside its parent"));
        }
        if side == Side::Right {
            let left_sibling = parent_node.left().and_then(|id| tree.get(id));
            match left_sibling {
                Some(sibling) if sibling.right_label() < child_node.left_label() => {}
                Some(_) => {
                    return Err(DomainError::malformed(position, "row overlaps its left sibling"));
                }
                None => {
                    return Err(DomainError::malformed(position, "right child without left child"));
                }
            }
        }
    } else if let Some(displaced) = occupant {
        warn!("row {} replaces an occupied {:?} child slot", position, side);
        tree.remove_subtree(displaced);
    }

    tree.attach(parent, side, child)
}

fn ensure_complete(tree: &ConditionsTree) -> TreeResult<()> {
    let Some(root) = tree.root() else {
        return Ok(());
    };
    for (position, id) in tree.preorder(root)?.into_iter().enumerate() {
        let node = tree.node(id)?;
        if node.kind() != NodeKind::Condition && (node.left().is_none() || node.right().is_none()) {
            return Err(DomainError::malformed(
                position,
                format!("{} node is missing a child", node.kind()),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(kind: &str, left: u32, right: u32) -> ConditionRow {
        ConditionRow {
            field: None,
            value: None,
            attribute: None,
            left_label: left,
            right_label: right,
            kind: kind.to_string(),
        }
    }

    fn leaf(value: &str, left: u32, right: u32) -> ConditionRow {
        ConditionRow {
            field: Some("SUBJECT".into()),
            value: Some(value.into()),
            attribute: Some("CONTAINS".into()),
            left_label: left,
            right_label: right,
            kind: "CONDITION".into(),
        }
    }

    #[test]
    fn given_single_row_when_rebuilding_then_tree_is_leaf() {
        let tree = build_tree_from_rows(vec![leaf("a", 1, 2)], RebuildMode::Strict).unwrap();
        let root = tree.root().unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.get(root).unwrap().condition().unwrap().value, "a");
    }

    #[test]
    fn given_no_rows_when_rebuilding_then_tree_is_empty() {
        let tree = build_tree_from_rows(Vec::<ConditionRow>::new(), RebuildMode::Strict).unwrap();
        assert!(tree.is_empty());
        assert_eq!(tree.root(), None);
    }

    #[test]
    fn given_occupied_slot_when_lenient_then_later_row_wins() {
        // OR(1,10) -> AND(2,7) -> a(3,4), b(5,6); c(8,9); then a stray x(9,10)
        let rows = vec![
            op("OR", 1, 10),
            op("AND", 2, 7),
            leaf("a", 3, 4),
            leaf("b", 5, 6),
            leaf("c", 8, 9),
            leaf("x", 9, 10),
        ];
        let tree = build_tree_from_rows(&rows, RebuildMode::Lenient).unwrap();
        let root = tree.root().unwrap();
        let right = tree.get(root).unwrap().right().unwrap();
        assert_eq!(tree.get(right).unwrap().condition().unwrap().value, "x");
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn given_occupied_slot_when_strict_then_rejects() {
        let rows = vec![
            op("OR", 1, 10),
            op("AND", 2, 7),
            leaf("a", 3, 4),
            leaf("b", 5, 6),
            leaf("c", 8, 9),
            leaf("x", 9, 10),
        ];
        let result = build_tree_from_rows(&rows, RebuildMode::Strict);
        assert!(matches!(result, Err(DomainError::MalformedRows { row: 5, .. })));
    }
}
