//! Self-describing transport encoding for passing a whole tree across a
//! boundary that cannot share memory.
//!
//! Binary layout per node, in pre-order:
//!
//! ```text
//! kind ordinal      u32 LE
//! condition         marker u8 (0 = none, 1 = present) [field, attribute, value]
//! left subtree      marker u8 [node]
//! right subtree     marker u8 [node]
//! ```
//!
//! Strings are a u32 LE byte length followed by UTF-8 bytes. MPTT labels
//! are not transported.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::domain::condition::{Attribute, SearchCondition, SearchField};
use crate::domain::error::{DomainError, TreeResult};
use crate::domain::tree::{ConditionNode, ConditionsTree, NodeId, NodeKind, Side};

const ABSENT: u8 = 0;
const PRESENT: u8 = 1;

/// Owned, recursive form of a tree; serializable with serde.
///
/// Being a nested value, it is meant for display-sized trees. The binary
/// form below has no nesting limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportNode {
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<SearchCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<Box<TransportNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<Box<TransportNode>>,
}

impl TransportNode {
    /// Snapshot of the tree rooted at `root`.
    pub fn from_tree(tree: &ConditionsTree, root: NodeId) -> TreeResult<Self> {
        // reverse pre-order sees every child before its parent
        let mut built: HashMap<NodeId, TransportNode> = HashMap::new();
        for id in tree.preorder(root)?.into_iter().rev() {
            let node = tree.node(id)?;
            let left = node.left().and_then(|child| built.remove(&child)).map(Box::new);
            let right = node.right().and_then(|child| built.remove(&child)).map(Box::new);
            built.insert(
                id,
                Self {
                    kind: node.kind(),
                    condition: node.condition().cloned(),
                    left,
                    right,
                },
            );
        }
        built.remove(&root).ok_or(DomainError::UnknownNode(root))
    }

    /// Materializes the snapshot as a fresh tree with parent links restored.
    pub fn into_tree(self) -> TreeResult<ConditionsTree> {
        let mut tree = ConditionsTree::new();
        let mut stack = vec![(self, None)];

        while let Some((node, slot)) = stack.pop() {
            let id = tree.insert_detached(arena_node(node.kind, node.condition)?);
            if let Some((parent, side)) = slot {
                tree.attach(parent, side, id)?;
            }
            if let Some(right) = node.right {
                stack.push((*right, Some((id, Side::Right))));
            }
            if let Some(left) = node.left {
                stack.push((*left, Some((id, Side::Left))));
            }
        }
        Ok(tree)
    }
}

fn arena_node(kind: NodeKind, condition: Option<SearchCondition>) -> TreeResult<ConditionNode> {
    match (kind, condition) {
        (NodeKind::Condition, Some(condition)) => Ok(ConditionNode::leaf(condition)),
        (NodeKind::Condition, None) => {
            Err(DomainError::Decode("condition node without predicate".into()))
        }
        (kind, None) => Ok(ConditionNode::operator(kind)),
        (kind, Some(_)) => Err(DomainError::Decode(format!("{} node carries a predicate", kind))),
    }
}

/// Pending output while encoding: a node body or the presence marker of a child slot.
enum Step {
    Node(NodeId),
    Child(Option<NodeId>),
}

/// Encodes the tree rooted at `root`.
#[instrument(level = "debug", skip(tree))]
pub fn encode(tree: &ConditionsTree, root: NodeId) -> TreeResult<Vec<u8>> {
    let mut buf = Vec::new();
    let mut stack = vec![Step::Node(root)];

    while let Some(step) = stack.pop() {
        match step {
            Step::Node(id) => {
                let node = tree.node(id)?;
                write_header(&mut buf, node.kind(), node.condition());
                // the left subtree is written completely before the right marker
                stack.push(Step::Child(node.right()));
                stack.push(Step::Child(node.left()));
            }
            Step::Child(Some(id)) => {
                buf.push(PRESENT);
                stack.push(Step::Node(id));
            }
            Step::Child(None) => buf.push(ABSENT),
        }
    }
    Ok(buf)
}

/// Decodes bytes produced by [`encode`].
#[instrument(level = "debug", skip(bytes), fields(len = bytes.len()))]
pub fn decode(bytes: &[u8]) -> TreeResult<ConditionsTree> {
    let mut reader = Reader { bytes, pos: 0 };
    let tree = reader.read_tree()?;
    if reader.pos != bytes.len() {
        return Err(DomainError::Decode(format!(
            "{} trailing bytes",
            bytes.len() - reader.pos
        )));
    }
    Ok(tree)
}

fn write_header(buf: &mut Vec<u8>, kind: NodeKind, condition: Option<&SearchCondition>) {
    buf.extend_from_slice(&kind.ordinal().to_le_bytes());

    match condition {
        Some(condition) => {
            buf.push(PRESENT);
            write_str(buf, condition.field.as_str());
            write_str(buf, condition.attribute.as_str());
            write_str(buf, &condition.value);
        }
        None => buf.push(ABSENT),
    }
}

fn write_str(buf: &mut Vec<u8>, s: &str) {
    // u32 length prefix; predicate strings are far below 4 GiB
    buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> TreeResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| DomainError::Decode(format!("truncated input at byte {}", self.pos)))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u8(&mut self) -> TreeResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> TreeResult<u32> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(raw))
    }

    fn read_string(&mut self) -> TreeResult<String> {
        let len = self.read_u32()? as usize;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).map_err(|e| DomainError::Decode(e.to_string()))
    }

    fn read_marker(&mut self) -> TreeResult<bool> {
        match self.read_u8()? {
            ABSENT => Ok(false),
            PRESENT => Ok(true),
            other => Err(DomainError::Decode(format!(
                "invalid presence marker {} at byte {}",
                other,
                self.pos - 1
            ))),
        }
    }

    /// Kind ordinal and optional predicate of one node.
    fn read_header(&mut self) -> TreeResult<ConditionNode> {
        let ordinal = self.read_u32()?;
        let kind = NodeKind::from_ordinal(ordinal)
            .ok_or_else(|| DomainError::Decode(format!("unknown kind ordinal {}", ordinal)))?;

        let condition = if self.read_marker()? {
            let field: SearchField = self.read_string()?.parse()?;
            let attribute: Attribute = self.read_string()?.parse()?;
            let value = self.read_string()?;
            Some(SearchCondition::new(field, attribute, value))
        } else {
            None
        };
        arena_node(kind, condition)
    }

    /// Reads one whole tree. `open` holds the nodes whose left subtree is
    /// being read; their right marker follows once that subtree is done.
    fn read_tree(&mut self) -> TreeResult<ConditionsTree> {
        let mut tree = ConditionsTree::new();
        let mut open: Vec<NodeId> = Vec::new();
        let mut slot: Option<(NodeId, Side)> = None;

        loop {
            let id = tree.insert_detached(self.read_header()?);
            if let Some((parent, side)) = slot {
                tree.attach(parent, side, id)?;
            }
            if self.read_marker()? {
                open.push(id);
                slot = Some((id, Side::Left));
                continue;
            }

            let mut current = id;
            loop {
                if self.read_marker()? {
                    slot = Some((current, Side::Right));
                    break;
                }
                match open.pop() {
                    Some(parent) => current = parent,
                    None => return Ok(tree),
                }
            }
        }
    }
}
