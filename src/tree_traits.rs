/*
Display conversion for condition trees, kept out of the domain module so the
domain doesn't depend on termtree.
 */
use termtree::Tree;
use tracing::instrument;

use crate::domain::{ConditionsTree, NodeId, NodeKind, TreeResult};

pub trait TreeNodeConvert {
    fn to_tree_string(&self, root: NodeId) -> TreeResult<Tree<String>>;
}

impl TreeNodeConvert for ConditionsTree {
    #[instrument(level = "debug", skip(self))]
    fn to_tree_string(&self, root: NodeId) -> TreeResult<Tree<String>> {
        let node = self.node(root)?;

        let label = match (node.kind(), node.condition()) {
            (NodeKind::Condition, Some(condition)) => condition.to_string(),
            (kind, _) => kind.to_string(),
        };
        let label = if node.right_label() > 0 {
            format!("{} [{}, {}]", label, node.left_label(), node.right_label())
        } else {
            label
        };

        let leaves = [node.left(), node.right()]
            .into_iter()
            .flatten()
            .map(|child| self.to_tree_string(child))
            .collect::<TreeResult<Vec<_>>>()?;

        Ok(Tree::new(label).with_leaves(leaves))
    }
}
