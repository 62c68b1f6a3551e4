//! Left-folded condition chains, the textual form used on the command line.
//!
//! `SUBJECT CONTAINS invoice` `and` `SENDER EQUALS alice` `or` `READ EQUALS 0`
//! grows the tree exactly like repeated `and`/`or` calls on the current
//! root: `((a AND b) OR c)`.

use tracing::debug;

use crate::domain::condition::SearchCondition;
use crate::domain::error::{DomainError, TreeResult};
use crate::domain::tree::{ConditionsTree, NodeId};

/// Builds a tree from alternating condition and operator tokens.
///
/// Operators are `and` / `or`, case-insensitive.
pub fn parse_chain<S: AsRef<str>>(tokens: &[S]) -> TreeResult<(ConditionsTree, NodeId)> {
    let mut tokens = tokens.iter().map(|token| AsRef::<str>::as_ref(token));
    let first = tokens
        .next()
        .ok_or_else(|| DomainError::InvalidCondition("empty expression".to_string()))?;

    let mut tree = ConditionsTree::new();
    let mut root = tree.insert_leaf(first.parse::<SearchCondition>()?);

    while let Some(operator) = tokens.next() {
        let operand = tokens.next().ok_or_else(|| {
            DomainError::InvalidCondition(format!("operator '{}' without operand", operator))
        })?;
        let condition: SearchCondition = operand.parse()?;

        root = match operator.to_ascii_lowercase().as_str() {
            "and" => tree.and_condition(root, condition)?,
            "or" => tree.or_condition(root, condition)?,
            other => {
                return Err(DomainError::InvalidCondition(format!(
                    "expected 'and' or 'or', got '{}'",
                    other
                )))
            }
        };
    }

    debug!("parsed chain into {} nodes", tree.len());
    Ok((tree, root))
}
