//! Renders a condition tree as a SQL `WHERE` fragment with bound arguments.

use serde::Serialize;
use tracing::instrument;

use crate::domain::condition::{Attribute, SearchCondition};
use crate::domain::error::{DomainError, TreeResult};
use crate::domain::tree::{ConditionsTree, NodeId, NodeKind};

/// A `WHERE` fragment using `?` placeholders, one per entry in `args`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SqlClause {
    pub sql: String,
    pub args: Vec<String>,
}

/// Pending output of the in-order walk.
enum Step {
    Node(NodeId),
    Text(&'static str),
}

/// In-order walk: operators are parenthesized, leaves become comparisons.
#[instrument(level = "debug", skip(tree))]
pub fn build_where_clause(tree: &ConditionsTree, root: NodeId) -> TreeResult<SqlClause> {
    let mut clause = SqlClause::default();
    let mut stack = vec![Step::Node(root)];

    while let Some(step) = stack.pop() {
        let id = match step {
            Step::Text(text) => {
                clause.sql.push_str(text);
                continue;
            }
            Step::Node(id) => id,
        };
        let node = tree.node(id)?;
        match node.kind() {
            NodeKind::Condition => {
                let condition = node.condition().ok_or_else(|| {
                    DomainError::InvalidState(format!("condition node {} without predicate", id))
                })?;
                append_condition(condition, &mut clause);
            }
            kind => {
                let (Some(left), Some(right)) = (node.left(), node.right()) else {
                    return Err(DomainError::InvalidState(format!(
                        "{} node {} is missing an operand",
                        kind, id
                    )));
                };
                let operator = match kind {
                    NodeKind::And => " AND ",
                    _ => " OR ",
                };
                stack.extend([
                    Step::Text(")"),
                    Step::Node(right),
                    Step::Text(operator),
                    Step::Node(left),
                    Step::Text("("),
                ]);
            }
        }
    }
    Ok(clause)
}

fn append_condition(condition: &SearchCondition, clause: &mut SqlClause) {
    let value = &condition.value;
    let (operator, arg) = match condition.attribute {
        Attribute::Contains => ("LIKE", format!("%{}%", value)),
        Attribute::NotContains => ("NOT LIKE", format!("%{}%", value)),
        Attribute::Equals => ("=", value.clone()),
        Attribute::NotEquals => ("!=", value.clone()),
        Attribute::StartsWith => ("LIKE", format!("{}%", value)),
        Attribute::NotStartsWith => ("NOT LIKE", format!("{}%", value)),
        Attribute::EndsWith => ("LIKE", format!("%{}", value)),
        Attribute::NotEndsWith => ("NOT LIKE", format!("%{}", value)),
    };
    clause.sql.push_str(condition.field.column());
    clause.sql.push(' ');
    clause.sql.push_str(operator);
    clause.sql.push_str(" ?");
    clause.args.push(arg);
}
