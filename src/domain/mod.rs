//! Domain layer: condition trees and their encodings
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod condition;
pub mod error;
pub mod expression;
pub mod mptt;
pub mod sql;
pub mod transport;
pub mod tree;

pub use condition::{Attribute, SearchCondition, SearchField};
pub use error::{DomainError, TreeResult};
pub use expression::parse_chain;
pub use mptt::{build_tree_from_rows, flatten, label_and_flatten, ConditionRow, RebuildMode, RowRecord};
pub use sql::{build_where_clause, SqlClause};
pub use transport::TransportNode;
pub use tree::{ConditionNode, ConditionsTree, NodeId, NodeKind};
