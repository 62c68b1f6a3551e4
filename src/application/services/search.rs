//! Named search persistence
//!
//! Labels and flattens condition trees on save, rebuilds them on load.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult, StoreResultExt};
use crate::domain::{
    build_tree_from_rows, build_where_clause, label_and_flatten, ConditionsTree, DomainError,
    NodeId, RebuildMode, SqlClause,
};
use crate::infrastructure::traits::SearchStore;

/// Node and leaf counts of a stored search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSummary {
    pub name: String,
    pub nodes: usize,
    pub leaves: usize,
}

/// Service for saving and loading named condition trees.
pub struct SearchService {
    store: Arc<dyn SearchStore>,
    mode: RebuildMode,
}

impl SearchService {
    /// Create a new search service.
    pub fn new(store: Arc<dyn SearchStore>, mode: RebuildMode) -> Self {
        Self { store, mode }
    }

    pub fn mode(&self) -> RebuildMode {
        self.mode
    }

    /// Label the tree from `root` and persist its rows under `name`.
    ///
    /// Returns the number of rows written.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn save(&self, name: &str, tree: &mut ConditionsTree, root: NodeId) -> ApplicationResult<usize> {
        if !tree.is_root(root)? {
            return Err(DomainError::InvalidState(format!(
                "can't save from non-root node {}",
                root
            ))
            .into());
        }
        let rows = label_and_flatten(tree, root)?;
        self.store
            .save(name, &rows)
            .with_search_context("save search", name)?;
        debug!("saved {} rows for '{}'", rows.len(), name);
        Ok(rows.len())
    }

    /// Rebuild the tree stored under `name`.
    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, name: &str) -> ApplicationResult<ConditionsTree> {
        let rows = self
            .store
            .load(name)
            .with_search_context("load search", name)?;
        if rows.is_empty() {
            return Err(ApplicationError::SearchNotFound(name.to_string()));
        }
        let tree = build_tree_from_rows(&rows, self.mode)?;
        debug!("rebuilt '{}' with {} nodes", name, tree.len());
        Ok(tree)
    }

    /// Render the stored search as a `WHERE` fragment.
    pub fn render_sql(&self, name: &str) -> ApplicationResult<SqlClause> {
        let tree = self.load(name)?;
        let root = single_root(&tree, name)?;
        Ok(build_where_clause(&tree, root)?)
    }

    /// Names of all stored searches.
    pub fn list(&self) -> ApplicationResult<Vec<String>> {
        self.store.list().with_search_context("list searches", "*")
    }

    /// Node and leaf counts for each stored search.
    pub fn summaries(&self) -> ApplicationResult<Vec<SearchSummary>> {
        self.list()?
            .into_iter()
            .map(|name| {
                let tree = self.load(&name)?;
                let root = single_root(&tree, &name)?;
                let leaves = tree.leaf_set(root)?.len();
                Ok(SearchSummary {
                    nodes: tree.len(),
                    leaves,
                    name,
                })
            })
            .collect()
    }

    /// Remove the search stored under `name`.
    pub fn delete(&self, name: &str) -> ApplicationResult<()> {
        let existed = self
            .store
            .delete(name)
            .with_search_context("delete search", name)?;
        if !existed {
            return Err(ApplicationError::SearchNotFound(name.to_string()));
        }
        debug!("deleted '{}'", name);
        Ok(())
    }
}

/// The single root of a rebuilt tree.
pub(crate) fn single_root(tree: &ConditionsTree, name: &str) -> ApplicationResult<NodeId> {
    tree.root().ok_or_else(|| {
        DomainError::InvalidState(format!("search '{}' has no single root", name)).into()
    })
}
