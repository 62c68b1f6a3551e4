//! Boolean search-condition trees.
//!
//! A search is a binary tree of AND/OR operators over leaf predicates
//! (`SUBJECT CONTAINS invoice`). Trees are grown by splicing operators in
//! at an existing node, persisted as MPTT rows, passed around in a compact
//! transport encoding and rendered as SQL `WHERE` fragments.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod tree_traits;
pub mod util;
