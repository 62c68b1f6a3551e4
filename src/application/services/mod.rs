//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on the `SearchStore` boundary trait but are themselves
//! concrete structs, not traits.

mod search;

pub use search::{SearchService, SearchSummary};
