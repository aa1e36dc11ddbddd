//! Hierarchy resolution: record → account → period.

pub mod resolver;

pub use resolver::{HierarchyResolver, Lineage};
