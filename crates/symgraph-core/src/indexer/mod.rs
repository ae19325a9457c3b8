//! Graph construction from SCIP indexes.

pub mod builder;
pub mod callgraph;
pub mod pipeline;
pub mod scip;

pub use builder::{build_graph, BuildStats, GraphBuilder};
