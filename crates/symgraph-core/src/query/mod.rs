pub mod navigator;
pub mod scope;
pub mod subgraph;

pub use navigator::GraphNavigator;
pub use subgraph::{build_rankable_subgraph, FlowRank, RankableSubgraph};
