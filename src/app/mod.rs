pub mod auth;
pub mod block_graph;
pub mod error;
pub mod follow_graph;
pub mod pagination;
pub mod relationships;
