pub mod account;
pub mod social_graph;
