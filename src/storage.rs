pub mod node;
pub mod node_value;
pub mod normalizer;
