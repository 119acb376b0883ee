pub mod blueprint;
pub mod factory;
pub mod link;
pub mod link_storage;
pub mod node;
pub mod node_storage;
pub mod source;
