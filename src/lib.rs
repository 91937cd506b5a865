pub mod types;
pub mod error;
pub mod node;
pub mod model;
pub mod events;
pub mod cluster;
pub mod builder;
pub mod resolver;
pub mod voice;

#[cfg(test)]
mod testing;

pub use cluster::{Cluster, ClusterBuilder};
pub use error::{ClusterError, LinkError};
pub use model::player::Player;
pub use node::Node;
