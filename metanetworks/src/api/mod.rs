mod client;
pub mod common;
mod error;
pub mod metaport_clusters;
pub mod metaports;
pub mod routing_groups;
pub mod test_helpers;

pub use client::Client;
pub use common::{resource_path, ParentResource, ParentStore};
pub use error::{ApiError, BUSY_MARKER};
pub use metaport_clusters::MetaportCluster;
pub use metaports::Metaport;
pub use routing_groups::RoutingGroup;
