//! Resource implementations

pub mod attachment;
pub mod metaport;
pub mod metaport_cluster;
pub mod routing_group;

pub use attachment::AttachmentResource;
pub use metaport::MetaportResource;
pub use metaport_cluster::MetaportClusterResource;
pub use routing_group::RoutingGroupResource;
