pub mod api;
pub mod attachment;
pub mod config;
pub mod locks;
pub mod logging;
pub mod resource;
pub mod resources;
pub mod schema;

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

use crate::config::ProviderConfig;
use crate::locks::KeyedMutex;
use crate::resource::{Diagnostic, Resource};
use crate::resources::attachment::{
    METAPORT_ATTACHMENT, METAPORT_CLUSTER_ATTACHMENT, ROUTING_GROUP_ATTACHMENT,
};
use crate::resources::metaport::METAPORT;
use crate::resources::metaport_cluster::METAPORT_CLUSTER;
use crate::resources::routing_group::ROUTING_GROUP;
use crate::resources::{
    AttachmentResource, MetaportClusterResource, MetaportResource, RoutingGroupResource,
};
use crate::schema::{AttributeBuilder, Schema, SchemaBuilder};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider not configured")]
    NotConfigured,

    #[error("Unknown resource: {0}")]
    UnknownResource(String),
}

/// State shared by every resource of one configured provider
struct ProviderData {
    client: api::Client,
    locks: Arc<KeyedMutex>,
}

pub struct MetanetworksProvider {
    data: Option<ProviderData>,
}

impl Default for MetanetworksProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MetanetworksProvider {
    pub fn new() -> Self {
        Self { data: None }
    }

    pub fn is_configured(&self) -> bool {
        self.data.is_some()
    }

    pub fn schema() -> Schema {
        SchemaBuilder::new()
            .description("MetaNetworks")
            .attribute(
                AttributeBuilder::string("api_key")
                    .optional()
                    .description("API key; defaults to METANETWORKS_API_KEY")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("api_secret")
                    .optional()
                    .sensitive()
                    .description("API secret; defaults to METANETWORKS_API_SECRET")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("org")
                    .optional()
                    .description("Organization short name; defaults to METANETWORKS_ORG")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("endpoint")
                    .optional()
                    .description("API base URL; defaults to METANETWORKS_ENDPOINT or https://api.metanetworks.com")
                    .build(),
            )
            .build()
    }

    /// Resolve credentials and build the shared client. Errors are returned
    /// as diagnostics and leave the provider unconfigured.
    pub fn configure(&mut self, config: Value) -> Vec<Diagnostic> {
        let values = match config {
            Value::Object(values) => values,
            Value::Null => Map::new(),
            other => {
                return vec![Diagnostic::error(
                    "Invalid provider configuration",
                    format!("expected an object, got {}", other),
                )]
            }
        };

        let resolved = match ProviderConfig::resolve(&values) {
            Ok(resolved) => resolved,
            Err(errors) => {
                return errors
                    .iter()
                    .map(|e| Diagnostic::error(e.to_string(), ""))
                    .collect()
            }
        };

        match api::Client::new(&resolved.endpoint, resolved.credentials) {
            Ok(client) => {
                tracing::info!("Configured MetaNetworks provider for {}", client.base_url());
                self.data = Some(ProviderData {
                    client,
                    locks: Arc::new(KeyedMutex::new()),
                });
                Vec::new()
            }
            Err(e) => vec![Diagnostic::error(
                format!("Failed to create API client: {}", e),
                "",
            )],
        }
    }

    pub fn create_resource(&self, name: &str) -> Result<Box<dyn Resource>, ProviderError> {
        let data = self.data.as_ref().ok_or(ProviderError::NotConfigured)?;
        let client = data.client.clone();
        let locks = data.locks.clone();

        match name {
            METAPORT => Ok(Box::new(MetaportResource::new(client, locks))),
            METAPORT_CLUSTER => Ok(Box::new(MetaportClusterResource::new(client, locks))),
            ROUTING_GROUP => Ok(Box::new(RoutingGroupResource::new(client, locks))),
            METAPORT_ATTACHMENT => Ok(Box::new(AttachmentResource::metaport(client, locks))),
            METAPORT_CLUSTER_ATTACHMENT => Ok(Box::new(AttachmentResource::metaport_cluster(
                client, locks,
            ))),
            ROUTING_GROUP_ATTACHMENT => {
                Ok(Box::new(AttachmentResource::routing_group(client, locks)))
            }
            _ => Err(ProviderError::UnknownResource(name.to_string())),
        }
    }

    pub fn resource_schemas(&self) -> HashMap<String, Schema> {
        static SCHEMAS: OnceLock<HashMap<String, Schema>> = OnceLock::new();

        SCHEMAS
            .get_or_init(|| {
                let mut schemas = HashMap::new();
                schemas.insert(METAPORT.to_string(), MetaportResource::schema_static());
                schemas.insert(
                    METAPORT_CLUSTER.to_string(),
                    MetaportClusterResource::schema_static(),
                );
                schemas.insert(
                    ROUTING_GROUP.to_string(),
                    RoutingGroupResource::schema_static(),
                );
                schemas.insert(
                    METAPORT_ATTACHMENT.to_string(),
                    AttachmentResource::<api::Metaport>::schema_for(
                        METAPORT_ATTACHMENT,
                        "metaport_id",
                    ),
                );
                schemas.insert(
                    METAPORT_CLUSTER_ATTACHMENT.to_string(),
                    AttachmentResource::<api::MetaportCluster>::schema_for(
                        METAPORT_CLUSTER_ATTACHMENT,
                        "metaport_cluster_id",
                    ),
                );
                schemas.insert(
                    ROUTING_GROUP_ATTACHMENT.to_string(),
                    AttachmentResource::<api::RoutingGroup>::schema_for(
                        ROUTING_GROUP_ATTACHMENT,
                        "routing_group_id",
                    ),
                );
                schemas
            })
            .clone()
    }
}
