//! Metaport cluster resource

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::{Client, MetaportCluster};
use crate::locks::KeyedMutex;
use crate::resource::{optional_str, required_str, string_list, Resource, Result};
use crate::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};

pub const METAPORT_CLUSTER: &str = "metanetworks_metaport_cluster";

pub struct MetaportClusterResource {
    client: Client,
    locks: Arc<KeyedMutex>,
}

impl MetaportClusterResource {
    pub fn new(client: Client, locks: Arc<KeyedMutex>) -> Self {
        Self { client, locks }
    }

    pub fn schema_static() -> Schema {
        let ids = || AttributeType::Set(Box::new(AttributeType::String));

        SchemaBuilder::new()
            .description("A group of metaports serving the same network elements")
            .attribute(AttributeBuilder::string("id").computed().build())
            .attribute(AttributeBuilder::string("name").required().build())
            .attribute(AttributeBuilder::string("description").optional().build())
            .attribute(
                AttributeBuilder::new("metaports", ids())
                    .optional()
                    .description("IDs of the member metaports")
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("mapped_elements", ids())
                    .computed()
                    .description("Managed through metanetworks_metaport_cluster_attachment")
                    .build(),
            )
            .attribute(AttributeBuilder::string("created_at").computed().build())
            .attribute(AttributeBuilder::string("modified_at").computed().build())
            .build()
    }

    fn apply_config(base: MetaportCluster, config: &Value) -> Result<MetaportCluster> {
        Ok(MetaportCluster {
            name: required_str(config, "name")?.to_string(),
            description: optional_str(config, "description")?
                .unwrap_or_default()
                .to_string(),
            metaports: string_list(config, "metaports")?,
            ..base
        })
    }

    fn state(cluster: &MetaportCluster) -> Value {
        json!({
            "id": cluster.id,
            "name": cluster.name,
            "description": cluster.description,
            "metaports": cluster.metaports,
            "mapped_elements": cluster.mapped_elements,
            "created_at": cluster.created_at,
            "modified_at": cluster.modified_at,
        })
    }
}

#[async_trait]
impl Resource for MetaportClusterResource {
    fn type_name(&self) -> &str {
        METAPORT_CLUSTER
    }

    fn schema(&self) -> Schema {
        Self::schema_static()
    }

    async fn create(&self, planned: Value) -> Result<Value> {
        let cluster = Self::apply_config(MetaportCluster::new(""), &planned)?;
        let created = self.client.metaport_clusters().create(&cluster).await?;
        tracing::info!("Created metaport cluster {}", created.id);
        Ok(Self::state(&created))
    }

    async fn read(&self, current: Value) -> Result<Option<Value>> {
        let id = required_str(&current, "id")?;
        match self.client.metaport_clusters().get(id).await {
            Ok(cluster) => Ok(Some(Self::state(&cluster))),
            Err(e) if e.is_not_found() => {
                tracing::warn!("Metaport cluster {} not found, removing from state", id);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, prior: Value, planned: Value) -> Result<Value> {
        let id = required_str(&prior, "id")?;

        let _guard = self.locks.lock(id).await;
        let current = self.client.metaport_clusters().get(id).await?;
        let cluster = Self::apply_config(current, &planned)?;
        let updated = self.client.metaport_clusters().update(id, &cluster).await?;
        Ok(Self::state(&updated))
    }

    async fn delete(&self, current: Value) -> Result<()> {
        let id = required_str(&current, "id")?;
        match self.client.metaport_clusters().delete(id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn import_state(&self, id: &str) -> Result<Value> {
        Ok(json!({ "id": id }))
    }
}
