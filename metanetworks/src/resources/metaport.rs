//! Metaport resource

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::{Client, Metaport};
use crate::locks::KeyedMutex;
use crate::resource::{optional_bool, optional_str, required_str, Resource, Result};
use crate::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};

pub const METAPORT: &str = "metanetworks_metaport";

pub struct MetaportResource {
    client: Client,
    locks: Arc<KeyedMutex>,
}

impl MetaportResource {
    pub fn new(client: Client, locks: Arc<KeyedMutex>) -> Self {
        Self { client, locks }
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .description("A MetaPort connects a site to the MetaNetworks cloud")
            .attribute(AttributeBuilder::string("id").computed().build())
            .attribute(
                AttributeBuilder::string("name")
                    .required()
                    .description("Metaport name")
                    .build(),
            )
            .attribute(AttributeBuilder::string("description").optional().build())
            .attribute(
                AttributeBuilder::new("enabled", AttributeType::Bool)
                    .optional()
                    .description("Defaults to true")
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("allow_support", AttributeType::Bool)
                    .optional()
                    .description("Allow MetaNetworks support to access the metaport; defaults to true")
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "mapped_elements",
                    AttributeType::Set(Box::new(AttributeType::String)),
                )
                .computed()
                .description("Managed through metanetworks_metaport_attachment")
                .build(),
            )
            .attribute(AttributeBuilder::string("created_at").computed().build())
            .attribute(AttributeBuilder::string("dns_name").computed().build())
            .attribute(AttributeBuilder::string("expires_at").computed().build())
            .attribute(AttributeBuilder::string("modified_at").computed().build())
            .attribute(AttributeBuilder::string("org_id").computed().build())
            .build()
    }

    /// Writable fields from configuration, on top of `base`
    fn apply_config(base: Metaport, config: &Value) -> Result<Metaport> {
        Ok(Metaport {
            name: required_str(config, "name")?.to_string(),
            description: optional_str(config, "description")?
                .unwrap_or_default()
                .to_string(),
            enabled: optional_bool(config, "enabled")?.unwrap_or(true),
            allow_support: Some(optional_bool(config, "allow_support")?.unwrap_or(true)),
            ..base
        })
    }

    fn state(metaport: &Metaport) -> Value {
        json!({
            "id": metaport.id,
            "name": metaport.name,
            "description": metaport.description,
            "enabled": metaport.enabled,
            "allow_support": metaport.allow_support.unwrap_or(true),
            "mapped_elements": metaport.mapped_elements,
            "created_at": metaport.created_at,
            "dns_name": metaport.dns_name,
            "expires_at": metaport.expires_at,
            "modified_at": metaport.modified_at,
            "org_id": metaport.org_id,
        })
    }
}

#[async_trait]
impl Resource for MetaportResource {
    fn type_name(&self) -> &str {
        METAPORT
    }

    fn schema(&self) -> Schema {
        Self::schema_static()
    }

    async fn create(&self, planned: Value) -> Result<Value> {
        let metaport = Self::apply_config(Metaport::new(""), &planned)?;
        let created = self.client.metaports().create(&metaport).await?;
        tracing::info!("Created metaport {}", created.id);
        Ok(Self::state(&created))
    }

    async fn read(&self, current: Value) -> Result<Option<Value>> {
        let id = required_str(&current, "id")?;
        match self.client.metaports().get(id).await {
            Ok(metaport) => Ok(Some(Self::state(&metaport))),
            Err(e) if e.is_not_found() => {
                tracing::warn!("Metaport {} not found, removing from state", id);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, prior: Value, planned: Value) -> Result<Value> {
        let id = required_str(&prior, "id")?;

        // Attachments rewrite mapped_elements under the same lock.
        let _guard = self.locks.lock(id).await;
        let current = self.client.metaports().get(id).await?;
        let metaport = Self::apply_config(current, &planned)?;
        let updated = self.client.metaports().update(id, &metaport).await?;
        Ok(Self::state(&updated))
    }

    async fn delete(&self, current: Value) -> Result<()> {
        let id = required_str(&current, "id")?;
        match self.client.metaports().delete(id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                tracing::debug!("Metaport {} already deleted", id);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn import_state(&self, id: &str) -> Result<Value> {
        Ok(json!({ "id": id }))
    }
}
