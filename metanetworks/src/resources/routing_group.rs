//! Routing group resource

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::{Client, RoutingGroup};
use crate::locks::KeyedMutex;
use crate::resource::{
    optional_i64, optional_str, required_str, string_list, Resource, ResourceError, Result,
};
use crate::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};

pub const ROUTING_GROUP: &str = "metanetworks_routing_group";

const MAX_PRIORITY: i64 = 256;

pub struct RoutingGroupResource {
    client: Client,
    locks: Arc<KeyedMutex>,
}

impl RoutingGroupResource {
    pub fn new(client: Client, locks: Arc<KeyedMutex>) -> Self {
        Self { client, locks }
    }

    pub fn schema_static() -> Schema {
        let ids = || AttributeType::Set(Box::new(AttributeType::String));

        SchemaBuilder::new()
            .description("Routes traffic from sources through the mapped network elements")
            .attribute(AttributeBuilder::string("id").computed().build())
            .attribute(AttributeBuilder::string("name").required().build())
            .attribute(AttributeBuilder::string("description").optional().build())
            .attribute(
                AttributeBuilder::new("sources", ids())
                    .optional()
                    .description("Users, groups or devices whose traffic is routed")
                    .build(),
            )
            .attribute(AttributeBuilder::new("exempt_sources", ids()).optional().build())
            .attribute(
                AttributeBuilder::new("priority", AttributeType::Number)
                    .optional()
                    .description("0 to 256")
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("mapped_elements_ids", ids())
                    .computed()
                    .description("Managed through metanetworks_routing_group_attachment")
                    .build(),
            )
            .attribute(AttributeBuilder::string("created_at").computed().build())
            .attribute(AttributeBuilder::string("modified_at").computed().build())
            .attribute(AttributeBuilder::string("org_id").computed().build())
            .build()
    }

    fn apply_config(base: RoutingGroup, config: &Value) -> Result<RoutingGroup> {
        let priority = optional_i64(config, "priority")?;
        if let Some(p) = priority {
            if !(0..=MAX_PRIORITY).contains(&p) {
                return Err(ResourceError::invalid(
                    "priority",
                    format!("must be between 0 and {}, got {}", MAX_PRIORITY, p),
                ));
            }
        }

        Ok(RoutingGroup {
            name: required_str(config, "name")?.to_string(),
            description: optional_str(config, "description")?
                .unwrap_or_default()
                .to_string(),
            sources: string_list(config, "sources")?,
            exempt_sources: string_list(config, "exempt_sources")?,
            priority,
            ..base
        })
    }

    fn state(group: &RoutingGroup) -> Value {
        json!({
            "id": group.id,
            "name": group.name,
            "description": group.description,
            "sources": group.sources,
            "exempt_sources": group.exempt_sources,
            "priority": group.priority,
            "mapped_elements_ids": group.mapped_elements,
            "created_at": group.created_at,
            "modified_at": group.modified_at,
            "org_id": group.org_id,
        })
    }
}

#[async_trait]
impl Resource for RoutingGroupResource {
    fn type_name(&self) -> &str {
        ROUTING_GROUP
    }

    fn schema(&self) -> Schema {
        Self::schema_static()
    }

    async fn create(&self, planned: Value) -> Result<Value> {
        let group = Self::apply_config(RoutingGroup::new(""), &planned)?;
        let created = self.client.routing_groups().create(&group).await?;
        tracing::info!("Created routing group {}", created.id);
        Ok(Self::state(&created))
    }

    async fn read(&self, current: Value) -> Result<Option<Value>> {
        let id = required_str(&current, "id")?;
        match self.client.routing_groups().get(id).await {
            Ok(group) => Ok(Some(Self::state(&group))),
            Err(e) if e.is_not_found() => {
                tracing::warn!("Routing group {} not found, removing from state", id);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, prior: Value, planned: Value) -> Result<Value> {
        let id = required_str(&prior, "id")?;

        let _guard = self.locks.lock(id).await;
        let current = self.client.routing_groups().get(id).await?;
        let group = Self::apply_config(current, &planned)?;
        let updated = self.client.routing_groups().update(id, &group).await?;
        Ok(Self::state(&updated))
    }

    async fn delete(&self, current: Value) -> Result<()> {
        let id = required_str(&current, "id")?;
        match self.client.routing_groups().delete(id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn import_state(&self, id: &str) -> Result<Value> {
        Ok(json!({ "id": id }))
    }
}
