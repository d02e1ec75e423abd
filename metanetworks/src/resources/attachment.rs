//! Attachment resources
//!
//! One generic resource backs the metaport, metaport cluster and routing group
//! attachments. Every input forces replacement, so there is no in-place update.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::{Client, Metaport, MetaportCluster, ParentResource, ParentStore, RoutingGroup};
use crate::attachment::{AttachmentId, AttachmentReconciler, Membership, WaitConfig};
use crate::locks::KeyedMutex;
use crate::resource::{optional_str, required_str, Resource, ResourceError, Result};
use crate::schema::{AttributeBuilder, Schema, SchemaBuilder};

pub const METAPORT_ATTACHMENT: &str = "metanetworks_metaport_attachment";
pub const METAPORT_CLUSTER_ATTACHMENT: &str = "metanetworks_metaport_cluster_attachment";
pub const ROUTING_GROUP_ATTACHMENT: &str = "metanetworks_routing_group_attachment";

const ELEMENT_ATTRIBUTE: &str = "network_element_id";

pub struct AttachmentResource<P> {
    type_name: &'static str,
    parent_attribute: &'static str,
    importable: bool,
    reconciler: AttachmentReconciler<P, Client>,
}

impl AttachmentResource<Metaport> {
    pub fn metaport(client: Client, locks: Arc<KeyedMutex>) -> Self {
        Self::new(
            METAPORT_ATTACHMENT,
            "metaport_id",
            true,
            AttachmentReconciler::new(client, locks, WaitConfig::attachment()),
        )
    }
}

impl AttachmentResource<MetaportCluster> {
    pub fn metaport_cluster(client: Client, locks: Arc<KeyedMutex>) -> Self {
        Self::new(
            METAPORT_CLUSTER_ATTACHMENT,
            "metaport_cluster_id",
            true,
            AttachmentReconciler::new(client, locks, WaitConfig::cluster_attachment()),
        )
    }
}

impl AttachmentResource<RoutingGroup> {
    pub fn routing_group(client: Client, locks: Arc<KeyedMutex>) -> Self {
        Self::new(
            ROUTING_GROUP_ATTACHMENT,
            "routing_group_id",
            false,
            AttachmentReconciler::new(client, locks, WaitConfig::attachment()),
        )
    }
}

impl<P> AttachmentResource<P>
where
    P: ParentResource,
    Client: ParentStore<P>,
{
    fn new(
        type_name: &'static str,
        parent_attribute: &'static str,
        importable: bool,
        reconciler: AttachmentReconciler<P, Client>,
    ) -> Self {
        Self {
            type_name,
            parent_attribute,
            importable,
            reconciler,
        }
    }

    /// Override the poll and busy-retry timings
    pub fn with_timing(mut self, convergence: WaitConfig, busy_retry: WaitConfig) -> Self {
        self.reconciler = self
            .reconciler
            .with_convergence(convergence)
            .with_busy_retry(busy_retry);
        self
    }

    pub fn schema_for(type_name: &str, parent_attribute: &str) -> Schema {
        SchemaBuilder::new()
            .description(&format!(
                "Maps a network element onto a {}",
                type_name
                    .trim_start_matches("metanetworks_")
                    .trim_end_matches("_attachment")
                    .replace('_', " ")
            ))
            .attribute(
                AttributeBuilder::string("id")
                    .computed()
                    .description("Attachment ID in the form <parent_id>_<network_element_id>")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string(parent_attribute)
                    .required()
                    .force_new()
                    .description("ID of the parent resource")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string(ELEMENT_ATTRIBUTE)
                    .required()
                    .force_new()
                    .description("ID of the network element to map")
                    .build(),
            )
            .build()
    }

    fn state(&self, id: &AttachmentId) -> Value {
        json!({
            "id": id.to_string(),
            self.parent_attribute: id.parent_id,
            ELEMENT_ATTRIBUTE: id.element_id,
        })
    }

    /// The ID recorded in state, or one rebuilt from the inputs.
    fn state_id(&self, state: &Value) -> Result<String> {
        match optional_str(state, "id")? {
            Some(id) if !id.is_empty() => Ok(id.to_string()),
            _ => {
                let parent_id = required_str(state, self.parent_attribute)?;
                let element_id = required_str(state, ELEMENT_ATTRIBUTE)?;
                Ok(AttachmentId::new(parent_id, element_id)?.to_string())
            }
        }
    }
}

#[async_trait]
impl<P> Resource for AttachmentResource<P>
where
    P: ParentResource,
    Client: ParentStore<P>,
{
    fn type_name(&self) -> &str {
        self.type_name
    }

    fn schema(&self) -> Schema {
        Self::schema_for(self.type_name, self.parent_attribute)
    }

    async fn create(&self, planned: Value) -> Result<Value> {
        let parent_id = required_str(&planned, self.parent_attribute)?;
        let element_id = required_str(&planned, ELEMENT_ATTRIBUTE)?;

        let id = self.reconciler.attach(parent_id, element_id).await?;
        Ok(self.state(&id))
    }

    async fn read(&self, current: Value) -> Result<Option<Value>> {
        let id = self.state_id(&current)?;

        match self.reconciler.read(&id).await {
            Ok(Membership::Attached(id)) => Ok(Some(self.state(&id))),
            Ok(Membership::Gone) => {
                tracing::warn!("{} {} no longer mapped, removing from state", self.type_name, id);
                Ok(None)
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!("{} {}: {}, removing from state", self.type_name, id, e);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, prior: Value, planned: Value) -> Result<Value> {
        let unchanged = [self.parent_attribute, ELEMENT_ATTRIBUTE]
            .iter()
            .all(|attr| prior.get(*attr) == planned.get(*attr));
        if unchanged {
            return Ok(prior);
        }
        Err(ResourceError::RequiresReplace(self.type_name.to_string()))
    }

    async fn delete(&self, current: Value) -> Result<()> {
        let id: AttachmentId = self.state_id(&current)?.parse()?;
        self.reconciler.detach(&id.parent_id, &id.element_id).await?;
        Ok(())
    }

    async fn import_state(&self, id: &str) -> Result<Value> {
        if !self.importable {
            return Err(ResourceError::ImportNotSupported(self.type_name.to_string()));
        }
        let id: AttachmentId = id.parse()?;
        Ok(self.state(&id))
    }
}
