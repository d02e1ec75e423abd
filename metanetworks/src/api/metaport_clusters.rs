//! Metaport cluster API implementation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::common::{resource_path, ParentResource, ParentStore};
use super::{ApiError, Client};

pub const METAPORT_CLUSTERS_ENDPOINT: &str = "/v1/metaport_clusters";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaportCluster {
    #[serde(default, skip_serializing)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub mapped_elements: Vec<String>,
    #[serde(default)]
    pub metaports: Vec<String>,
    #[serde(default, skip_serializing)]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing)]
    pub modified_at: Option<String>,
}

impl MetaportCluster {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            description: String::new(),
            mapped_elements: Vec::new(),
            metaports: Vec::new(),
            created_at: None,
            modified_at: None,
        }
    }
}

impl ParentResource for MetaportCluster {
    const KIND: &'static str = "metaport cluster";

    fn mapped_elements(&self) -> &[String] {
        &self.mapped_elements
    }

    fn mapped_elements_mut(&mut self) -> &mut Vec<String> {
        &mut self.mapped_elements
    }
}

pub struct MetaportClustersApi<'a> {
    client: &'a Client,
}

impl<'a> MetaportClustersApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /v1/metaport_clusters/{id}?expand=true
    pub async fn get(&self, id: &str) -> Result<MetaportCluster, ApiError> {
        let path = format!(
            "{}?expand=true",
            resource_path(METAPORT_CLUSTERS_ENDPOINT, id)
        );
        let cluster: MetaportCluster = self.client.get(&path).await?;
        tracing::debug!("Returning Metaport Cluster from Get: {}", cluster.id);
        Ok(cluster)
    }

    /// POST /v1/metaport_clusters
    pub async fn create(&self, cluster: &MetaportCluster) -> Result<MetaportCluster, ApiError> {
        let created: MetaportCluster = self
            .client
            .post(METAPORT_CLUSTERS_ENDPOINT, cluster)
            .await?;
        tracing::info!("Created Metaport Cluster {}", created.id);
        Ok(created)
    }

    /// PATCH /v1/metaport_clusters/{id}
    pub async fn update(
        &self,
        id: &str,
        cluster: &MetaportCluster,
    ) -> Result<MetaportCluster, ApiError> {
        self.client
            .patch(&resource_path(METAPORT_CLUSTERS_ENDPOINT, id), cluster)
            .await
    }

    /// DELETE /v1/metaport_clusters/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&resource_path(METAPORT_CLUSTERS_ENDPOINT, id))
            .await
    }
}

#[async_trait]
impl ParentStore<MetaportCluster> for Client {
    async fn fetch(&self, id: &str) -> Result<MetaportCluster, ApiError> {
        self.metaport_clusters().get(id).await
    }

    async fn replace(
        &self,
        id: &str,
        parent: &MetaportCluster,
    ) -> Result<MetaportCluster, ApiError> {
        self.metaport_clusters().update(id, parent).await
    }
}
