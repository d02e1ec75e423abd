//! Metaport API implementation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::common::{resource_path, ParentResource, ParentStore};
use super::{ApiError, Client};

pub const METAPORTS_ENDPOINT: &str = "/v1/metaports";

fn default_true() -> bool {
    true
}

/// A metaport. Server-managed fields are read but never sent back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metaport {
    #[serde(default, skip_serializing)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub mapped_elements: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_support: Option<bool>,
    #[serde(default, skip_serializing)]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing)]
    pub dns_name: Option<String>,
    #[serde(default, skip_serializing)]
    pub expires_at: Option<String>,
    #[serde(default, skip_serializing)]
    pub modified_at: Option<String>,
    #[serde(default, skip_serializing)]
    pub org_id: Option<String>,
}

impl Metaport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            description: String::new(),
            enabled: true,
            mapped_elements: Vec::new(),
            allow_support: Some(true),
            created_at: None,
            dns_name: None,
            expires_at: None,
            modified_at: None,
            org_id: None,
        }
    }
}

impl ParentResource for Metaport {
    const KIND: &'static str = "metaport";

    fn mapped_elements(&self) -> &[String] {
        &self.mapped_elements
    }

    fn mapped_elements_mut(&mut self) -> &mut Vec<String> {
        &mut self.mapped_elements
    }
}

pub struct MetaportsApi<'a> {
    client: &'a Client,
}

impl<'a> MetaportsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /v1/metaports/{id}
    pub async fn get(&self, id: &str) -> Result<Metaport, ApiError> {
        let metaport: Metaport = self
            .client
            .get(&resource_path(METAPORTS_ENDPOINT, id))
            .await?;
        tracing::debug!("Returning Metaport from Get: {}", metaport.id);
        Ok(metaport)
    }

    /// POST /v1/metaports
    pub async fn create(&self, metaport: &Metaport) -> Result<Metaport, ApiError> {
        let created: Metaport = self.client.post(METAPORTS_ENDPOINT, metaport).await?;
        tracing::info!("Created Metaport {}", created.id);
        Ok(created)
    }

    /// PATCH /v1/metaports/{id}
    pub async fn update(&self, id: &str, metaport: &Metaport) -> Result<Metaport, ApiError> {
        self.client
            .patch(&resource_path(METAPORTS_ENDPOINT, id), metaport)
            .await
    }

    /// DELETE /v1/metaports/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&resource_path(METAPORTS_ENDPOINT, id))
            .await
    }
}

#[async_trait]
impl ParentStore<Metaport> for Client {
    async fn fetch(&self, id: &str) -> Result<Metaport, ApiError> {
        self.metaports().get(id).await
    }

    async fn replace(&self, id: &str, parent: &Metaport) -> Result<Metaport, ApiError> {
        self.metaports().update(id, parent).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::{create_test_client, mock_token};
    use mockito::{Matcher, Server};

    const METAPORT_JSON: &str = r#"{
        "id": "mp-1",
        "name": "edge",
        "description": "branch office",
        "enabled": true,
        "mapped_elements": ["ne-1", "ne-2"],
        "allow_support": false,
        "created_at": "2024-01-01T00:00:00Z",
        "dns_name": "mp-1.acme.nsof",
        "org_id": "acme"
    }"#;

    #[test]
    fn read_only_fields_are_not_serialized() {
        let metaport: Metaport = serde_json::from_str(METAPORT_JSON).unwrap();
        let body = serde_json::to_value(&metaport).unwrap();

        assert_eq!(metaport.id, "mp-1");
        assert_eq!(metaport.dns_name.as_deref(), Some("mp-1.acme.nsof"));
        assert!(body.get("id").is_none());
        assert!(body.get("created_at").is_none());
        assert!(body.get("dns_name").is_none());
        assert_eq!(body["mapped_elements"], serde_json::json!(["ne-1", "ne-2"]));
    }

    #[test]
    fn empty_mapped_elements_are_still_sent() {
        let body = serde_json::to_value(Metaport::new("edge")).unwrap();
        assert_eq!(body["mapped_elements"], serde_json::json!([]));
        assert_eq!(body["enabled"], serde_json::json!(true));
    }

    #[tokio::test]
    async fn get_metaport() {
        let mut server = Server::new_async().await;
        mock_token(&mut server).await;
        let _m = server
            .mock("GET", "/v1/metaports/mp-1")
            .with_header("content-type", "application/json")
            .with_body(METAPORT_JSON)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let metaport = client.metaports().get("mp-1").await.unwrap();

        assert_eq!(metaport.name, "edge");
        assert!(metaport.has_element("ne-2"));
        assert_eq!(metaport.allow_support, Some(false));
    }

    #[tokio::test]
    async fn update_metaport_sends_writable_fields() {
        let mut server = Server::new_async().await;
        mock_token(&mut server).await;
        let m = server
            .mock("PATCH", "/v1/metaports/mp-1")
            .match_body(Matcher::PartialJsonString(
                r#"{"name":"edge","mapped_elements":["ne-1","ne-2"]}"#.to_string(),
            ))
            .with_body(METAPORT_JSON)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let metaport: Metaport = serde_json::from_str(METAPORT_JSON).unwrap();
        let updated = client.metaports().update("mp-1", &metaport).await.unwrap();

        assert_eq!(updated.id, "mp-1");
        m.assert_async().await;
    }

    #[tokio::test]
    async fn delete_metaport() {
        let mut server = Server::new_async().await;
        mock_token(&mut server).await;
        let m = server
            .mock("DELETE", "/v1/metaports/mp-1")
            .with_status(204)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        client.metaports().delete("mp-1").await.unwrap();
        m.assert_async().await;
    }
}
