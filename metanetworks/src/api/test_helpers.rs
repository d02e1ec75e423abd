//! Test helpers for the MetaNetworks API

#[cfg(test)]
use crate::config::{ClientConfig, Credentials};

#[cfg(test)]
pub fn test_credentials() -> Credentials {
    Credentials {
        api_key: "key".to_string(),
        api_secret: "secret".to_string(),
        org: "acme".to_string(),
    }
}

#[cfg(test)]
pub fn create_test_client(url: &str) -> super::Client {
    let config = ClientConfig {
        initial_backoff_ms: 10,
        max_backoff_ms: 50,
        ..Default::default()
    };
    super::Client::with_config(url, test_credentials(), config).unwrap()
}

#[cfg(test)]
pub async fn mock_token(server: &mut mockito::ServerGuard) -> mockito::Mock {
    server
        .mock("POST", "/v1/oauth/token")
        .with_body(r#"{"access_token":"test-token","token_type":"bearer"}"#)
        .create_async()
        .await
}
