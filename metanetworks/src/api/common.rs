//! Traits shared by the objects that own a mapped-element list

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::ApiError;

/// Build `{collection}/{id}` with the id percent-encoded
pub fn resource_path(collection: &str, id: &str) -> String {
    format!("{}/{}", collection, urlencoding::encode(id))
}

/// An object whose `mapped_elements` list is the attachment point for
/// network elements (metaports, metaport clusters, routing groups).
pub trait ParentResource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Human readable kind used in errors and logs
    const KIND: &'static str;

    fn mapped_elements(&self) -> &[String];

    fn mapped_elements_mut(&mut self) -> &mut Vec<String>;

    fn has_element(&self, element_id: &str) -> bool {
        self.mapped_elements().iter().any(|e| e == element_id)
    }
}

/// Read and full-replace access to parents of type `P`.
///
/// [`crate::api::Client`] implements this for every parent kind; tests swap in
/// an in-memory store.
#[async_trait]
pub trait ParentStore<P: ParentResource>: Send + Sync {
    async fn fetch(&self, id: &str) -> Result<P, ApiError>;

    async fn replace(&self, id: &str, parent: &P) -> Result<P, ApiError>;
}
