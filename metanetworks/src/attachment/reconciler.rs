use std::marker::PhantomData;
use std::sync::Arc;

use super::wait::{wait_for, Step, WaitConfig, WaitError};
use super::{AttachmentError, AttachmentId};
use crate::api::{ApiError, ParentResource, ParentStore};
use crate::locks::KeyedMutex;

/// Result of reading an attachment back from its parent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Membership {
    Attached(AttachmentId),
    /// The parent exists but no longer maps the element
    Gone,
}

/// Attach/detach network elements to a parent of type `P`.
///
/// Mutations are read-modify-write of the parent's whole mapped-element list
/// and hold the parent's lock from the read until the write returns.
pub struct AttachmentReconciler<P, S> {
    store: S,
    locks: Arc<KeyedMutex>,
    convergence: WaitConfig,
    busy_retry: WaitConfig,
    _parent: PhantomData<fn() -> P>,
}

impl<P, S> AttachmentReconciler<P, S>
where
    P: ParentResource,
    S: ParentStore<P>,
{
    pub fn new(store: S, locks: Arc<KeyedMutex>, convergence: WaitConfig) -> Self {
        Self {
            store,
            locks,
            convergence,
            busy_retry: WaitConfig::busy_retry(),
            _parent: PhantomData,
        }
    }

    pub fn with_convergence(mut self, convergence: WaitConfig) -> Self {
        self.convergence = convergence;
        self
    }

    pub fn with_busy_retry(mut self, busy_retry: WaitConfig) -> Self {
        self.busy_retry = busy_retry;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Map `element_id` onto `parent_id` and wait until the change is visible.
    ///
    /// Fails with `AlreadyAttached` rather than succeeding when the element is
    /// already mapped. A `ConvergenceTimeout` means the write is durable but
    /// was not observed in time.
    pub async fn attach(
        &self,
        parent_id: &str,
        element_id: &str,
    ) -> Result<AttachmentId, AttachmentError> {
        let id = AttachmentId::new(parent_id, element_id)?;

        {
            let _guard = self.locks.lock(parent_id).await;

            let mut parent = self.fetch(parent_id).await?;
            if parent.has_element(element_id) {
                return Err(AttachmentError::AlreadyAttached {
                    kind: P::KIND,
                    parent_id: parent_id.to_string(),
                    element_id: element_id.to_string(),
                });
            }

            parent.mapped_elements_mut().push(element_id.to_string());
            self.store
                .replace(parent_id, &parent)
                .await
                .map_err(|e| AttachmentError::from_api(P::KIND, parent_id, e))?;
            tracing::debug!("Mapped {} onto {} {}", element_id, P::KIND, parent_id);
        }

        self.wait_until_visible(&id).await?;
        tracing::info!("Attached {} to {} {}", element_id, P::KIND, parent_id);
        Ok(id)
    }

    /// Parse `raw_id` and check whether the element is still mapped.
    ///
    /// A missing parent is returned as `NotFound`, not as `Gone`.
    pub async fn read(&self, raw_id: &str) -> Result<Membership, AttachmentError> {
        let id: AttachmentId = raw_id.parse()?;
        let parent = self.fetch(&id.parent_id).await?;

        if parent.has_element(&id.element_id) {
            Ok(Membership::Attached(id))
        } else {
            Ok(Membership::Gone)
        }
    }

    /// Remove `element_id` from `parent_id`. Succeeds if it was already gone.
    ///
    /// The write is retried while the API reports the parent as busy, within
    /// the busy-retry budget; the lock is held for the whole retry loop.
    pub async fn detach(&self, parent_id: &str, element_id: &str) -> Result<(), AttachmentError> {
        if parent_id.is_empty() || element_id.is_empty() {
            return Err(AttachmentError::InvalidArgument(
                "parent id and network element id must not be empty".to_string(),
            ));
        }

        let _guard = self.locks.lock(parent_id).await;

        let mut parent = self.fetch(parent_id).await?;
        let before = parent.mapped_elements().len();
        parent.mapped_elements_mut().retain(|e| e != element_id);
        if parent.mapped_elements().len() == before {
            tracing::debug!(
                "{} was not mapped to {} {}",
                element_id,
                P::KIND,
                parent_id
            );
        }

        let store = &self.store;
        let parent = &parent;
        let result = wait_for(&self.busy_retry, move || async move {
            match store.replace(parent_id, parent).await {
                Ok(_) => Ok(Step::Done(())),
                Err(e) if e.is_busy() => {
                    tracing::warn!("{} {} is busy, retrying: {}", P::KIND, parent_id, e);
                    Ok(Step::Retry(e))
                }
                Err(e) => Err(e),
            }
        })
        .await;

        match result {
            Ok(()) => {
                tracing::info!("Detached {} from {} {}", element_id, P::KIND, parent_id);
                Ok(())
            }
            Err(WaitError::Failed(e)) => Err(AttachmentError::from_api(P::KIND, parent_id, e)),
            Err(WaitError::Timeout { last, .. }) => Err(AttachmentError::ResourceBusy {
                kind: P::KIND,
                parent_id: parent_id.to_string(),
                message: match last {
                    Some(ApiError::ResourceBusy { message }) => message,
                    Some(other) => other.to_string(),
                    None => "no attempt completed".to_string(),
                },
                timeout: self.busy_retry.timeout,
            }),
        }
    }

    async fn fetch(&self, parent_id: &str) -> Result<P, AttachmentError> {
        self.store
            .fetch(parent_id)
            .await
            .map_err(|e| AttachmentError::from_api(P::KIND, parent_id, e))
    }

    async fn wait_until_visible(&self, id: &AttachmentId) -> Result<(), AttachmentError> {
        let store = &self.store;
        let parent_id = id.parent_id.as_str();
        let element_id = id.element_id.as_str();

        // A parent deleted mid-poll ends the wait; only absence of the element is pending.
        let result = wait_for(&self.convergence, move || async move {
            match store.fetch(parent_id).await {
                Ok(parent) if parent.has_element(element_id) => Ok(Step::Done(())),
                Ok(_) => Ok(Step::Pending),
                Err(e) => Err(e),
            }
        })
        .await;

        match result {
            Ok(()) => Ok(()),
            Err(WaitError::Failed(e)) => Err(AttachmentError::from_api(P::KIND, parent_id, e)),
            Err(WaitError::Timeout { .. }) => Err(AttachmentError::ConvergenceTimeout {
                kind: P::KIND,
                parent_id: parent_id.to_string(),
                element_id: element_id.to_string(),
                timeout: self.convergence.timeout,
            }),
        }
    }
}

#[cfg(test)]
#[path = "reconciler_test.rs"]
mod reconciler_test;
