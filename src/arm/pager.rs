use std::marker::PhantomData;

use serde::de::DeserializeOwned;

use super::{ArmClient, ClientError};

/// Lazy cursor over an ARM list operation.
///
/// Nothing is requested until [`Pager::next_page`] is first called, so a
/// caller that stops early never pays for the remaining pages. A failed page
/// ends the pager; there is no partial recovery.
pub struct Pager<'a, T> {
    client: &'a ArmClient,
    next: Option<String>,
    resource: String,
    _item: PhantomData<T>,
}

impl<'a, T: DeserializeOwned> Pager<'a, T> {
    pub(crate) fn new(client: &'a ArmClient, first_url: String, resource: String) -> Self {
        Self {
            client,
            next: Some(first_url),
            resource,
            _item: PhantomData,
        }
    }

    /// Whether another page may be fetched.
    pub fn more(&self) -> bool {
        self.next.is_some()
    }

    /// Fetch the next page, or `None` once the listing is exhausted.
    pub async fn next_page(&mut self) -> Option<Result<Vec<T>, ClientError>> {
        let url = self.next.take()?;
        match self.client.get_page::<T>(&url, &self.resource).await {
            Ok(page) => {
                self.next = page.next_link.filter(|link| !link.is_empty());
                Some(Ok(page.value))
            }
            Err(e) => Some(Err(e)),
        }
    }

    /// Drain every page into one vector.
    pub async fn collect_all(mut self) -> Result<Vec<T>, ClientError> {
        let mut items = Vec::new();
        while let Some(page) = self.next_page().await {
            items.extend(page?);
        }
        tracing::debug!(resource = %self.resource, count = items.len(), "listing complete");
        Ok(items)
    }
}
