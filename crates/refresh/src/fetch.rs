use std::future::Future;

use async_trait::async_trait;
use convoy_primitives::{FetchError, ResourceKey};

/// Backend collaborator returning the full current record set for a key.
///
/// Implementations return every record, never a delta.
#[async_trait]
pub trait ResourceFetcher<T>: Send + Sync {
	async fn fetch(&self, key: &ResourceKey) -> Result<Vec<T>, FetchError>;
}

/// Adapts an async closure into a [`ResourceFetcher`].
pub struct FnFetcher<F>(pub F);

#[async_trait]
impl<T, F, Fut> ResourceFetcher<T> for FnFetcher<F>
where
	T: Send + 'static,
	F: Fn(ResourceKey) -> Fut + Send + Sync,
	Fut: Future<Output = Result<Vec<T>, FetchError>> + Send,
{
	async fn fetch(&self, key: &ResourceKey) -> Result<Vec<T>, FetchError> {
		(self.0)(key.clone()).await
	}
}
