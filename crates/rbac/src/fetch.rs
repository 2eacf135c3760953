use async_trait::async_trait;
use convoy_primitives::{FetchError, UserId};

use crate::permission::PermissionSetDescriptor;

/// Backend collaborator listing the role grants visible to a user.
#[async_trait]
pub trait PermissionFetcher: Send + Sync {
	async fn fetch_permissions(&self, user: &UserId) -> Result<Vec<PermissionSetDescriptor>, FetchError>;
}
