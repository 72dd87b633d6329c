//! Backend resolution
//!
//! Order is fixed: instance id, then selector (both answered by the lookup),
//! then an ephemeral handle built from inline credentials.

use crate::address::{BlobAddress, UserInfo};
use crate::backend::{BackendFactory, BackendHandle, BackendLookup};
use crate::error::{Error, Result};

/// A handle plus where it came from
#[derive(Clone)]
pub struct ResolvedBackend {
    pub handle: BackendHandle,
    /// Built from inline credentials for this one operation, not registered
    pub ephemeral: bool,
}

impl std::fmt::Debug for ResolvedBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedBackend")
            .field("ephemeral", &self.ephemeral)
            .finish_non_exhaustive()
    }
}

/// Resolve the backend an address refers to
pub async fn resolve(
    address: &BlobAddress,
    lookup: &dyn BackendLookup,
    factory: &dyn BackendFactory,
) -> Result<ResolvedBackend> {
    if let Some(handle) = lookup
        .find_backend(address.instance_id.as_deref(), &address.selector)
        .await
    {
        tracing::debug!(address = %address, "Resolved registered backend instance");
        return Ok(ResolvedBackend {
            handle,
            ephemeral: false,
        });
    }

    match &address.user_info {
        Some(UserInfo::Credentials(creds)) => {
            tracing::debug!(
                selector = %address.selector,
                identity = %creds.identity,
                "Constructing ephemeral backend from inline credentials"
            );
            let handle = factory
                .create_backend(&address.selector, &creds.identity, &creds.secret)
                .await?;
            Ok(ResolvedBackend {
                handle,
                ephemeral: true,
            })
        }
        Some(UserInfo::Unusable) => Err(Error::BackendUnavailable(format!(
            "no backend instance for provider '{}' and the URL user-info is not of the form identity:secret",
            address.selector
        ))),
        None => Err(Error::BackendUnavailable(match &address.instance_id {
            Some(id) => format!(
                "no backend instance '{id}' for provider '{}'",
                address.selector
            ),
            None => format!("no backend instance for provider '{}'", address.selector),
        })),
    }
}
