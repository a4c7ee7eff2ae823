use tracing::warn;

use crate::error::DecomError;
use crate::gateway::{Bucket, StorageGateway, VersioningMode};

/// Versioning status of a bucket as far as the provider disclosed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Versioning {
    /// [`VersioningMode::Unversioned`] when the status is unknown.
    pub mode: VersioningMode,
    pub known: bool,
}

impl Versioning {
    /// Mode used to probe and enumerate the bucket.
    ///
    /// An unknown status may hide versions and delete markers, so such a
    /// bucket is listed like a suspended one. Version listings of a truly
    /// unversioned bucket return its objects with a `null` version id.
    pub const fn listing_mode(self) -> VersioningMode {
        if self.known {
            self.mode
        } else {
            VersioningMode::Suspended
        }
    }
}

pub async fn inspect_versioning<G: StorageGateway>(
    gateway: &G,
    bucket: &Bucket,
) -> Versioning {
    match gateway.versioning(bucket).await {
        Ok(mode) => Versioning { mode, known: true },
        Err(err) => {
            warn!(
                bucket = %bucket.name,
                error = %err,
                "could not determine versioning status, treating bucket as unversioned"
            );
            Versioning {
                mode: VersioningMode::Unversioned,
                known: false,
            }
        }
    }
}

/// Versioning mode of `bucket`, falling back to [`VersioningMode::Unversioned`]
/// when the provider can't tell.
pub async fn versioning_mode<G: StorageGateway>(
    gateway: &G,
    bucket: &Bucket,
) -> VersioningMode {
    inspect_versioning(gateway, bucket).await.mode
}

/// Result of the bounded emptiness probe: existence only, never a count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContentsProbe {
    pub has_objects: bool,
    pub has_versions: bool,
}

impl ContentsProbe {
    pub const fn is_empty(self) -> bool {
        !self.has_objects && !self.has_versions
    }
}

pub async fn probe_contents<G: StorageGateway>(
    gateway: &G,
    bucket: &Bucket,
    versioning: VersioningMode,
) -> Result<ContentsProbe, DecomError> {
    let query = |source| DecomError::Query {
        bucket: bucket.name.clone(),
        source,
    };

    let has_objects = gateway.has_current_objects(bucket).await.map_err(query)?;
    let has_versions = if versioning.retains_history() {
        gateway.has_versions(bucket).await.map_err(query)?
    } else {
        false
    };

    Ok(ContentsProbe {
        has_objects,
        has_versions,
    })
}
