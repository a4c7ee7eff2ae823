//! Storage provider abstraction.
//!
//! Everything the decommissioning session needs from an object store goes
//! through [`StorageGateway`]. The S3 implementation lives in [`s3`].

use futures::stream::BoxStream;
use std::fmt::{Display, Formatter};
use thiserror::Error;

pub mod s3;

pub use s3::S3Gateway;

/// Hard ceiling of a single bulk-delete request.
pub const MAX_BATCH_SIZE: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bucket {
    pub name: String,
    pub created: Option<String>,
}

impl Bucket {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            created: None,
        }
    }
}

impl Display for Bucket {
    fn fmt(
        &self,
        f: &mut Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum VersioningMode {
    Enabled,
    Suspended,
    #[default]
    Unversioned,
}

impl VersioningMode {
    /// Whether the bucket may hold historical versions or delete markers.
    ///
    /// Suspending versioning keeps every version written while it was enabled.
    pub const fn retains_history(self) -> bool {
        matches!(self, Self::Enabled | Self::Suspended)
    }
}

impl Display for VersioningMode {
    fn fmt(
        &self,
        f: &mut Formatter<'_>,
    ) -> std::fmt::Result {
        let str = match self {
            Self::Enabled => "versioned",
            Self::Suspended => "suspended",
            Self::Unversioned => "unversioned",
        };
        write!(f, "{str}")
    }
}

/// A single deletable entity of a bucket.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContentUnit {
    Object { key: String },
    Version { key: String, version_id: String },
    DeleteMarker { key: String, version_id: String },
}

impl ContentUnit {
    pub fn key(&self) -> &str {
        match self {
            Self::Object { key } | Self::Version { key, .. } | Self::DeleteMarker { key, .. } => {
                key
            }
        }
    }

    pub fn version_id(&self) -> Option<&str> {
        match self {
            Self::Object { .. } => None,
            Self::Version { version_id, .. } | Self::DeleteMarker { version_id, .. } => {
                Some(version_id)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteFailure {
    pub key: String,
    pub version_id: Option<String>,
    pub code: Option<String>,
    pub message: String,
}

impl Display for DeleteFailure {
    fn fmt(
        &self,
        f: &mut Formatter<'_>,
    ) -> std::fmt::Result {
        match &self.version_id {
            Some(version_id) => write!(f, "`{}` ({version_id})", self.key)?,
            None => write!(f, "`{}`", self.key)?,
        }
        match &self.code {
            Some(code) => write!(f, ": {code}: {}", self.message),
            None => write!(f, ": {}", self.message),
        }
    }
}

/// Per-identifier result of a bulk delete; only failures are reported.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeleteOutcome {
    pub failures: Vec<DeleteFailure>,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("bucket is not empty")]
    BucketNotEmpty(String),

    #[error("{message}")]
    Provider {
        code: Option<String>,
        message: String,
    },
}

impl GatewayError {
    pub fn provider<S: Into<String>>(message: S) -> Self {
        Self::Provider {
            code: None,
            message: message.into(),
        }
    }
}

pub trait StorageGateway {
    /// Provider order is the display order of the session.
    async fn list_buckets(&self) -> Result<Vec<Bucket>, GatewayError>;

    async fn versioning(
        &self,
        bucket: &Bucket,
    ) -> Result<VersioningMode, GatewayError>;

    /// Existence check that inspects at most one current object.
    async fn has_current_objects(
        &self,
        bucket: &Bucket,
    ) -> Result<bool, GatewayError>;

    /// Existence check that inspects at most one version or delete marker.
    async fn has_versions(
        &self,
        bucket: &Bucket,
    ) -> Result<bool, GatewayError>;

    /// Fresh enumeration of every content unit, never resumed from an earlier call.
    ///
    /// Buckets that retain history yield every version and delete marker,
    /// others yield their current objects.
    fn content_units<'a>(
        &'a self,
        bucket: &'a Bucket,
        versioning: VersioningMode,
    ) -> BoxStream<'a, Result<ContentUnit, GatewayError>>;

    /// Deletes at most [`MAX_BATCH_SIZE`] units in one request.
    async fn bulk_delete(
        &self,
        bucket: &Bucket,
        batch: &[ContentUnit],
    ) -> Result<DeleteOutcome, GatewayError>;

    async fn delete_bucket(
        &self,
        bucket: &Bucket,
    ) -> Result<(), GatewayError>;
}
