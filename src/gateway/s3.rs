use aws_sdk_s3::Client;
use aws_sdk_s3::error::{BuildError, DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::list_object_versions::ListObjectVersionsOutput;
use aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Output;
use aws_sdk_s3::types::{BucketVersioningStatus, Delete, ObjectIdentifier};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use std::error::Error;
use std::fmt::Debug;

use crate::gateway::{
    Bucket, ContentUnit, DeleteFailure, DeleteOutcome, GatewayError, MAX_BATCH_SIZE,
    StorageGateway, VersioningMode,
};

const BUCKET_NOT_EMPTY: &str = "BucketNotEmpty";

fn provider_error<E, R>(err: SdkError<E, R>) -> GatewayError
where
    E: ProvideErrorMetadata + Error + 'static,
    R: Debug,
{
    GatewayError::Provider {
        code: err.code().map(str::to_owned),
        message: DisplayErrorContext(&err).to_string(),
    }
}

fn build_error(err: BuildError) -> GatewayError {
    GatewayError::provider(format!("Request could not be set up: {err}"))
}

/// Continuation token of the next `ListObjectsV2` page.
#[derive(Debug, Default, PartialEq, Eq)]
struct ObjectCursor {
    continuation_token: Option<String>,
}

/// Markers of the next `ListObjectVersions` page.
#[derive(Debug, Default, PartialEq, Eq)]
struct VersionCursor {
    key_marker: Option<String>,
    version_id_marker: Option<String>,
}

/// Units of one `ListObjectsV2` page and the cursor of the page after it.
fn object_page(output: &ListObjectsV2Output) -> (Vec<ContentUnit>, Option<ObjectCursor>) {
    let units = output
        .contents()
        .iter()
        .filter_map(|object| object.key())
        .map(|key| ContentUnit::Object {
            key: key.to_owned(),
        })
        .collect();

    let next = match (output.is_truncated(), output.next_continuation_token()) {
        (Some(true), Some(token)) => Some(ObjectCursor {
            continuation_token: Some(token.to_owned()),
        }),
        _ => None,
    };

    (units, next)
}

/// Units of one `ListObjectVersions` page and the cursor of the page after it.
///
/// A truncated page without a key marker ends the listing, restarting from
/// the top would never terminate.
fn version_page(output: &ListObjectVersionsOutput) -> (Vec<ContentUnit>, Option<VersionCursor>) {
    let versions = output.versions().iter().filter_map(|version| {
        Some(ContentUnit::Version {
            key: version.key()?.to_owned(),
            version_id: version.version_id().unwrap_or("null").to_owned(),
        })
    });
    let markers = output.delete_markers().iter().filter_map(|marker| {
        Some(ContentUnit::DeleteMarker {
            key: marker.key()?.to_owned(),
            version_id: marker.version_id().unwrap_or("null").to_owned(),
        })
    });
    let units = versions.chain(markers).collect();

    let next = match (output.is_truncated(), output.next_key_marker()) {
        (Some(true), Some(key_marker)) => Some(VersionCursor {
            key_marker: Some(key_marker.to_owned()),
            version_id_marker: output.next_version_id_marker().map(str::to_owned),
        }),
        _ => None,
    };

    (units, next)
}

/// [`StorageGateway`] over any S3-compatible API (AWS, R2, `MinIO`, ...).
#[derive(Debug, Clone)]
pub struct S3Gateway {
    client: Client,
}

impl S3Gateway {
    pub const fn new(client: Client) -> Self {
        Self { client }
    }

    fn object_pages<'a>(
        &'a self,
        bucket: &'a str,
    ) -> BoxStream<'a, Result<ContentUnit, GatewayError>> {
        // `None` as state means the previous page was the last one.
        stream::try_unfold(
            Some(ObjectCursor::default()),
            move |cursor: Option<ObjectCursor>| async move {
                let Some(cursor) = cursor else {
                    return Ok(None);
                };

                let output = self
                    .client
                    .list_objects_v2()
                    .bucket(bucket)
                    .set_continuation_token(cursor.continuation_token)
                    .send()
                    .await
                    .map_err(provider_error)?;

                let (units, next) = object_page(&output);
                Ok::<_, GatewayError>(Some((units, next)))
            },
        )
        .map_ok(|units| stream::iter(units.into_iter().map(Ok::<_, GatewayError>)))
        .try_flatten()
        .boxed()
    }

    fn version_pages<'a>(
        &'a self,
        bucket: &'a str,
    ) -> BoxStream<'a, Result<ContentUnit, GatewayError>> {
        stream::try_unfold(
            Some(VersionCursor::default()),
            move |cursor: Option<VersionCursor>| async move {
                let Some(cursor) = cursor else {
                    return Ok(None);
                };

                let output = self
                    .client
                    .list_object_versions()
                    .bucket(bucket)
                    .set_key_marker(cursor.key_marker)
                    .set_version_id_marker(cursor.version_id_marker)
                    .send()
                    .await
                    .map_err(provider_error)?;

                let (units, next) = version_page(&output);
                Ok::<_, GatewayError>(Some((units, next)))
            },
        )
        .map_ok(|units| stream::iter(units.into_iter().map(Ok::<_, GatewayError>)))
        .try_flatten()
        .boxed()
    }
}

impl StorageGateway for S3Gateway {
    async fn list_buckets(&self) -> Result<Vec<Bucket>, GatewayError> {
        let output = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(provider_error)?;

        Ok(output
            .buckets()
            .iter()
            .filter_map(|bucket| {
                Some(Bucket {
                    name: bucket.name()?.to_owned(),
                    created: bucket.creation_date().map(ToString::to_string),
                })
            })
            .collect())
    }

    async fn versioning(
        &self,
        bucket: &Bucket,
    ) -> Result<VersioningMode, GatewayError> {
        let output = self
            .client
            .get_bucket_versioning()
            .bucket(&bucket.name)
            .send()
            .await
            .map_err(provider_error)?;

        // a bucket that never had versioning enabled reports no status at all
        Ok(match output.status() {
            Some(BucketVersioningStatus::Enabled) => VersioningMode::Enabled,
            Some(BucketVersioningStatus::Suspended) => VersioningMode::Suspended,
            _ => VersioningMode::Unversioned,
        })
    }

    async fn has_current_objects(
        &self,
        bucket: &Bucket,
    ) -> Result<bool, GatewayError> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(&bucket.name)
            .max_keys(1)
            .send()
            .await
            .map_err(provider_error)?;

        Ok(!output.contents().is_empty())
    }

    async fn has_versions(
        &self,
        bucket: &Bucket,
    ) -> Result<bool, GatewayError> {
        let output = self
            .client
            .list_object_versions()
            .bucket(&bucket.name)
            .max_keys(1)
            .send()
            .await
            .map_err(provider_error)?;

        Ok(!output.versions().is_empty() || !output.delete_markers().is_empty())
    }

    fn content_units<'a>(
        &'a self,
        bucket: &'a Bucket,
        versioning: VersioningMode,
    ) -> BoxStream<'a, Result<ContentUnit, GatewayError>> {
        if versioning.retains_history() {
            self.version_pages(&bucket.name)
        } else {
            self.object_pages(&bucket.name)
        }
    }

    async fn bulk_delete(
        &self,
        bucket: &Bucket,
        batch: &[ContentUnit],
    ) -> Result<DeleteOutcome, GatewayError> {
        if batch.len() > MAX_BATCH_SIZE {
            return Err(GatewayError::provider(format!(
                "Refusing to delete {} objects in one request (maximum is {MAX_BATCH_SIZE}).",
                batch.len()
            )));
        }

        let objects = batch
            .iter()
            .map(|unit| {
                ObjectIdentifier::builder()
                    .key(unit.key())
                    .set_version_id(unit.version_id().map(str::to_owned))
                    .build()
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(build_error)?;

        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()
            .map_err(build_error)?;

        let output = self
            .client
            .delete_objects()
            .bucket(&bucket.name)
            .delete(delete)
            .send()
            .await
            .map_err(provider_error)?;

        let failures = output
            .errors()
            .iter()
            .map(|error| DeleteFailure {
                key: error.key().unwrap_or_default().to_owned(),
                version_id: error.version_id().map(str::to_owned),
                code: error.code().map(str::to_owned),
                message: error.message().unwrap_or("no details provided").to_owned(),
            })
            .collect();

        Ok(DeleteOutcome { failures })
    }

    async fn delete_bucket(
        &self,
        bucket: &Bucket,
    ) -> Result<(), GatewayError> {
        self.client
            .delete_bucket()
            .bucket(&bucket.name)
            .send()
            .await
            .map_err(|err| {
                if err.code() == Some(BUCKET_NOT_EMPTY) {
                    GatewayError::BucketNotEmpty(bucket.name.clone())
                } else {
                    provider_error(err)
                }
            })?;

        Ok(())
    }
}
