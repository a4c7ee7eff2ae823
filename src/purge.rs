use futures::StreamExt;
use tracing::{debug, info};

use crate::error::DecomError;
use crate::gateway::{Bucket, ContentUnit, MAX_BATCH_SIZE, StorageGateway, VersioningMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PurgeReport {
    pub batches: usize,
    pub removed: usize,
}

async fn submit_batch<G: StorageGateway>(
    gateway: &G,
    bucket: &Bucket,
    batch: &mut Vec<ContentUnit>,
    report: &mut PurgeReport,
) -> Result<(), DecomError> {
    let submitted = batch.len();

    let outcome = gateway
        .bulk_delete(bucket, batch)
        .await
        .map_err(|source| DecomError::BatchRejected {
            bucket: bucket.name.clone(),
            submitted,
            source,
        })?;

    if let Some(first) = outcome.failures.first() {
        return Err(DecomError::BatchIncomplete {
            bucket: bucket.name.clone(),
            submitted,
            failed: outcome.failures.len(),
            first: first.clone(),
        });
    }

    report.batches += 1;
    report.removed += submitted;
    batch.clear();

    debug!(
        bucket = %bucket.name,
        batch = report.batches,
        size = submitted,
        removed = report.removed,
        "bulk delete succeeded"
    );

    Ok(())
}

/// Removes every object, version and delete marker of `bucket`.
///
/// Enumeration is always requested fresh from the provider. Units are sent in
/// batches of at most [`MAX_BATCH_SIZE`]; the first failed batch stops the purge.
pub async fn purge_bucket<G: StorageGateway>(
    gateway: &G,
    bucket: &Bucket,
    versioning: VersioningMode,
) -> Result<PurgeReport, DecomError> {
    let mut units = gateway.content_units(bucket, versioning);
    let mut batch = Vec::with_capacity(MAX_BATCH_SIZE);
    let mut report = PurgeReport::default();

    while let Some(unit) = units.next().await {
        let unit = unit.map_err(|source| DecomError::Enumeration {
            bucket: bucket.name.clone(),
            source,
        })?;

        batch.push(unit);

        if batch.len() == MAX_BATCH_SIZE {
            submit_batch(gateway, bucket, &mut batch, &mut report).await?;
        }
    }

    if !batch.is_empty() {
        submit_batch(gateway, bucket, &mut batch, &mut report).await?;
    }

    info!(
        bucket = %bucket.name,
        batches = report.batches,
        removed = report.removed,
        "bucket purged"
    );

    Ok(report)
}
