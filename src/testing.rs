//! In-memory stand-ins for the provider and the terminal.

use futures::stream::{self, BoxStream, StreamExt};
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::io;
use std::sync::Mutex;

use crate::console::Console;
use crate::gateway::{
    Bucket, ContentUnit, DeleteFailure, DeleteOutcome, GatewayError, MAX_BATCH_SIZE,
    StorageGateway, VersioningMode,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListBuckets,
    Versioning(String),
    HasCurrentObjects(String),
    HasVersions(String),
    ContentUnits(String),
    BulkDelete(String, usize),
    DeleteBucket(String),
}

impl Call {
    pub const fn is_mutation(&self) -> bool {
        matches!(self, Self::BulkDelete(..) | Self::DeleteBucket(_))
    }
}

#[derive(Debug, Clone)]
pub struct MemoryBucket {
    name: String,
    versioning: VersioningMode,
    objects: BTreeSet<String>,
    /// Oldest first; the last entry of a key is its current state.
    versions: Vec<ContentUnit>,
    rejected: HashSet<String>,
    failing_versioning: bool,
    failing_enumeration: bool,
    failing_bulk_delete: bool,
}

impl MemoryBucket {
    fn new(
        name: &str,
        versioning: VersioningMode,
    ) -> Self {
        Self {
            name: name.to_owned(),
            versioning,
            objects: BTreeSet::new(),
            versions: Vec::new(),
            rejected: HashSet::new(),
            failing_versioning: false,
            failing_enumeration: false,
            failing_bulk_delete: false,
        }
    }

    pub fn unversioned(name: &str) -> Self {
        Self::new(name, VersioningMode::Unversioned)
    }

    pub fn versioned(name: &str) -> Self {
        Self::new(name, VersioningMode::Enabled)
    }

    pub fn suspended(name: &str) -> Self {
        Self::new(name, VersioningMode::Suspended)
    }

    /// Adds `count` current objects named `object-00000`, `object-00001`, ...
    pub fn with_objects(
        mut self,
        count: usize,
    ) -> Self {
        self.objects
            .extend((0..count).map(|index| format!("object-{index:05}")));
        self
    }

    pub fn with_versions(
        mut self,
        key: &str,
        count: usize,
    ) -> Self {
        for _ in 0..count {
            let version_id = format!("v{}", self.versions.len());
            self.versions.push(ContentUnit::Version {
                key: key.to_owned(),
                version_id,
            });
        }
        self
    }

    pub fn with_delete_marker(
        mut self,
        key: &str,
    ) -> Self {
        let version_id = format!("dm{}", self.versions.len());
        self.versions.push(ContentUnit::DeleteMarker {
            key: key.to_owned(),
            version_id,
        });
        self
    }

    /// Bulk deletes report `key` as failed instead of removing it.
    pub fn rejecting(
        mut self,
        key: &str,
    ) -> Self {
        self.rejected.insert(key.to_owned());
        self
    }

    pub fn failing_versioning(mut self) -> Self {
        self.failing_versioning = true;
        self
    }

    pub fn failing_enumeration(mut self) -> Self {
        self.failing_enumeration = true;
        self
    }

    /// Bulk deletes are refused as a whole.
    pub fn failing_bulk_delete(mut self) -> Self {
        self.failing_bulk_delete = true;
        self
    }

    fn has_current_objects(&self) -> bool {
        if !self.objects.is_empty() {
            return true;
        }

        let mut seen = HashSet::new();
        self.versions
            .iter()
            .rev()
            .filter(|unit| seen.insert(unit.key().to_owned()))
            .any(|unit| matches!(unit, ContentUnit::Version { .. }))
    }

    fn remaining(&self) -> usize {
        self.objects.len() + self.versions.len()
    }

    fn remove(
        &mut self,
        unit: &ContentUnit,
    ) {
        match unit {
            ContentUnit::Object { key } => {
                self.objects.remove(key);
            }
            ContentUnit::Version { .. } | ContentUnit::DeleteMarker { .. } => {
                self.versions.retain(|stored| stored != unit);
            }
        }
    }
}

/// Provider double that records every call it receives.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    buckets: Mutex<Vec<MemoryBucket>>,
    calls: Mutex<Vec<Call>>,
    failing_listing: bool,
}

impl MemoryGateway {
    pub fn with_bucket(
        self,
        bucket: MemoryBucket,
    ) -> Self {
        self.buckets.lock().unwrap().push(bucket);
        self
    }

    pub fn failing_listing(mut self) -> Self {
        self.failing_listing = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(Call::is_mutation)
            .collect()
    }

    pub fn bulk_delete_sizes(&self) -> Vec<usize> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::BulkDelete(_, size) => Some(size),
                _ => None,
            })
            .collect()
    }

    pub fn exists(
        &self,
        name: &str,
    ) -> bool {
        self.buckets
            .lock()
            .unwrap()
            .iter()
            .any(|bucket| bucket.name == name)
    }

    /// Objects, versions and delete markers left in `name`.
    pub fn remaining(
        &self,
        name: &str,
    ) -> usize {
        self.buckets
            .lock()
            .unwrap()
            .iter()
            .find(|bucket| bucket.name == name)
            .map_or(0, MemoryBucket::remaining)
    }

    fn record(
        &self,
        call: Call,
    ) {
        self.calls.lock().unwrap().push(call);
    }

    fn bucket<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut MemoryBucket) -> Result<T, GatewayError>,
    ) -> Result<T, GatewayError> {
        let mut buckets = self.buckets.lock().unwrap();
        let bucket = buckets
            .iter_mut()
            .find(|bucket| bucket.name == name)
            .ok_or_else(|| GatewayError::Provider {
                code: Some("NoSuchBucket".into()),
                message: format!("The specified bucket `{name}` does not exist"),
            })?;
        f(bucket)
    }
}

impl StorageGateway for MemoryGateway {
    async fn list_buckets(&self) -> Result<Vec<Bucket>, GatewayError> {
        self.record(Call::ListBuckets);

        if self.failing_listing {
            return Err(GatewayError::provider("Access Denied"));
        }

        Ok(self
            .buckets
            .lock()
            .unwrap()
            .iter()
            .map(|bucket| Bucket::new(bucket.name.clone()))
            .collect())
    }

    async fn versioning(
        &self,
        bucket: &Bucket,
    ) -> Result<VersioningMode, GatewayError> {
        self.record(Call::Versioning(bucket.name.clone()));

        self.bucket(&bucket.name, |stored| {
            if stored.failing_versioning {
                Err(GatewayError::provider("Service Unavailable"))
            } else {
                Ok(stored.versioning)
            }
        })
    }

    async fn has_current_objects(
        &self,
        bucket: &Bucket,
    ) -> Result<bool, GatewayError> {
        self.record(Call::HasCurrentObjects(bucket.name.clone()));

        self.bucket(&bucket.name, |stored| Ok(stored.has_current_objects()))
    }

    async fn has_versions(
        &self,
        bucket: &Bucket,
    ) -> Result<bool, GatewayError> {
        self.record(Call::HasVersions(bucket.name.clone()));

        self.bucket(&bucket.name, |stored| Ok(!stored.versions.is_empty()))
    }

    fn content_units<'a>(
        &'a self,
        bucket: &'a Bucket,
        versioning: VersioningMode,
    ) -> BoxStream<'a, Result<ContentUnit, GatewayError>> {
        self.record(Call::ContentUnits(bucket.name.clone()));

        let units = self.bucket(&bucket.name, |stored| {
            if stored.failing_enumeration {
                return Err(GatewayError::provider("connection reset while listing"));
            }

            let objects = stored.objects.iter().map(|key| ContentUnit::Object {
                key: key.clone(),
            });

            // like S3, a plain object listing never shows versions
            Ok(if versioning.retains_history() {
                objects.chain(stored.versions.iter().cloned()).collect()
            } else {
                objects.collect::<Vec<_>>()
            })
        });

        match units {
            Ok(units) => stream::iter(units.into_iter().map(Ok)).boxed(),
            Err(err) => stream::once(async move { Err(err) }).boxed(),
        }
    }

    async fn bulk_delete(
        &self,
        bucket: &Bucket,
        batch: &[ContentUnit],
    ) -> Result<DeleteOutcome, GatewayError> {
        self.record(Call::BulkDelete(bucket.name.clone(), batch.len()));

        if batch.len() > MAX_BATCH_SIZE {
            return Err(GatewayError::Provider {
                code: Some("MalformedXML".into()),
                message: "too many objects in one request".into(),
            });
        }

        self.bucket(&bucket.name, |stored| {
            if stored.failing_bulk_delete {
                return Err(GatewayError::Provider {
                    code: Some("AccessDenied".into()),
                    message: "Access Denied".into(),
                });
            }

            let mut failures = Vec::new();

            for unit in batch {
                if stored.rejected.contains(unit.key()) {
                    failures.push(DeleteFailure {
                        key: unit.key().to_owned(),
                        version_id: unit.version_id().map(str::to_owned),
                        code: Some("AccessDenied".into()),
                        message: "Access Denied".into(),
                    });
                } else {
                    stored.remove(unit);
                }
            }

            Ok(DeleteOutcome { failures })
        })
    }

    async fn delete_bucket(
        &self,
        bucket: &Bucket,
    ) -> Result<(), GatewayError> {
        self.record(Call::DeleteBucket(bucket.name.clone()));

        let mut buckets = self.buckets.lock().unwrap();
        let Some(position) = buckets.iter().position(|stored| stored.name == bucket.name) else {
            return Err(GatewayError::provider("The specified bucket does not exist"));
        };

        if buckets[position].remaining() > 0 {
            return Err(GatewayError::BucketNotEmpty(bucket.name.clone()));
        }

        buckets.remove(position);
        Ok(())
    }
}

/// Console that answers prompts from a script and keeps a transcript.
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    answers: VecDeque<String>,
    pub prompts: Vec<String>,
    pub transcript: Vec<String>,
}

impl ScriptedConsole {
    pub fn new<const N: usize>(answers: [&str; N]) -> Self {
        Self {
            answers: answers.iter().map(|answer| (*answer).to_owned()).collect(),
            ..Self::default()
        }
    }

    pub fn printed(
        &self,
        needle: &str,
    ) -> bool {
        self.transcript.iter().any(|line| line.contains(needle))
    }

    pub fn unanswered(&self) -> usize {
        self.answers.len()
    }
}

impl Console for ScriptedConsole {
    fn read_line(
        &mut self,
        prompt: &str,
    ) -> io::Result<Option<String>> {
        self.prompts.push(prompt.to_owned());
        Ok(self.answers.pop_front())
    }

    fn say(
        &mut self,
        line: &str,
    ) {
        self.transcript.push(line.to_owned());
    }

    fn warn(
        &mut self,
        line: &str,
    ) {
        self.transcript.push(format!("warning: {line}"));
    }

    fn fail(
        &mut self,
        line: &str,
    ) {
        self.transcript.push(format!("error: {line}"));
    }
}
