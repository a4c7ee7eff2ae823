//! The interactive decommissioning session.
//!
//! A [`Session`] walks one run of the tool through its states: list the
//! buckets, let the user pick one, ask for confirmation, inspect the bucket,
//! ask again before purging, purge and finally delete the bucket. Every
//! destructive call sits behind a `yes` typed by the user, and every provider
//! failure sends the session back to the selection prompt.

use tabled::settings::Style;
use tabled::{Table, Tabled};
use tracing::{error, info};

use crate::console::Console;
use crate::error::DecomError;
use crate::gateway::{Bucket, StorageGateway, VersioningMode};
use crate::helpers::{Selection, StringExt, is_affirmative, parse_selection};
use crate::inspect::{Versioning, inspect_versioning, probe_contents, versioning_mode};
use crate::purge::purge_bucket;

const SELECT_PROMPT: &str = "\nEnter the number of the bucket to delete (or 'q' to quit): ";

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    NoBuckets,
    Quit,
    Deleted(String),
    /// The bucket list could not be fetched.
    Unavailable,
}

impl Outcome {
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Unavailable => 1,
            Self::NoBuckets | Self::Quit | Self::Deleted(_) => 0,
        }
    }
}

#[derive(Debug)]
pub enum State {
    Listing,
    Selecting,
    ConfirmingDelete {
        index: usize,
    },
    InspectingContents {
        index: usize,
    },
    ConfirmingPurge {
        index: usize,
        versioning: Versioning,
    },
    Purging {
        index: usize,
        versioning: Versioning,
    },
    DeletingBucket {
        index: usize,
    },
    Aborted {
        index: usize,
    },
    Failed(DecomError),
    Done(Outcome),
}

/// A bucket as shown to the user, annotated at listing time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedBucket {
    pub bucket: Bucket,
    pub versioning: VersioningMode,
}

#[derive(Tabled)]
struct BucketRow {
    #[tabled(rename = "#")]
    number: usize,
    bucket: String,
    versioning: String,
    created: String,
}

impl BucketRow {
    fn new(
        number: usize,
        listed: &ListedBucket,
    ) -> Self {
        Self {
            number,
            bucket: listed.bucket.name.clone(),
            versioning: listed.versioning.to_string(),
            created: listed.bucket.created.clone().unwrap_or_default().or("-"),
        }
    }
}

fn render_buckets(buckets: &[ListedBucket]) -> String {
    let rows = buckets
        .iter()
        .enumerate()
        .map(|(index, listed)| BucketRow::new(index + 1, listed));

    Table::new(rows).with(Style::rounded()).to_string()
}

pub struct Session<'a, G, C> {
    gateway: &'a G,
    console: &'a mut C,
    /// Snapshot taken in `Listing`, never refreshed.
    buckets: Vec<ListedBucket>,
}

impl<'a, G: StorageGateway, C: Console> Session<'a, G, C> {
    pub const fn new(
        gateway: &'a G,
        console: &'a mut C,
    ) -> Self {
        Self {
            gateway,
            console,
            buckets: Vec::new(),
        }
    }

    pub async fn run(mut self) -> anyhow::Result<Outcome> {
        let mut state = State::Listing;

        loop {
            state = match self.step(state).await? {
                State::Done(outcome) => return Ok(outcome),
                next => next,
            };
        }
    }

    fn bucket(
        &self,
        index: usize,
    ) -> &Bucket {
        &self.buckets[index].bucket
    }

    fn confirm(
        &mut self,
        prompt: &str,
    ) -> anyhow::Result<bool> {
        let answer = self.console.read_line(prompt)?;

        Ok(answer.as_deref().is_some_and(is_affirmative))
    }

    /// Performs the work of `state` and returns the state that follows it.
    pub async fn step(
        &mut self,
        state: State,
    ) -> anyhow::Result<State> {
        let next = match state {
            State::Listing => self.list().await,
            State::Selecting => self.select()?,
            State::ConfirmingDelete { index } => {
                let prompt = format!(
                    "\nAre you sure you want to delete '{}'? This action cannot be undone! (yes/no): ",
                    self.bucket(index)
                );

                if self.confirm(&prompt)? {
                    State::InspectingContents { index }
                } else {
                    State::Aborted { index }
                }
            }
            State::InspectingContents { index } => self.inspect(index).await,
            State::ConfirmingPurge { index, versioning } => {
                self.confirm_purge(index, versioning)?
            }
            State::Purging { index, versioning } => self.purge(index, versioning).await,
            State::DeletingBucket { index } => self.delete(index).await,
            State::Aborted { index } => {
                let line = format!("Deletion of '{}' cancelled.", self.bucket(index));
                self.console.say(&line);
                State::Selecting
            }
            State::Failed(err) => {
                error!(error = %err, "bucket was not deleted");
                self.console.fail(&err.to_string());
                State::Selecting
            }
            done @ State::Done(_) => done,
        };

        Ok(next)
    }

    async fn list(&mut self) -> State {
        let buckets = match self.gateway.list_buckets().await {
            Ok(buckets) => buckets,
            Err(err) => {
                self.console.fail(&DecomError::ListBuckets(err).to_string());
                return State::Done(Outcome::Unavailable);
            }
        };

        if buckets.is_empty() {
            self.console.say("No buckets found in your account.");
            return State::Done(Outcome::NoBuckets);
        }

        let mut listed = Vec::with_capacity(buckets.len());
        for bucket in buckets {
            let versioning = versioning_mode(self.gateway, &bucket).await;
            listed.push(ListedBucket { bucket, versioning });
        }
        self.buckets = listed;

        self.console.say("\nAvailable buckets:");
        self.console.say(&render_buckets(&self.buckets));

        State::Selecting
    }

    fn select(&mut self) -> anyhow::Result<State> {
        let Some(answer) = self.console.read_line(SELECT_PROMPT)? else {
            return Ok(State::Done(Outcome::Quit));
        };

        Ok(match parse_selection(&answer, self.buckets.len()) {
            Ok(Selection::Quit) => State::Done(Outcome::Quit),
            Ok(Selection::Index(index)) => State::ConfirmingDelete { index },
            Err(err) => {
                self.console.warn(&err.to_string());
                State::Selecting
            }
        })
    }

    async fn inspect(
        &self,
        index: usize,
    ) -> State {
        let bucket = &self.buckets[index].bucket;

        // the listing annotation may be stale, ask again
        let versioning = inspect_versioning(self.gateway, bucket).await;

        match probe_contents(self.gateway, bucket, versioning.listing_mode()).await {
            Ok(probe) if probe.is_empty() => State::DeletingBucket { index },
            Ok(_) => State::ConfirmingPurge { index, versioning },
            Err(err) => State::Failed(err),
        }
    }

    fn confirm_purge(
        &mut self,
        index: usize,
        versioning: Versioning,
    ) -> anyhow::Result<State> {
        let prompt = if versioning.mode.retains_history() {
            let warning = format!(
                "\nWARNING: '{}' is a versioned bucket. Deleting it will irrecoverably remove ALL versions of ALL objects.\n",
                self.bucket(index)
            );
            self.console.warn(&warning);

            "Delete all versions and empty the bucket? (yes/no): ".to_owned()
        } else {
            format!(
                "Bucket '{}' is not empty. Empty and delete it? (yes/no): ",
                self.bucket(index)
            )
        };

        Ok(if self.confirm(&prompt)? {
            State::Purging { index, versioning }
        } else {
            State::Aborted { index }
        })
    }

    async fn purge(
        &mut self,
        index: usize,
        versioning: Versioning,
    ) -> State {
        let line = format!("Emptying bucket '{}'...", self.bucket(index));
        self.console.say(&line);

        let bucket = &self.buckets[index].bucket;
        match purge_bucket(self.gateway, bucket, versioning.listing_mode()).await {
            Ok(report) => {
                let line = format!(
                    "Removed {} objects, versions and delete markers in {} batches.",
                    report.removed, report.batches
                );
                self.console.say(&line);
                State::DeletingBucket { index }
            }
            Err(err) => State::Failed(err),
        }
    }

    async fn delete(
        &mut self,
        index: usize,
    ) -> State {
        let bucket = self.buckets[index].bucket.clone();
        self.console.say(&format!("Deleting bucket '{bucket}'..."));

        match self.gateway.delete_bucket(&bucket).await {
            Ok(()) => {
                info!(bucket = %bucket.name, "bucket deleted");
                self.console.say("Bucket deleted successfully!");
                State::Done(Outcome::Deleted(bucket.name))
            }
            Err(source) => State::Failed(DecomError::BucketDelete {
                bucket: bucket.name,
                source,
            }),
        }
    }
}
