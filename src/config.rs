use anyhow::{Context, bail};
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Region;
use dotenvy::from_path_iter;
use resolve_path::PathResolveExt;
use std::collections::BTreeMap;
use std::env;
use std::fmt::{Debug, Display};
use std::path::{Path, PathBuf};

const DEFAULT_LOG_LEVEL: &str = "warn";
const R2_REGION: &str = "auto";

fn read_configfile(path: &PathBuf) -> Option<BTreeMap<String, String>> {
    let iter = from_path_iter(path).ok()?;

    let mut config: BTreeMap<String, String> = BTreeMap::new();

    for item in iter {
        let (key, value) = item.ok()?;
        config.insert(key, value);
    }

    Some(config)
}

/// Config file value first, process environment second.
fn lookup(
    config: &BTreeMap<String, String>,
    key: &str,
) -> Option<String> {
    let non_empty = |value: &String| !value.is_empty();

    config
        .get(key)
        .filter(|value| non_empty(value))
        .cloned()
        .or_else(|| env::var(key).ok().filter(non_empty))
}

/// Endpoint and credentials of the storage provider.
///
/// Unset values are left to the regular AWS resolution chain.
#[derive(Clone, Default, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Settings {
    endpoint_url: Option<String>,
    region: Option<String>,
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
    log_level: Option<String>,
}

impl Settings {
    fn from_map(config: &BTreeMap<String, String>) -> Self {
        let r2_account = lookup(config, "R2_ACCOUNT_ID");

        let endpoint_url = lookup(config, "S3_ENDPOINT_URL").or_else(|| {
            r2_account
                .as_ref()
                .map(|account_id| format!("https://{account_id}.r2.cloudflarestorage.com"))
        });
        let region = lookup(config, "S3_REGION")
            .or_else(|| r2_account.as_ref().map(|_| R2_REGION.to_owned()));

        Self {
            endpoint_url,
            region,
            access_key_id: lookup(config, "S3_ACCESS_KEY_ID"),
            secret_access_key: lookup(config, "S3_SECRET_ACCESS_KEY"),
            log_level: lookup(config, "REAPER_LOG"),
        }
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let abs_path = path
            .try_resolve()
            .map_or_else(|_| path.to_path_buf(), std::borrow::Cow::into_owned);

        let Some(config) = read_configfile(&abs_path) else {
            bail!("Invalid config file {}", abs_path.display())
        };

        Ok(Self::from_map(&config))
    }

    pub fn from_filename(filename: &str) -> anyhow::Result<Self> {
        Self::from_path(Path::new(filename))
    }

    /// Read .reaper config file
    pub fn from_dot_reaper() -> anyhow::Result<Self> {
        Self::from_filename(".reaper")
    }

    pub fn from_global_dot_reaper() -> anyhow::Result<Self> {
        Self::from_filename("~/.reaper")
    }

    pub fn from_dotenv() -> anyhow::Result<Self> {
        Self::from_filename(".env")
    }

    pub fn from_env() -> Self {
        Self::from_map(&BTreeMap::new())
    }

    pub fn guess() -> Self {
        // .reaper, then .env, then ~/.reaper, then environment variables
        Self::from_dot_reaper()
            .or_else(|_| Self::from_dotenv())
            .or_else(|_| Self::from_global_dot_reaper())
            .unwrap_or_else(|_| Self::from_env())
    }

    pub fn endpoint_url(&self) -> Option<&str> {
        self.endpoint_url.as_deref()
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    fn credentials(&self) -> Option<Credentials> {
        let (Some(key_id), Some(secret)) = (&self.access_key_id, &self.secret_access_key) else {
            return None;
        };

        Some(Credentials::new(key_id, secret, None, None, "bucket-reaper"))
    }

    pub async fn into_s3(self) -> anyhow::Result<Client> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if let Some(region) = &self.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(url) = &self.endpoint_url {
            loader = loader.endpoint_url(url);
        }
        if let Some(credentials) = self.credentials() {
            loader = loader.credentials_provider(credentials);
        }

        let shared_config = loader.load().await;
        shared_config
            .region()
            .with_context(|| "No region configured (set `S3_REGION` or `AWS_REGION`)")?;

        let config = aws_sdk_s3::config::Builder::from(&shared_config)
            // custom endpoints (R2, MinIO, ...) rarely support virtual-hosted buckets
            .force_path_style(self.endpoint_url.is_some())
            .build();

        Ok(Client::from_conf(config))
    }
}

impl Display for Settings {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(
            f,
            "endpoint: {}, region: {}, credentials: {}",
            self.endpoint_url.as_deref().unwrap_or("default"),
            self.region.as_deref().unwrap_or("default"),
            if self.credentials().is_some() {
                "static"
            } else {
                "default chain"
            }
        )
    }
}

impl Debug for Settings {
    // never print the secret
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("endpoint_url", &self.endpoint_url)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "***"),
            )
            .field("log_level", &self.log_level)
            .finish()
    }
}
