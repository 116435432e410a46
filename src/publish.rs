//! Publish built site assets
//!
//! Empties the provisioned bucket, uploads the build output with content
//! types, and invalidates the CloudFront cache. The bucket name is derived
//! from the project name and the deploying account id, matching the site
//! template's naming scheme.

use std::fs;
use std::path::Path;

use serde::Serialize;
use walkdir::WalkDir;

use crate::config::PublishConfig;
use crate::error::{HoistError, HoistResult};
use crate::provider::{EdgeCache, IdentityProvider, ObjectStore, ProviderError};

/// Summary of one publish run
#[derive(Debug, Clone, Serialize)]
pub struct PublishReport {
    pub bucket: String,
    pub removed: usize,
    pub uploaded: usize,
    pub invalidated: bool,
}

/// Uploads a build directory to the site bucket and clears the CDN cache
pub struct PublishWorkflow<'a> {
    config: &'a PublishConfig,
    identity: &'a dyn IdentityProvider,
    store: &'a dyn ObjectStore,
    cache: &'a dyn EdgeCache,
}

impl<'a> PublishWorkflow<'a> {
    pub fn new(
        config: &'a PublishConfig,
        identity: &'a dyn IdentityProvider,
        store: &'a dyn ObjectStore,
        cache: &'a dyn EdgeCache,
    ) -> Self {
        Self {
            config,
            identity,
            store,
            cache,
        }
    }

    pub fn run(&self, dist_dir: &Path) -> HoistResult<PublishReport> {
        let account = self.identity.account_id().map_err(api)?;
        let bucket = bucket_name(&self.config.project, &account);

        let removed = self.empty_bucket(&bucket)?;
        let uploaded = self.upload_tree(&bucket, dist_dir)?;

        self.cache
            .invalidate_all(&self.config.distribution_id)
            .map_err(api)?;

        Ok(PublishReport {
            bucket,
            removed,
            uploaded,
            invalidated: true,
        })
    }

    fn empty_bucket(&self, bucket: &str) -> HoistResult<usize> {
        let keys = self.store.list_keys(bucket).map_err(api)?;
        if keys.is_empty() {
            return Ok(0);
        }
        self.store.delete_objects(bucket, &keys).map_err(api)?;
        Ok(keys.len())
    }

    fn upload_tree(&self, bucket: &str, dist_dir: &Path) -> HoistResult<usize> {
        let mut uploaded = 0;
        for entry in WalkDir::new(dist_dir).sort_by_file_name() {
            let entry = entry.map_err(|e| HoistError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let key = object_key(dist_dir, entry.path());
            let body = fs::read(entry.path())?;
            let content_type = mime_guess::from_path(entry.path())
                .first_or_octet_stream()
                .to_string();

            self.store
                .put_object(bucket, &key, body, &content_type)
                .map_err(api)?;
            uploaded += 1;
        }
        Ok(uploaded)
    }
}

/// Bucket naming shared with the site template: `<project>-site-<account>`
pub fn bucket_name(project: &str, account_id: &str) -> String {
    format!("{}-site-{}", project.to_lowercase(), account_id)
}

/// Object key relative to the dist root, always `/`-separated
fn object_key(root: &Path, file: &Path) -> String {
    file.strip_prefix(root)
        .unwrap_or(file)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn api(e: ProviderError) -> HoistError {
    HoistError::Api {
        message: e.to_string(),
    }
}
