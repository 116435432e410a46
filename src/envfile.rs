//! Persisted deployment state
//!
//! After the first deploy the distribution id and domain are written back so
//! later invocations (and the publish workflow) can find them. Locally that
//! means upserting `KEY=value` lines in an existing `.env`, preserving every
//! unrelated line; under CI it means appending to the runner's env file.

use std::fs;
use std::path::PathBuf;

use crate::error::{HoistError, HoistResult};

/// Destination for `KEY=value` state produced by the workflow
pub trait StateStore {
    fn save(&self, pairs: &[(String, String)]) -> HoistResult<()>;
}

/// Rewrites an existing `.env` file in place
pub struct DotenvStore {
    path: PathBuf,
}

impl DotenvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StateStore for DotenvStore {
    fn save(&self, pairs: &[(String, String)]) -> HoistResult<()> {
        if !self.path.exists() {
            return Err(HoistError::StateFileNotFound {
                path: self.path.clone(),
            });
        }

        let content = fs::read_to_string(&self.path)?;
        let mut lines: Vec<String> = content.lines().map(str::to_string).collect();

        for (key, value) in pairs {
            upsert(&mut lines, key, value);
        }

        // Drop trailing blank lines, keep a single final newline
        while lines.last().is_some_and(|l| l.trim().is_empty()) {
            lines.pop();
        }
        fs::write(&self.path, lines.join("\n") + "\n")?;
        Ok(())
    }
}

/// Appends to the CI environment file (GITHUB_ENV)
pub struct CiStore {
    path: PathBuf,
}

impl CiStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StateStore for CiStore {
    fn save(&self, pairs: &[(String, String)]) -> HoistResult<()> {
        let mut appended = String::new();
        for (key, value) in pairs {
            appended.push_str(&format!("{key}={value}\n"));
        }
        let mut content = fs::read_to_string(&self.path).unwrap_or_default();
        content.push_str(&appended);
        fs::write(&self.path, content)?;
        Ok(())
    }
}

/// Discards state; used when the caller only wants the console summary
pub struct NoopStore;

impl StateStore for NoopStore {
    fn save(&self, _pairs: &[(String, String)]) -> HoistResult<()> {
        Ok(())
    }
}

fn upsert(lines: &mut Vec<String>, key: &str, value: &str) {
    let prefix = format!("{key}=");
    match lines.iter().position(|line| line.starts_with(&prefix)) {
        Some(index) => lines[index] = format!("{key}={value}"),
        None => lines.push(format!("{key}={value}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_dotenv_store_replaces_and_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(
            &path,
            "AWS_REGION=eu-west-2\nCLOUDFRONT_DISTRIBUTION_ID=OLD\nDOMAIN=example.com\n",
        )
        .unwrap();

        DotenvStore::new(&path)
            .save(&pairs(&[
                ("CLOUDFRONT_DISTRIBUTION_ID", "E123"),
                ("CLOUDFRONT_DOMAIN", "d111.cloudfront.net"),
            ]))
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "AWS_REGION=eu-west-2\nCLOUDFRONT_DISTRIBUTION_ID=E123\nDOMAIN=example.com\nCLOUDFRONT_DOMAIN=d111.cloudfront.net\n"
        );
    }

    #[test]
    fn test_dotenv_store_missing_file_is_fatal() {
        let dir = tempdir().unwrap();
        let err = DotenvStore::new(dir.path().join(".env"))
            .save(&pairs(&[("CLOUDFRONT_DISTRIBUTION_ID", "E123")]))
            .unwrap_err();
        assert!(matches!(err, HoistError::StateFileNotFound { .. }));
    }

    #[test]
    fn test_dotenv_store_preserves_comments() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "# deployment settings\nAWS_STACK=site\n").unwrap();

        DotenvStore::new(&path)
            .save(&pairs(&[("CLOUDFRONT_DOMAIN", "d111.cloudfront.net")]))
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# deployment settings\n"));
        assert!(content.contains("AWS_STACK=site\n"));
    }

    #[test]
    fn test_ci_store_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("github_env");
        fs::write(&path, "EXISTING=1\n").unwrap();

        CiStore::new(&path)
            .save(&pairs(&[("CLOUDFRONT_DISTRIBUTION_ID", "E123")]))
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "EXISTING=1\nCLOUDFRONT_DISTRIBUTION_ID=E123\n");
    }
}
