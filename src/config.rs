//! Environment-backed configuration
//!
//! Configuration comes from environment variables (optionally seeded from a
//! `.env` file by the CLI layer). Lookups are injectable so tests never touch
//! the process environment. A missing required variable aborts before any
//! provider call is made.

use crate::error::{HoistError, HoistResult};

/// Variable names shared with the original deployment environment
pub mod vars {
    pub const REGION: &str = "AWS_REGION";
    pub const STACK: &str = "AWS_STACK";
    pub const PROJECT: &str = "AWS_PROJECT_NAME";
    pub const ENABLE_ROUTE53: &str = "AWS_ENABLE_ROUTE53";
    pub const DOMAIN: &str = "DOMAIN";
    pub const DISTRIBUTION_ID: &str = "CLOUDFRONT_DISTRIBUTION_ID";
    pub const GITHUB_ACTIONS: &str = "GITHUB_ACTIONS";
    pub const GITHUB_ENV: &str = "GITHUB_ENV";
}

/// Settings for the two-phase provision workflow
#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    pub region: String,
    pub stack_name: String,
    pub domain: String,
    pub project: Option<String>,
    pub route53: bool,
}

impl ProvisionConfig {
    pub fn from_env() -> HoistResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> HoistResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            region: require(&lookup, vars::REGION)?,
            stack_name: require(&lookup, vars::STACK)?,
            domain: require(&lookup, vars::DOMAIN)?,
            project: lookup(vars::PROJECT).filter(|v| !v.is_empty()),
            route53: lookup(vars::ENABLE_ROUTE53)
                .map(|v| v == "true")
                .unwrap_or(false),
        })
    }

    /// Name of the dependent certificate stack
    pub fn certificate_stack_name(&self) -> String {
        format!("{}-ACM-Cert", self.stack_name)
    }
}

/// Settings for the publish workflow
#[derive(Debug, Clone)]
pub struct PublishConfig {
    pub region: String,
    pub project: String,
    pub distribution_id: String,
}

impl PublishConfig {
    pub fn from_env() -> HoistResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> HoistResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            region: require(&lookup, vars::REGION)?,
            project: require(&lookup, vars::PROJECT)?,
            distribution_id: require(&lookup, vars::DISTRIBUTION_ID)?,
        })
    }
}

/// True when running under GitHub Actions; selects the CI state store
pub fn running_in_ci() -> bool {
    std::env::var(vars::GITHUB_ACTIONS).is_ok_and(|v| !v.is_empty())
}

fn require<F>(lookup: &F, name: &str) -> HoistResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| HoistError::ConfigMissing {
            name: name.to_string(),
        })
}
