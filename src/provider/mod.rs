//! Provider ports
//!
//! Trait seams between the workflows and the cloud provider. The AWS adapter
//! lives in [`aws`]; tests supply mock implementations.

pub mod aws;

use std::collections::BTreeMap;

use crate::stack::StackDefinition;

/// Error classification supplied by the provider adapter.
///
/// `StackAlreadyExists` and `NoChangesToApply` are the two benign conditions
/// the deployer recovers from; everything else is opaque and fatal. The
/// classification happens once, inside the adapter, so callers never match on
/// provider message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Create refused because a stack with that name exists
    StackAlreadyExists,
    /// Update refused because the submitted definition changes nothing
    NoChangesToApply,
    /// Any other provider failure
    Api(String),
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderError::StackAlreadyExists => write!(f, "stack already exists"),
            ProviderError::NoChangesToApply => write!(f, "no updates are to be performed"),
            ProviderError::Api(message) => write!(f, "{message}"),
        }
    }
}

/// Where a stack is in its lifecycle, reduced to what the deployer needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackState {
    /// An operation is still running
    InProgress,
    /// Terminal success (create or update complete)
    Settled,
    /// Terminal failure or rollback; carries the provider's status name
    Failed(String),
}

/// Stack lifecycle operations against one region
pub trait StackProvider {
    fn create_stack(&self, definition: &StackDefinition) -> Result<(), ProviderError>;

    fn update_stack(&self, definition: &StackDefinition) -> Result<(), ProviderError>;

    fn stack_state(&self, name: &str) -> Result<StackState, ProviderError>;

    fn stack_outputs(&self, name: &str) -> Result<BTreeMap<String, String>, ProviderError>;
}

/// Certificate status as the workflow distinguishes it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateStatus {
    PendingValidation,
    Issued,
    /// Any other provider status (FAILED, EXPIRED, ...); terminal for us
    Other(String),
}

/// DNS record the certificate authority requires for domain validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRecord {
    pub record_type: String,
    pub name: String,
    pub value: String,
}

/// Observed state of a certificate
#[derive(Debug, Clone)]
pub struct CertificateView {
    pub arn: String,
    pub status: CertificateStatus,
    pub validation_records: Vec<ValidationRecord>,
}

/// Certificate-manager operations (always us-east-1 for CloudFront)
pub trait CertificateProvider {
    /// Locate a certificate covering `domain`, pending or issued
    fn find_by_domain(&self, domain: &str) -> Result<Option<String>, ProviderError>;

    fn describe(&self, arn: &str) -> Result<CertificateView, ProviderError>;
}

/// Object storage holding the published site
pub trait ObjectStore {
    fn list_keys(&self, bucket: &str) -> Result<Vec<String>, ProviderError>;

    fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<(), ProviderError>;

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ProviderError>;
}

/// CDN cache in front of the bucket
pub trait EdgeCache {
    fn invalidate_all(&self, distribution_id: &str) -> Result<(), ProviderError>;
}

/// Identity of the deploying account (bucket names embed the account id)
pub trait IdentityProvider {
    fn account_id(&self) -> Result<String, ProviderError>;
}
