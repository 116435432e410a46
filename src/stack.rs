//! Stack model types
//!
//! A [`StackDefinition`] is the declarative input to the deployer. It is
//! immutable once submitted; the finalise phase derives a new definition with
//! [`StackDefinition::with_parameter`] instead of mutating the original.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{HoistError, HoistResult};

/// Well-known output keys of the site stack
pub mod keys {
    pub const DISTRIBUTION_ID: &str = "CloudFrontDistributionId";
    pub const DISTRIBUTION_DOMAIN: &str = "CloudFrontDomainName";
    pub const NS_RECORDS: &str = "Route53NSRecords";
    pub const HOSTED_ZONE_ID: &str = "Route53HostedZoneID";
    pub const CERTIFICATE_ARN: &str = "CertificateArn";
}

/// Template parameter names understood by the bundled templates
pub mod params {
    pub const DOMAIN: &str = "Domain";
    pub const PROJECT_NAME: &str = "ProjectName";
    pub const BUCKET_NAME: &str = "BucketName";
    pub const ENABLE_ROUTE53: &str = "EnableRoute53";
    pub const HOSTED_ZONE_ID: &str = "HostedZoneId";
    pub const ACM_CERTIFICATE_ARN: &str = "AcmCertificateArn";
}

/// Declarative description of a CloudFormation stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackDefinition {
    pub name: String,
    pub template_body: String,
    pub capabilities: Vec<String>,
    pub parameters: BTreeMap<String, String>,
}

impl StackDefinition {
    pub fn new(name: impl Into<String>, template_body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template_body: template_body.into(),
            capabilities: vec!["CAPABILITY_NAMED_IAM".to_string()],
            parameters: BTreeMap::new(),
        }
    }

    /// Derive a copy with one parameter added or overridden
    pub fn with_parameter(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut derived = self.clone();
        derived.parameters.insert(key.into(), value.into());
        derived
    }
}

/// Read-only view of a deployed stack's outputs
#[derive(Debug, Clone, Default)]
pub struct StackOutputs {
    stack: String,
    values: BTreeMap<String, String>,
}

impl StackOutputs {
    pub fn new(stack: impl Into<String>, values: BTreeMap<String, String>) -> Self {
        Self {
            stack: stack.into(),
            values,
        }
    }

    pub fn stack(&self) -> &str {
        &self.stack
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Fetch a mandatory output, failing with the absent key's name
    pub fn require(&self, key: &str) -> HoistResult<&str> {
        self.get(key).ok_or_else(|| HoistError::MissingOutput {
            stack: self.stack.clone(),
            key: key.to_string(),
        })
    }
}

/// Outcome of an idempotent stack deploy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployOutcome {
    /// Stack did not exist and was created
    Created,
    /// Stack existed and an update was submitted
    Updated,
    /// Stack existed and the provider reported nothing to change
    NoopNoUpdates,
}

impl DeployOutcome {
    pub fn is_noop(self) -> bool {
        matches!(self, DeployOutcome::NoopNoUpdates)
    }
}

/// The site-stack outputs the rest of the workflow needs
#[derive(Debug, Clone, Serialize)]
pub struct SiteDetails {
    pub distribution_id: String,
    pub distribution_domain: String,
    /// Name servers of the hosted zone, when Route 53 is enabled
    pub ns_records: Vec<String>,
    pub hosted_zone: Option<String>,
}

impl SiteDetails {
    /// Build from stack outputs; the distribution id and domain are mandatory,
    /// the Route 53 outputs only exist when the zone was provisioned.
    pub fn from_outputs(outputs: &StackOutputs) -> HoistResult<Self> {
        let distribution_id = outputs.require(keys::DISTRIBUTION_ID)?.to_string();
        let distribution_domain = outputs.require(keys::DISTRIBUTION_DOMAIN)?.to_string();

        let ns_records = outputs
            .get(keys::NS_RECORDS)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            distribution_id,
            distribution_domain,
            ns_records,
            hosted_zone: outputs.get(keys::HOSTED_ZONE_ID).map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outputs(pairs: &[(&str, &str)]) -> StackOutputs {
        let values = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        StackOutputs::new("site", values)
    }

    #[test]
    fn test_with_parameter_does_not_mutate_original() {
        let base = StackDefinition::new("site", "Resources: {}");
        let derived = base.with_parameter(params::ACM_CERTIFICATE_ARN, "arn:aws:acm:123");

        assert!(base.parameters.is_empty());
        assert_eq!(
            derived.parameters.get(params::ACM_CERTIFICATE_ARN),
            Some(&"arn:aws:acm:123".to_string())
        );
        assert_eq!(derived.name, "site");
    }

    #[test]
    fn test_with_parameter_overrides_existing() {
        let base = StackDefinition::new("site", "{}").with_parameter("Domain", "old.example.com");
        let derived = base.with_parameter("Domain", "example.com");
        assert_eq!(derived.parameters.get("Domain"), Some(&"example.com".to_string()));
    }

    #[test]
    fn test_require_names_missing_key() {
        let out = outputs(&[(keys::DISTRIBUTION_ID, "E123")]);
        let err = out.require(keys::DISTRIBUTION_DOMAIN).unwrap_err();
        match err {
            HoistError::MissingOutput { stack, key } => {
                assert_eq!(stack, "site");
                assert_eq!(key, keys::DISTRIBUTION_DOMAIN);
            }
            other => panic!("expected MissingOutput, got {other:?}"),
        }
    }

    #[test]
    fn test_site_details_requires_distribution() {
        let out = outputs(&[(keys::DISTRIBUTION_DOMAIN, "d111.cloudfront.net")]);
        assert!(SiteDetails::from_outputs(&out).is_err());
    }

    #[test]
    fn test_site_details_parses_ns_records() {
        let out = outputs(&[
            (keys::DISTRIBUTION_ID, "E123"),
            (keys::DISTRIBUTION_DOMAIN, "d111.cloudfront.net"),
            (keys::NS_RECORDS, "ns-1.awsdns.com, ns-2.awsdns.org ,"),
            (keys::HOSTED_ZONE_ID, "Z0LDQWERTY"),
        ]);
        let details = SiteDetails::from_outputs(&out).unwrap();
        assert_eq!(details.distribution_id, "E123");
        assert_eq!(details.ns_records, vec!["ns-1.awsdns.com", "ns-2.awsdns.org"]);
        assert_eq!(details.hosted_zone.as_deref(), Some("Z0LDQWERTY"));
    }

    #[test]
    fn test_site_details_without_route53_outputs() {
        let out = outputs(&[
            (keys::DISTRIBUTION_ID, "E123"),
            (keys::DISTRIBUTION_DOMAIN, "d111.cloudfront.net"),
        ]);
        let details = SiteDetails::from_outputs(&out).unwrap();
        assert!(details.ns_records.is_empty());
        assert!(details.hosted_zone.is_none());
    }
}
