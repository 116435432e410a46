//! AWS adapter
//!
//! Implements every provider port against the AWS SDK. The workflows are
//! plain blocking code, so the SDK's futures are driven on a private
//! current-thread runtime owned by the adapter.
//!
//! Error classification lives here and nowhere else: the structured
//! `AlreadyExistsException` becomes `StackAlreadyExists`, and CloudFormation's
//! "No updates are to be performed" - which the API only reports as a generic
//! validation error message - becomes `NoChangesToApply`.

use std::collections::BTreeMap;

use aws_config::{BehaviorVersion, Region};
use aws_sdk_cloudformation::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_cloudformation::types::{Capability, Parameter};
use tokio::runtime::Runtime;

use crate::error::HoistResult;
use crate::provider::{
    CertificateProvider, CertificateStatus, CertificateView, EdgeCache, IdentityProvider,
    ObjectStore, ProviderError, StackProvider, StackState, ValidationRecord,
};
use crate::stack::StackDefinition;

/// Certificates used by CloudFront must live in this region
pub const CERTIFICATE_REGION: &str = "us-east-1";

const NO_UPDATES_MESSAGE: &str = "No updates are to be performed";

/// All AWS clients for one region, behind a blocking facade
pub struct AwsCloud {
    runtime: Runtime,
    cloudformation: aws_sdk_cloudformation::Client,
    acm: aws_sdk_acm::Client,
    s3: aws_sdk_s3::Client,
    cloudfront: aws_sdk_cloudfront::Client,
    sts: aws_sdk_sts::Client,
}

impl AwsCloud {
    pub fn new(region: &str) -> HoistResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let config = runtime.block_on(
            aws_config::defaults(BehaviorVersion::latest())
                .region(Region::new(region.to_string()))
                .load(),
        );

        Ok(Self {
            cloudformation: aws_sdk_cloudformation::Client::new(&config),
            acm: aws_sdk_acm::Client::new(&config),
            s3: aws_sdk_s3::Client::new(&config),
            cloudfront: aws_sdk_cloudfront::Client::new(&config),
            sts: aws_sdk_sts::Client::new(&config),
            runtime,
        })
    }

    fn parameters(definition: &StackDefinition) -> Vec<Parameter> {
        definition
            .parameters
            .iter()
            .map(|(key, value)| {
                Parameter::builder()
                    .parameter_key(key)
                    .parameter_value(value)
                    .build()
            })
            .collect()
    }

    fn capabilities(definition: &StackDefinition) -> Vec<Capability> {
        definition
            .capabilities
            .iter()
            .map(|c| Capability::from(c.as_str()))
            .collect()
    }
}

fn api_error(error: impl std::error::Error + 'static) -> ProviderError {
    ProviderError::Api(format!("{}", DisplayErrorContext(&error)))
}

/// Reduce a CloudFormation stack status to what the deployer distinguishes
pub(crate) fn classify_stack_status(status: &str) -> StackState {
    match status {
        "CREATE_COMPLETE" | "UPDATE_COMPLETE" => StackState::Settled,
        s if s.ends_with("_IN_PROGRESS") => StackState::InProgress,
        s => StackState::Failed(s.to_string()),
    }
}

/// Reduce an ACM certificate status to what the poller distinguishes
pub(crate) fn classify_certificate_status(status: &str) -> CertificateStatus {
    match status {
        "PENDING_VALIDATION" => CertificateStatus::PendingValidation,
        "ISSUED" => CertificateStatus::Issued,
        s => CertificateStatus::Other(s.to_string()),
    }
}

impl StackProvider for AwsCloud {
    fn create_stack(&self, definition: &StackDefinition) -> Result<(), ProviderError> {
        let result = self.runtime.block_on(
            self.cloudformation
                .create_stack()
                .stack_name(&definition.name)
                .template_body(&definition.template_body)
                .set_capabilities(Some(Self::capabilities(definition)))
                .set_parameters(Some(Self::parameters(definition)))
                .send(),
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_already_exists_exception() {
                    Err(ProviderError::StackAlreadyExists)
                } else {
                    Err(api_error(service_error))
                }
            }
        }
    }

    fn update_stack(&self, definition: &StackDefinition) -> Result<(), ProviderError> {
        let result = self.runtime.block_on(
            self.cloudformation
                .update_stack()
                .stack_name(&definition.name)
                .template_body(&definition.template_body)
                .set_capabilities(Some(Self::capabilities(definition)))
                .set_parameters(Some(Self::parameters(definition)))
                .send(),
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let service_error = e.into_service_error();
                // The API reports a no-op update only through this message;
                // there is no structured error code for it
                if service_error
                    .message()
                    .is_some_and(|m| m.contains(NO_UPDATES_MESSAGE))
                {
                    Err(ProviderError::NoChangesToApply)
                } else {
                    Err(api_error(service_error))
                }
            }
        }
    }

    fn stack_state(&self, name: &str) -> Result<StackState, ProviderError> {
        let response = self
            .runtime
            .block_on(self.cloudformation.describe_stacks().stack_name(name).send())
            .map_err(api_error)?;

        let stack = response
            .stacks()
            .first()
            .ok_or_else(|| ProviderError::Api(format!("stack '{name}' not found")))?;

        match stack.stack_status() {
            Some(status) => Ok(classify_stack_status(status.as_str())),
            None => Err(ProviderError::Api(format!(
                "stack '{name}' reported no status"
            ))),
        }
    }

    fn stack_outputs(&self, name: &str) -> Result<BTreeMap<String, String>, ProviderError> {
        let response = self
            .runtime
            .block_on(self.cloudformation.describe_stacks().stack_name(name).send())
            .map_err(api_error)?;

        let stack = response
            .stacks()
            .first()
            .ok_or_else(|| ProviderError::Api(format!("stack '{name}' not found")))?;

        let mut outputs = BTreeMap::new();
        for output in stack.outputs() {
            if let (Some(key), Some(value)) = (output.output_key(), output.output_value()) {
                outputs.insert(key.to_string(), value.to_string());
            }
        }
        Ok(outputs)
    }
}

impl CertificateProvider for AwsCloud {
    fn find_by_domain(&self, domain: &str) -> Result<Option<String>, ProviderError> {
        use aws_sdk_acm::types::CertificateStatus as AcmStatus;

        let response = self
            .runtime
            .block_on(
                self.acm
                    .list_certificates()
                    .certificate_statuses(AcmStatus::PendingValidation)
                    .certificate_statuses(AcmStatus::Issued)
                    .send(),
            )
            .map_err(api_error)?;

        let arn = response
            .certificate_summary_list()
            .iter()
            .find(|summary| summary.domain_name() == Some(domain))
            .and_then(|summary| summary.certificate_arn())
            .map(str::to_string);
        Ok(arn)
    }

    fn describe(&self, arn: &str) -> Result<CertificateView, ProviderError> {
        let response = self
            .runtime
            .block_on(self.acm.describe_certificate().certificate_arn(arn).send())
            .map_err(api_error)?;

        let certificate = response
            .certificate()
            .ok_or_else(|| ProviderError::Api(format!("certificate '{arn}' not found")))?;

        let status = certificate
            .status()
            .map(|s| classify_certificate_status(s.as_str()))
            .unwrap_or_else(|| CertificateStatus::Other("UNKNOWN".to_string()));

        let validation_records = certificate
            .domain_validation_options()
            .iter()
            .filter_map(|option| {
                option.resource_record().map(|record| ValidationRecord {
                    record_type: record.r#type().as_str().to_string(),
                    name: record.name().to_string(),
                    value: record.value().to_string(),
                })
            })
            .collect();

        Ok(CertificateView {
            arn: arn.to_string(),
            status,
            validation_records,
        })
    }
}

impl ObjectStore for AwsCloud {
    fn list_keys(&self, bucket: &str) -> Result<Vec<String>, ProviderError> {
        let response = self
            .runtime
            .block_on(self.s3.list_objects_v2().bucket(bucket).send())
            .map_err(api_error)?;

        Ok(response
            .contents()
            .iter()
            .filter_map(|object| object.key())
            .map(str::to_string)
            .collect())
    }

    fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<(), ProviderError> {
        use aws_sdk_s3::types::{Delete, ObjectIdentifier};

        let identifiers = keys
            .iter()
            .map(|key| {
                ObjectIdentifier::builder()
                    .key(key)
                    .build()
                    .map_err(|e| ProviderError::Api(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let delete = Delete::builder()
            .set_objects(Some(identifiers))
            .build()
            .map_err(|e| ProviderError::Api(e.to_string()))?;

        self.runtime
            .block_on(
                self.s3
                    .delete_objects()
                    .bucket(bucket)
                    .delete(delete)
                    .send(),
            )
            .map_err(api_error)?;
        Ok(())
    }

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ProviderError> {
        use aws_sdk_s3::primitives::ByteStream;

        self.runtime
            .block_on(
                self.s3
                    .put_object()
                    .bucket(bucket)
                    .key(key)
                    .body(ByteStream::from(body))
                    .content_type(content_type)
                    .send(),
            )
            .map_err(api_error)?;
        Ok(())
    }
}

impl EdgeCache for AwsCloud {
    fn invalidate_all(&self, distribution_id: &str) -> Result<(), ProviderError> {
        use aws_sdk_cloudfront::types::{InvalidationBatch, Paths};

        let paths = Paths::builder()
            .quantity(1)
            .items("/*")
            .build()
            .map_err(|e| ProviderError::Api(e.to_string()))?;
        let batch = InvalidationBatch::builder()
            .caller_reference(chrono::Utc::now().timestamp_millis().to_string())
            .paths(paths)
            .build()
            .map_err(|e| ProviderError::Api(e.to_string()))?;

        self.runtime
            .block_on(
                self.cloudfront
                    .create_invalidation()
                    .distribution_id(distribution_id)
                    .invalidation_batch(batch)
                    .send(),
            )
            .map_err(api_error)?;
        Ok(())
    }
}

impl IdentityProvider for AwsCloud {
    fn account_id(&self) -> Result<String, ProviderError> {
        let response = self
            .runtime
            .block_on(self.sts.get_caller_identity().send())
            .map_err(api_error)?;

        response
            .account()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Api("caller identity has no account id".to_string()))
    }
}
