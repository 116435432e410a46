//! Hoist - static-site hosting provisioner and publisher for AWS
//!
//! Hoist stands up the CloudFormation stacks behind a CloudFront-fronted
//! static site (bucket, distribution, ACM certificate, optional Route 53
//! zone) in two idempotent phases, then publishes build output into the
//! provisioned bucket.

pub mod config;
pub mod deploy;
pub mod envfile;
pub mod error;
pub mod outputs;
pub mod poll;
pub mod provider;
pub mod publish;
pub mod stack;
pub mod ui;
pub mod workflow;

// Re-exports for convenience
pub use config::{running_in_ci, ProvisionConfig, PublishConfig};
pub use deploy::Deployer;
pub use envfile::{CiStore, DotenvStore, NoopStore, StateStore};
pub use error::{HoistError, HoistResult};
pub use outputs::extract_outputs;
pub use poll::{poll_until, PollError, PollStatus, Sleeper, ThreadSleeper};
pub use provider::aws::{AwsCloud, CERTIFICATE_REGION};
pub use publish::{PublishReport, PublishWorkflow};
pub use stack::{DeployOutcome, SiteDetails, StackDefinition, StackOutputs};
pub use workflow::{
    EventSink, Phase, ProvisionReport, ProvisionWorkflow, TemplateSet, WorkflowEvent,
};
