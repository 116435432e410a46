//! Two-phase provision workflow
//!
//! CloudFront needs a validated certificate ARN, but the certificate cannot be
//! requested until the first deploy has produced the site's domain wiring - a
//! circular dependency broken by deploying the site stack twice:
//!
//! 1. `init`: deploy the site stack, persist its outputs, request the
//!    certificate, and (without Route 53) surface the DNS records the operator
//!    must configure manually.
//! 2. `finalise`: wait for the certificate to be issued, then re-deploy the
//!    site stack with the certificate ARN injected.
//!
//! One parameterized workflow selects the phase via [`Phase`]; both phases are
//! safe to re-run thanks to the deployer's create/update fallback.

use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::config::ProvisionConfig;
use crate::deploy::Deployer;
use crate::envfile::StateStore;
use crate::error::{HoistError, HoistResult};
use crate::outputs::extract_outputs;
use crate::poll::{poll_until, PollError, PollStatus, Sleeper};
use crate::provider::{CertificateProvider, CertificateStatus, StackProvider};
use crate::stack::{keys, params, DeployOutcome, SiteDetails, StackDefinition};


/// Interval between certificate polls
const CERT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Half an hour of one-a-minute attempts; if the certificate has not settled
/// by then we likely have a problem
const CERT_POLL_ATTEMPTS: u32 = 30;

/// Outputs the provision workflow refuses to continue without
const REQUIRED_SITE_OUTPUTS: &[&str] = &[keys::DISTRIBUTION_ID, keys::DISTRIBUTION_DOMAIN];

/// Which half of the two-phase apply to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Init,
    Finalise,
}

impl FromStr for Phase {
    type Err = HoistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "init" => Ok(Phase::Init),
            "finalise" => Ok(Phase::Finalise),
            other => Err(HoistError::InvalidPhase {
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Init => write!(f, "init"),
            Phase::Finalise => write!(f, "finalise"),
        }
    }
}

/// CloudFormation template bodies, loaded by the CLI layer
#[derive(Debug, Clone)]
pub struct TemplateSet {
    pub site: String,
    pub certificate: String,
}

/// A DNS record the operator must configure with their DNS provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DnsRecord {
    pub record_type: String,
    pub name: String,
    pub value: String,
}

/// Everything a phase produced, returned to the caller instead of being
/// accumulated in shared state
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionReport {
    pub phase: Phase,
    pub outcomes: Vec<(String, DeployOutcome)>,
    pub details: Option<SiteDetails>,
    pub certificate_arn: Option<String>,
    pub dns_records: Vec<DnsRecord>,
}

impl ProvisionReport {
    fn new(phase: Phase) -> Self {
        Self {
            phase,
            outcomes: Vec::new(),
            details: None,
            certificate_arn: None,
            dns_records: Vec::new(),
        }
    }
}

/// Progress events emitted while the workflow runs
#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    PhaseStarted { phase: Phase },
    StackDeploying { name: String },
    StackDeployed { name: String, outcome: DeployOutcome },
    StateSaved { keys: Vec<String> },
    PollAttempt { what: String, attempt: u32 },
    CertificateLocated { arn: String },
    CertificateIssued { arn: String },
    DnsRecordsPlanned { count: usize },
}

/// Receives [`WorkflowEvent`]s; console and NDJSON sinks live in the ui module
pub trait EventSink {
    fn on_event(&self, event: WorkflowEvent);
}

/// Sink that drops all events
pub struct NoopSink;

impl EventSink for NoopSink {
    fn on_event(&self, _event: WorkflowEvent) {}
}

/// The two-phase apply orchestrator, parameterized by its ports
pub struct ProvisionWorkflow<'a> {
    config: &'a ProvisionConfig,
    templates: &'a TemplateSet,
    /// Stack operations in the site's region
    site_stacks: &'a dyn StackProvider,
    /// Stack operations in us-east-1, where CloudFront certificates must live
    cert_stacks: &'a dyn StackProvider,
    certificates: &'a dyn CertificateProvider,
    state: &'a dyn StateStore,
    sleeper: &'a dyn Sleeper,
    events: &'a dyn EventSink,
}

impl<'a> ProvisionWorkflow<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &'a ProvisionConfig,
        templates: &'a TemplateSet,
        site_stacks: &'a dyn StackProvider,
        cert_stacks: &'a dyn StackProvider,
        certificates: &'a dyn CertificateProvider,
        state: &'a dyn StateStore,
        sleeper: &'a dyn Sleeper,
        events: &'a dyn EventSink,
    ) -> Self {
        Self {
            config,
            templates,
            site_stacks,
            cert_stacks,
            certificates,
            state,
            sleeper,
            events,
        }
    }

    pub fn run(&self, phase: Phase) -> HoistResult<ProvisionReport> {
        self.events.on_event(WorkflowEvent::PhaseStarted { phase });
        match phase {
            Phase::Init => self.run_init(),
            Phase::Finalise => self.run_finalise(),
        }
    }

    fn run_init(&self) -> HoistResult<ProvisionReport> {
        let mut report = ProvisionReport::new(Phase::Init);

        // Phase one deploy of the site stack
        let definition = self.site_definition();
        let outcome = self.deploy(self.site_stacks, &definition, true)?;
        report.outcomes.push((definition.name.clone(), outcome));

        let outputs = extract_outputs(
            self.site_stacks,
            &self.config.stack_name,
            REQUIRED_SITE_OUTPUTS,
        )?;
        let details = SiteDetails::from_outputs(&outputs)?;

        let saved = vec![
            (
                "CLOUDFRONT_DISTRIBUTION_ID".to_string(),
                details.distribution_id.clone(),
            ),
            (
                "CLOUDFRONT_DOMAIN".to_string(),
                details.distribution_domain.clone(),
            ),
        ];
        self.state.save(&saved)?;
        self.events.on_event(WorkflowEvent::StateSaved {
            keys: saved.into_iter().map(|(k, _)| k).collect(),
        });

        // Request the certificate; issuance is asynchronous so we never wait
        // on this stack here
        let cert_definition = self.certificate_definition(&details)?;
        let cert_outcome = self.deploy(self.cert_stacks, &cert_definition, false)?;
        report
            .outcomes
            .push((cert_definition.name.clone(), cert_outcome));

        if self.config.route53 {
            // DNS validation is automatic; the operator only needs the zone's
            // name servers at their registrar
            report.dns_records = ns_records(&self.config.domain, &details);
        } else {
            let arn = self.locate_certificate_by_domain()?;
            self.events.on_event(WorkflowEvent::CertificateLocated { arn: arn.clone() });

            let view = self
                .certificates
                .describe(&arn)
                .map_err(|e| HoistError::Api {
                    message: format!("describing certificate: {e}"),
                })?;
            report.dns_records = validation_records(&self.config.domain, &details, &view);
            report.certificate_arn = Some(arn);
        }

        self.events.on_event(WorkflowEvent::DnsRecordsPlanned {
            count: report.dns_records.len(),
        });
        report.details = Some(details);
        Ok(report)
    }

    fn run_finalise(&self) -> HoistResult<ProvisionReport> {
        let mut report = ProvisionReport::new(Phase::Finalise);

        let arn = self.locate_certificate_by_stack()?;
        self.events.on_event(WorkflowEvent::CertificateLocated { arn: arn.clone() });

        self.await_certificate_issued(&arn)?;
        self.events.on_event(WorkflowEvent::CertificateIssued { arn: arn.clone() });

        // Phase two deploy: same definition plus the certificate ARN
        let definition = self
            .site_definition()
            .with_parameter(params::ACM_CERTIFICATE_ARN, &arn);
        let outcome = self.deploy(self.site_stacks, &definition, true)?;
        report.outcomes.push((definition.name.clone(), outcome));

        report.certificate_arn = Some(arn);
        Ok(report)
    }

    fn deploy(
        &self,
        provider: &dyn StackProvider,
        definition: &StackDefinition,
        await_completion: bool,
    ) -> HoistResult<DeployOutcome> {
        self.events.on_event(WorkflowEvent::StackDeploying {
            name: definition.name.clone(),
        });
        let outcome = Deployer::new(provider, self.sleeper).deploy(definition, await_completion)?;
        self.events.on_event(WorkflowEvent::StackDeployed {
            name: definition.name.clone(),
            outcome,
        });
        Ok(outcome)
    }

    fn site_definition(&self) -> StackDefinition {
        let mut definition =
            StackDefinition::new(&self.config.stack_name, &self.templates.site)
                .with_parameter(params::DOMAIN, &self.config.domain);
        if let Some(project) = &self.config.project {
            definition = definition
                .with_parameter(params::PROJECT_NAME, project)
                .with_parameter(params::BUCKET_NAME, project.to_lowercase());
        }
        definition.with_parameter(
            params::ENABLE_ROUTE53,
            if self.config.route53 { "true" } else { "false" },
        )
    }

    fn certificate_definition(&self, details: &SiteDetails) -> HoistResult<StackDefinition> {
        let mut definition =
            StackDefinition::new(self.config.certificate_stack_name(), &self.templates.certificate)
                .with_parameter(params::DOMAIN, &self.config.domain);

        if self.config.route53 {
            // Automatic DNS validation needs the zone the site stack created
            let zone =
                details
                    .hosted_zone
                    .as_deref()
                    .ok_or_else(|| HoistError::MissingOutput {
                        stack: self.config.stack_name.clone(),
                        key: keys::HOSTED_ZONE_ID.to_string(),
                    })?;
            definition = definition
                .with_parameter(params::ENABLE_ROUTE53, "true")
                .with_parameter(params::HOSTED_ZONE_ID, zone);
        }
        Ok(definition)
    }

    /// Poll the certificate manager until a certificate for our domain shows up
    fn locate_certificate_by_domain(&self) -> HoistResult<String> {
        let what = "certificate ARN by domain";
        self.poll(what, |workflow, attempt| {
            match workflow.certificates.find_by_domain(&workflow.config.domain) {
                Ok(Some(arn)) => PollStatus::Ready(arn),
                Ok(None) => {
                    workflow.events.on_event(WorkflowEvent::PollAttempt {
                        what: what.to_string(),
                        attempt,
                    });
                    PollStatus::Pending
                }
                Err(e) => PollStatus::Failed(e.to_string()),
            }
        })
    }

    /// Poll the certificate stack until its ARN output appears
    fn locate_certificate_by_stack(&self) -> HoistResult<String> {
        let stack = self.config.certificate_stack_name();
        let what = "certificate ARN by stack";
        self.poll(what, |workflow, attempt| {
            match workflow.cert_stacks.stack_outputs(&stack) {
                Ok(outputs) => match outputs.get(keys::CERTIFICATE_ARN) {
                    Some(arn) => PollStatus::Ready(arn.clone()),
                    None => {
                        workflow.events.on_event(WorkflowEvent::PollAttempt {
                            what: what.to_string(),
                            attempt,
                        });
                        PollStatus::Pending
                    }
                },
                Err(e) => PollStatus::Failed(e.to_string()),
            }
        })
    }

    /// Poll the certificate's validation status until it is issued
    fn await_certificate_issued(&self, arn: &str) -> HoistResult<()> {
        let what = "certificate validation";
        self.poll(what, |workflow, attempt| {
            match workflow.certificates.describe(arn) {
                Ok(view) => match view.status {
                    CertificateStatus::Issued => PollStatus::Ready(()),
                    CertificateStatus::PendingValidation => {
                        workflow.events.on_event(WorkflowEvent::PollAttempt {
                            what: what.to_string(),
                            attempt,
                        });
                        PollStatus::Pending
                    }
                    CertificateStatus::Other(status) => {
                        PollStatus::Failed(format!("certificate failed with status {status}"))
                    }
                },
                Err(e) => PollStatus::Failed(e.to_string()),
            }
        })
    }

    fn poll<T, F>(&self, what: &str, mut check: F) -> HoistResult<T>
    where
        F: FnMut(&Self, u32) -> PollStatus<T>,
    {
        poll_until(
            |attempt| check(self, attempt),
            CERT_POLL_INTERVAL,
            CERT_POLL_ATTEMPTS,
            self.sleeper,
        )
        .map_err(|e| match e {
            PollError::TimedOut { attempts } => HoistError::PollTimeout {
                what: what.to_string(),
                attempts,
            },
            PollError::Failed { reason } => HoistError::PollFailed {
                what: what.to_string(),
                reason,
            },
        })
    }
}

/// First label of the domain, the way DNS providers expect record names
fn host_label(domain: &str) -> String {
    match domain.find('.') {
        Some(index) => domain[..index].to_string(),
        None => domain.to_string(),
    }
}

/// NS rows the operator configures at their registrar (Route 53 case)
fn ns_records(domain: &str, details: &SiteDetails) -> Vec<DnsRecord> {
    details
        .ns_records
        .iter()
        .map(|ns| DnsRecord {
            record_type: "NS".to_string(),
            name: host_label(domain),
            value: ns.clone(),
        })
        .collect()
}

/// Alias + validation rows for manual DNS setups
fn validation_records(
    domain: &str,
    details: &SiteDetails,
    view: &crate::provider::CertificateView,
) -> Vec<DnsRecord> {
    let mut records = Vec::new();
    if let Some(validation) = view.validation_records.first() {
        // Point the site at the distribution, and prove domain ownership
        records.push(DnsRecord {
            record_type: validation.record_type.clone(),
            name: host_label(domain),
            value: details.distribution_domain.clone(),
        });
        records.push(DnsRecord {
            record_type: validation.record_type.clone(),
            name: validation.name.clone(),
            value: validation.value.clone(),
        });
    }
    records
}
