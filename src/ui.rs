//! Console output
//!
//! Icon-prefixed lines for humans, NDJSON event lines for CI. ANSI styling is
//! dropped when stdout is not a terminal.

use is_terminal::IsTerminal;

use crate::stack::DeployOutcome;
use crate::workflow::{DnsRecord, EventSink, ProvisionReport, WorkflowEvent};

fn styled(code: &str, text: &str) -> String {
    if std::io::stdout().is_terminal() {
        format!("\x1b[{code}m{text}\x1b[0m")
    } else {
        text.to_string()
    }
}

pub fn heading(msg: &str) {
    println!("{}", styled("1", msg));
}

pub fn info(msg: &str) {
    println!("{} {}", styled("1;34", "\u{2139}"), msg);
}

pub fn log(msg: &str) {
    println!("{msg}");
}

pub fn success(msg: &str) {
    println!("{} {}", styled("1;32", "\u{2713}"), msg);
}

pub fn failure(msg: &str) {
    eprintln!("{} {}", styled("1;31", "\u{2718}"), msg);
}

/// Styled progress lines for interactive runs
pub struct ConsoleSink;

impl EventSink for ConsoleSink {
    fn on_event(&self, event: WorkflowEvent) {
        match event {
            WorkflowEvent::PhaseStarted { phase } => {
                heading(&format!("Provisioning phase: {phase}"));
            }
            WorkflowEvent::StackDeploying { name } => {
                log(&format!("Deploying stack '{name}'..."));
            }
            WorkflowEvent::StackDeployed { name, outcome } => match outcome {
                DeployOutcome::Created => success(&format!("Stack '{name}' created")),
                DeployOutcome::Updated => success(&format!("Stack '{name}' updated")),
                DeployOutcome::NoopNoUpdates => {
                    log(&format!("Stack '{name}': no updates were required"));
                }
            },
            WorkflowEvent::StateSaved { keys } => {
                success(&format!("Saved {} to deployment state", keys.join(", ")));
            }
            WorkflowEvent::PollAttempt { what, attempt } => {
                log(&format!("Waiting for {what}... (attempt {attempt})"));
            }
            WorkflowEvent::CertificateLocated { arn } => {
                info(&format!("Certificate: {arn}"));
            }
            WorkflowEvent::CertificateIssued { .. } => {
                success("Certificate issued");
            }
            WorkflowEvent::DnsRecordsPlanned { count } => {
                if count > 0 {
                    info(&format!("{count} DNS record(s) need manual configuration"));
                }
            }
        }
    }
}

/// One JSON object per line, for CI consumption
pub struct JsonSink;

impl EventSink for JsonSink {
    fn on_event(&self, event: WorkflowEvent) {
        let line = match event {
            WorkflowEvent::PhaseStarted { phase } => {
                serde_json::json!({"event": "phase_started", "phase": phase})
            }
            WorkflowEvent::StackDeploying { name } => {
                serde_json::json!({"event": "stack_deploying", "name": name})
            }
            WorkflowEvent::StackDeployed { name, outcome } => {
                serde_json::json!({"event": "stack_deployed", "name": name, "outcome": outcome})
            }
            WorkflowEvent::StateSaved { keys } => {
                serde_json::json!({"event": "state_saved", "keys": keys})
            }
            WorkflowEvent::PollAttempt { what, attempt } => {
                serde_json::json!({"event": "poll_attempt", "what": what, "attempt": attempt})
            }
            WorkflowEvent::CertificateLocated { arn } => {
                serde_json::json!({"event": "certificate_located", "arn": arn})
            }
            WorkflowEvent::CertificateIssued { arn } => {
                serde_json::json!({"event": "certificate_issued", "arn": arn})
            }
            WorkflowEvent::DnsRecordsPlanned { count } => {
                serde_json::json!({"event": "dns_records_planned", "count": count})
            }
        };
        println!("{line}");
    }
}

/// Human-readable summary of a provision run
pub fn print_report(report: &ProvisionReport) {
    if let Some(details) = &report.details {
        info(&format!("CloudFront Distribution ID: {}", details.distribution_id));
        info(&format!("CloudFront Domain: {}", details.distribution_domain));
        if let Some(zone) = &details.hosted_zone {
            info(&format!("Route 53 Hosted Zone ID: {zone}"));
        }
    }
    if !report.dns_records.is_empty() {
        println!();
        heading("Configure these records with your DNS provider:");
        print_dns_records(&report.dns_records);
    }
}

fn print_dns_records(records: &[DnsRecord]) {
    for (index, record) in records.iter().enumerate() {
        println!(
            "  {}. {:<6} {}  \u{2192}  {}",
            index + 1,
            record.record_type,
            record.name,
            record.value
        );
    }
}
