//! Hoist CLI - provision and publish AWS-hosted static sites
//!
//! Usage: hoist <COMMAND>
//!
//! Commands:
//!   provision  Deploy the CloudFormation stacks (two phases: init, finalise)
//!   publish    Upload build output to the site bucket and invalidate the CDN

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use hoist::config::vars;
use hoist::provider::aws::{AwsCloud, CERTIFICATE_REGION};
use hoist::ui::{self, ConsoleSink, JsonSink};
use hoist::workflow::{EventSink, Phase, ProvisionWorkflow, TemplateSet};
use hoist::{
    running_in_ci, CiStore, DotenvStore, HoistError, ProvisionConfig, PublishConfig,
    PublishWorkflow, StateStore, ThreadSleeper,
};

/// Hoist - static-site hosting provisioner and publisher for AWS
#[derive(Parser, Debug)]
#[command(name = "hoist")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Emit NDJSON events instead of styled output
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Deploy the CloudFormation stacks behind the site
    Provision {
        /// Which half of the two-phase apply to run (init | finalise)
        #[arg(long)]
        phase: String,

        /// Directory holding the CloudFormation templates
        #[arg(long, default_value = "cloudformation")]
        templates: PathBuf,

        /// Env file that receives the deployment outputs (outside CI)
        #[arg(long, default_value = ".env")]
        env_file: PathBuf,
    },

    /// Upload build output to the site bucket and invalidate the CDN
    Publish {
        /// Directory holding the built site
        #[arg(long, default_value = "dist")]
        dist: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Provision {
            phase,
            templates,
            env_file,
        } => cmd_provision(&phase, &templates, &env_file, cli.json),
        Commands::Publish { dist } => cmd_publish(&dist, cli.json),
    }
}

fn cmd_provision(phase: &str, templates_dir: &Path, env_file: &Path, json: bool) -> Result<()> {
    dotenvy::dotenv().ok();

    // Fail on configuration before any AWS client is constructed
    let config = ProvisionConfig::from_env()?;
    let phase: Phase = phase.parse::<Phase>()?;
    let templates = load_templates(templates_dir)?;

    if !json {
        ui::info(&format!(
            "Region {} / stack {} / domain {}",
            config.region, config.stack_name, config.domain
        ));
    }

    let site_cloud = AwsCloud::new(&config.region)?;
    let cert_cloud = AwsCloud::new(CERTIFICATE_REGION)?;
    let state = state_store(env_file)?;
    let sink: Box<dyn EventSink> = if json {
        Box::new(JsonSink)
    } else {
        Box::new(ConsoleSink)
    };

    let workflow = ProvisionWorkflow::new(
        &config,
        &templates,
        &site_cloud,
        &cert_cloud,
        &cert_cloud,
        state.as_ref(),
        &ThreadSleeper,
        sink.as_ref(),
    );
    let report = workflow.run(phase)?;

    if json {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        ui::print_report(&report);
        ui::success(&format!("Phase {phase} complete"));
    }
    Ok(())
}

fn cmd_publish(dist: &Path, json: bool) -> Result<()> {
    dotenvy::dotenv().ok();

    let config = PublishConfig::from_env()?;
    let cloud = AwsCloud::new(&config.region)?;

    let report = PublishWorkflow::new(&config, &cloud, &cloud, &cloud).run(dist)?;

    if json {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        ui::success(&format!(
            "Published {} file(s) to {} (removed {} stale object(s))",
            report.uploaded, report.bucket, report.removed
        ));
        ui::success("CloudFront cache invalidated");
    }
    Ok(())
}

fn load_templates(dir: &Path) -> Result<TemplateSet> {
    let site_path = dir.join("template.yaml");
    let cert_path = dir.join("acm-cert.yaml");
    let site = fs::read_to_string(&site_path)
        .with_context(|| format!("reading template {}", site_path.display()))?;
    let certificate = fs::read_to_string(&cert_path)
        .with_context(|| format!("reading template {}", cert_path.display()))?;
    Ok(TemplateSet { site, certificate })
}

/// Outputs land in `$GITHUB_ENV` on CI runners, in the env file otherwise
fn state_store(env_file: &Path) -> Result<Box<dyn StateStore>> {
    if running_in_ci() {
        let path = std::env::var(vars::GITHUB_ENV).map_err(|_| HoistError::ConfigMissing {
            name: vars::GITHUB_ENV.to_string(),
        })?;
        Ok(Box::new(CiStore::new(path)))
    } else {
        Ok(Box::new(DotenvStore::new(env_file)))
    }
}
