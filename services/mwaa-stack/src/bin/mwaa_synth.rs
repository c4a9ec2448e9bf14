//! MWAA Synth - Standalone Binary
//!
//! Stages the plugins and requirements directories, declares the MWAA stack
//! and writes its CloudFormation template.
//!
//! ## Usage
//!
//! ```bash
//! # Template to stdout, parameters from the environment
//! PROJECT_NAME=addf DEPLOYMENT_NAME=demo MODULE_NAME=mwaa ... mwaa-synth
//!
//! # Reuse an existing DAG bucket and write to a file
//! mwaa-synth --dag-bucket-name shared-dags --output template.json ...
//!
//! # Only the execution role's effective IAM policy
//! mwaa-synth --policy-only ...
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use mwaa_stack::resources::Asset;
use mwaa_stack::stack::{DEFAULT_DAG_PATH, DEFAULT_ENVIRONMENT_CLASS, DEFAULT_MAX_WORKERS};
use mwaa_stack::{DeploymentContext, MwaaStack, StackProps};

/// MWAA Synth - Render the MWAA stack as a CloudFormation template
#[derive(Parser, Debug)]
#[command(name = "mwaa-synth", version, about)]
struct Args {
    /// Project name
    #[arg(long, env = "PROJECT_NAME")]
    project_name: String,

    /// Deployment name
    #[arg(long, env = "DEPLOYMENT_NAME")]
    deployment_name: String,

    /// Module name
    #[arg(long, env = "MODULE_NAME")]
    module_name: String,

    /// Target AWS account ID
    #[arg(long, env = "AWS_ACCOUNT_ID")]
    account_id: String,

    /// Target AWS region
    #[arg(long, env = "AWS_REGION")]
    region: String,

    /// VPC the environment runs in
    #[arg(long, env = "VPC_ID")]
    vpc_id: String,

    /// Private subnet IDs, comma-separated (first two are used)
    #[arg(long, env = "PRIVATE_SUBNET_IDS", value_delimiter = ',', required = true)]
    private_subnet_ids: Vec<String>,

    /// Existing DAG bucket; a new bucket is created when omitted
    #[arg(long, env = "DAG_BUCKET_NAME")]
    dag_bucket_name: Option<String>,

    /// DAG prefix in the bucket
    #[arg(long, env = "DAG_PATH", default_value = DEFAULT_DAG_PATH)]
    dag_path: String,

    /// MWAA environment class
    #[arg(long, env = "ENVIRONMENT_CLASS", default_value = DEFAULT_ENVIRONMENT_CLASS)]
    environment_class: String,

    /// Airflow version
    #[arg(long, env = "AIRFLOW_VERSION")]
    airflow_version: String,

    /// Maximum number of Airflow workers
    #[arg(long, env = "MAX_WORKERS", default_value_t = DEFAULT_MAX_WORKERS)]
    max_workers: u32,

    /// Key of the requirements file inside the DAG bucket
    #[arg(long, env = "UNIQUE_REQUIREMENTS_FILE")]
    unique_requirements_file: String,

    /// CloudFormation stack description
    #[arg(long, env = "STACK_DESCRIPTION")]
    stack_description: String,

    /// Directory uploaded under plugins/
    #[arg(long, env = "PLUGINS_DIR", default_value = "plugins")]
    plugins_dir: PathBuf,

    /// Directory uploaded under requirements/
    #[arg(long, env = "REQUIREMENTS_DIR", default_value = "requirements")]
    requirements_dir: PathBuf,

    /// Write output to this file instead of stdout
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Emit only the execution role's effective IAM policy
    #[arg(long, default_value = "false")]
    policy_only: bool,
}

impl Args {
    fn context(&self) -> DeploymentContext {
        DeploymentContext::new(
            &self.project_name,
            &self.deployment_name,
            &self.module_name,
            &self.account_id,
            &self.region,
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the template
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .json()
        .init();

    let args = Args::parse();

    info!(
        project = %args.project_name,
        deployment = %args.deployment_name,
        module = %args.module_name,
        region = %args.region,
        "Starting MWAA synth"
    );

    let rendered = synth(&args).context("Failed to synthesize MWAA stack")?;

    match &args.output {
        Some(path) => {
            tokio::fs::write(path, rendered.as_bytes())
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(output = %path.display(), "Template written");
        }
        None => println!("{}", rendered),
    }

    Ok(())
}

/// Stage assets, declare the stack and render the requested document
fn synth(args: &Args) -> Result<String> {
    let plugins = Asset::stage(&args.plugins_dir).context("Failed to stage plugins")?;
    let requirements =
        Asset::stage(&args.requirements_dir).context("Failed to stage requirements")?;

    let props = StackProps::new(
        &args.vpc_id,
        args.private_subnet_ids.clone(),
        &args.airflow_version,
        &args.unique_requirements_file,
        &args.stack_description,
        plugins,
        requirements,
    )
    .with_dag_bucket_name(args.dag_bucket_name.clone())
    .with_dag_path(&args.dag_path)
    .with_environment_class(&args.environment_class)
    .with_max_workers(args.max_workers);

    let stack = MwaaStack::new(args.context(), props)?;

    if args.policy_only {
        return serde_json::to_string_pretty(&stack.execution_policy())
            .context("Failed to serialize policy");
    }

    Ok(stack.synth().to_json_pretty()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args(dir: &TempDir, extra: &[&str]) -> Args {
        let plugins = dir.path().join("plugins");
        let requirements = dir.path().join("requirements");
        std::fs::create_dir_all(&plugins).unwrap();
        std::fs::create_dir_all(&requirements).unwrap();
        std::fs::write(plugins.join("plugins.zip"), "zip").unwrap();
        std::fs::write(requirements.join("requirements.txt"), "boto3").unwrap();

        let mut argv = vec![
            "mwaa-synth".to_string(),
            "--project-name=addf".to_string(),
            "--deployment-name=demo".to_string(),
            "--module-name=mwaa".to_string(),
            "--account-id=123456789012".to_string(),
            "--region=us-east-1".to_string(),
            "--vpc-id=vpc-1".to_string(),
            "--private-subnet-ids=subnet-a,subnet-b,subnet-c".to_string(),
            "--airflow-version=2.5.1".to_string(),
            "--unique-requirements-file=requirements/requirements.txt".to_string(),
            "--stack-description=MWAA".to_string(),
            "--dag-path=dags".to_string(),
            "--environment-class=mw1.small".to_string(),
            "--max-workers=25".to_string(),
            format!("--plugins-dir={}", plugins.display()),
            format!("--requirements-dir={}", requirements.display()),
        ];
        argv.extend(extra.iter().map(|s| s.to_string()));
        let mut args = Args::try_parse_from(argv).unwrap();
        // DAG_BUCKET_NAME has no flag default to pin
        args.dag_bucket_name = None;
        args
    }

    #[test]
    fn test_flags_and_subnet_list() {
        let dir = TempDir::new().unwrap();
        let args = args(&dir, &[]);
        assert_eq!(args.private_subnet_ids, ["subnet-a", "subnet-b", "subnet-c"]);
        assert_eq!(args.dag_path, "dags");
        assert_eq!(args.environment_class, "mw1.small");
        assert_eq!(args.max_workers, 25);
        assert!(args.dag_bucket_name.is_none());
        assert!(!args.policy_only);
    }

    #[test]
    fn test_synth_template() {
        let dir = TempDir::new().unwrap();
        let rendered = synth(&args(&dir, &[])).unwrap();
        let template: serde_json::Value = serde_json::from_str(&rendered).unwrap();

        assert_eq!(template["Description"], "MWAA");
        assert_eq!(template["Resources"]["AirflowDagBucket"]["Type"], "AWS::S3::Bucket");
    }

    #[test]
    fn test_synth_policy_only() {
        let dir = TempDir::new().unwrap();
        let rendered = synth(&args(&dir, &["--policy-only"])).unwrap();
        let policy: serde_json::Value = serde_json::from_str(&rendered).unwrap();

        assert_eq!(policy["Version"], "2012-10-17");
        assert_eq!(policy["Statement"].as_array().map(Vec::len), Some(15));
    }

    #[test]
    fn test_synth_fails_without_assets() {
        let dir = TempDir::new().unwrap();
        let mut args = args(&dir, &[]);
        args.plugins_dir = dir.path().join("missing");
        assert!(synth(&args).is_err());
    }
}
