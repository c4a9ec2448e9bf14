//! MWAA Stack
//!
//! Declares a managed Airflow environment together with everything it needs:
//!
//! - DAG bucket (created, or an existing one by name)
//! - Plugins and requirements uploads into `plugins/` and `requirements/`
//! - Security group allowing all traffic between its members
//! - Execution role with the MWAA permission catalogue
//! - AWS Solutions checks with the stack's accepted findings
//!
//! Declaring is pure: [`MwaaStack::new`] wires the resources together and
//! [`MwaaStack::synth`] renders them as a CloudFormation template.

mod types;

pub use types::{StackProps, DEFAULT_DAG_PATH, DEFAULT_ENVIRONMENT_CLASS, DEFAULT_MAX_WORKERS};

use serde_json::json;
use tracing::info;

use crate::compliance::Compliance;
use crate::context::DeploymentContext;
use crate::error::StackResult;
use crate::iam::{FinalizedRole, MwaaPermissions, PolicyDocument};
use crate::resources::deployment::{self, BucketDeployment};
use crate::resources::environment::PLUGINS_S3_PATH;
use crate::resources::{
    DagBucket, EnvironmentProperties, MwaaEnvironment, NetworkConfiguration, SecurityGroup,
};
use crate::template::Template;

pub const PLUGINS_DEPLOYMENT_ID: &str = "airflow-dag-plugins";
pub const REQUIREMENTS_DEPLOYMENT_ID: &str = "airflow-dag-requirements";

/// The declared stack
#[derive(Debug, Clone)]
pub struct MwaaStack {
    ctx: DeploymentContext,
    description: String,
    dag_bucket: DagBucket,
    dag_path: String,
    plugins_deployment: BucketDeployment,
    requirements_deployment: BucketDeployment,
    security_group: SecurityGroup,
    role: FinalizedRole,
    environment: MwaaEnvironment,
    compliance: Compliance,
}

impl MwaaStack {
    /// Declare the stack. Fails only when a templated name is over its limit.
    pub fn new(ctx: DeploymentContext, props: StackProps) -> StackResult<Self> {
        let environment_name = ctx.environment_name()?;
        let partition = ctx.partition();

        info!(
            deployment = %ctx.dep_mod(),
            account = %ctx.account_id,
            region = %ctx.region,
            "Declaring MWAA stack"
        );

        let dag_bucket = DagBucket::resolve(&ctx, props.dag_bucket_name.as_deref());

        let plugins_deployment =
            BucketDeployment::new(PLUGINS_DEPLOYMENT_ID, props.plugins, "plugins");
        let requirements_deployment =
            BucketDeployment::new(REQUIREMENTS_DEPLOYMENT_ID, props.requirements, "requirements");

        let bucket_arn = dag_bucket.arn(partition);
        let role = MwaaPermissions::new(&ctx, &bucket_arn).build_role();

        let security_group = SecurityGroup::new(&props.vpc_id);
        let network_configuration =
            NetworkConfiguration::new(&security_group, &props.private_subnet_ids);

        let mut environment = MwaaEnvironment::new(EnvironmentProperties {
            name: environment_name,
            airflow_version: props.airflow_version,
            environment_class: props.environment_class,
            max_workers: props.max_workers,
            dag_s3_path: props.dag_path.clone(),
            plugins_s3_path: PLUGINS_S3_PATH.to_string(),
            requirements_s3_path: props.unique_requirements_file,
            source_bucket_arn: bucket_arn.to_string(),
            execution_role_arn: role.arn(),
            logging_configuration: props.logging,
            network_configuration,
            webserver_access_mode: props.webserver_access_mode,
        });
        environment.add_dependency(plugins_deployment.logical_id());
        environment.add_dependency(requirements_deployment.logical_id());

        info!(
            environment = %environment.name(),
            bucket = %dag_bucket.name(),
            bucket_owned = dag_bucket.is_owned(),
            "MWAA stack declared"
        );

        Ok(Self {
            ctx,
            description: props.stack_description,
            dag_bucket,
            dag_path: props.dag_path,
            plugins_deployment,
            requirements_deployment,
            security_group,
            role,
            environment,
            compliance: Compliance::mwaa_stack(),
        })
    }

    pub fn context(&self) -> &DeploymentContext {
        &self.ctx
    }

    pub fn dag_bucket(&self) -> &DagBucket {
        &self.dag_bucket
    }

    pub fn dag_path(&self) -> &str {
        &self.dag_path
    }

    pub fn environment(&self) -> &MwaaEnvironment {
        &self.environment
    }

    pub fn role(&self) -> &FinalizedRole {
        &self.role
    }

    pub fn security_group(&self) -> &SecurityGroup {
        &self.security_group
    }

    pub fn deployments(&self) -> [&BucketDeployment; 2] {
        [&self.plugins_deployment, &self.requirements_deployment]
    }

    pub fn compliance(&self) -> &Compliance {
        &self.compliance
    }

    /// Every statement the execution role is granted, inline and appended
    pub fn execution_policy(&self) -> PolicyDocument {
        self.role.as_role().effective_policy()
    }

    /// Render the CloudFormation template
    pub fn synth(&self) -> Template {
        let partition = self.ctx.partition();
        let mut template =
            Template::new(&self.description).with_tag("Deployment", self.ctx.deployment_tag());

        deployment::declare_parameters(&mut template);
        self.dag_bucket.declare(partition, &mut template);
        for upload in self.deployments() {
            upload.declare(&self.dag_bucket, &mut template);
        }
        self.role.declare(partition, &mut template);
        self.security_group.declare(&mut template);
        self.environment.declare(&mut template);
        self.compliance.declare(&mut template);

        template.add_metadata(
            "Assets",
            json!(self
                .deployments()
                .iter()
                .map(|d| json!({
                    "construct": d.logical_id(),
                    "source": d.asset().source().display().to_string(),
                    "fingerprint": d.asset().fingerprint(),
                    "objectKey": d.asset().object_key()
                }))
                .collect::<Vec<_>>()),
        );

        template.add_output("DagBucketName", self.dag_bucket.name_value(), "DAG bucket name");
        template.add_output("DagPath", json!(self.dag_path), "DAG prefix in the bucket");
        template.add_output(
            "MwaaEnvironmentName",
            json!(self.environment.name()),
            "MWAA environment name",
        );

        info!(resources = template.resource_count(), "Synthesized template");
        template
    }
}
