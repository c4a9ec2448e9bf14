//! MWAA execution role permissions
//!
//! The fixed statement catalogue the Airflow environment runs under. Scopes
//! use `{project}-{deployment}-*` naming wildcards because clusters, tables
//! and environments come from sibling stacks whose exact names are not
//! known when this stack is authored.

use tracing::info;

use super::arn::ArnPattern;
use super::policy::{ConditionOperator, PolicyDocument, PolicyStatement};
use super::role::{FinalizedRole, ManagedPolicy, Role};
use crate::context::DeploymentContext;

/// Construct id of the execution role
pub const ROLE_ID: &str = "mwaa-service-role";

/// Name of the inline policy carrying the base catalogue
pub const INLINE_POLICY_NAME: &str = "CDKmwaaPolicyDocument";

/// Principals trusted to assume the execution role
pub const TRUSTED_SERVICES: [&str; 2] = ["airflow.amazonaws.com", "airflow-env.amazonaws.com"];

/// AWS-managed policies attached to the execution role
pub const MANAGED_POLICIES: [&str; 2] = ["AWSBatchFullAccess", "AWSXRayDaemonWriteAccess"];

/// Path the execution role is created under
pub const ROLE_PATH: &str = "/service-role/";

/// Condition key restricting which service a role may be passed to
pub const PASSED_TO_SERVICE: &str = "iam:PassedToService";

/// Services the execution role may pass roles to
pub mod passed_to {
    pub const SAGEMAKER: &str = "sagemaker.amazonaws.com";
    pub const EMR_SERVERLESS: &str = "emr-serverless.amazonaws.com";
}

/// IAM action lists, grouped by service
pub mod actions {
    pub const AIRFLOW: &[&str] = &["airflow:PublishMetrics"];

    pub const BATCH: &[&str] = &["batch:SubmitJob"];

    pub const EKS: &[&str] = &["eks:DescribeCluster"];

    pub const S3: &[&str] = &[
        "s3:GetBucket*",
        "s3:GetObject*",
        "s3:PutObject",
        "s3:PutObjectAcl",
        "s3:List*",
        "s3:PutObjectTagging",
    ];

    pub const KMS: &[&str] = &[
        "kms:Decrypt",
        "kms:Encrypt",
        "kms:ReEncrypt*",
        "kms:DescribeKey",
        "kms:GenerateDataKey",
    ];

    pub const LOGS: &[&str] = &[
        "logs:CreateLogStream",
        "logs:CreateLogGroup",
        "logs:PutLogEvents",
        "logs:GetLogEvents",
        "logs:GetLogRecord",
        "logs:GetLogGroupFields",
        "logs:GetQueryResults",
        "logs:DescribeLogGroups",
    ];

    pub const LOGS_DESCRIBE: &[&str] = &["logs:DescribeLogGroups"];

    pub const CLOUDWATCH: &[&str] = &["cloudwatch:PutMetricData"];

    pub const SQS: &[&str] = &[
        "sqs:ChangeMessageVisibility",
        "sqs:DeleteMessage",
        "sqs:GetQueueAttributes",
        "sqs:GetQueueUrl",
        "sqs:ReceiveMessage",
        "sqs:SendMessage",
    ];

    pub const STS: &[&str] = &["sts:AssumeRole"];

    pub const DYNAMODB: &[&str] = &["dynamodb:*"];

    pub const SAGEMAKER: &[&str] = &[
        "sagemaker:CreateProcessingJob",
        "sagemaker:DescribeProcessingJob",
        "sagemaker:ListProcessingJob",
    ];

    pub const EMR_SERVERLESS: &[&str] = &[
        "emr-serverless:CreateApplication",
        "emr-serverless:GetApplication",
        "emr-serverless:StartApplication",
        "emr-serverless:StopApplication",
        "emr-serverless:DeleteApplication",
        "emr-serverless:StartJobRun",
        "emr-serverless:GetJobRun",
    ];

    pub const PASS_ROLE: &[&str] = &["iam:PassRole"];
}

/// Number of statements in the base catalogue
pub const BASE_STATEMENT_COUNT: usize = 13;

/// Builds the execution role's policy from the deployment identity
pub struct MwaaPermissions<'a> {
    ctx: &'a DeploymentContext,
    bucket_arn: &'a ArnPattern,
}

impl<'a> MwaaPermissions<'a> {
    pub fn new(ctx: &'a DeploymentContext, bucket_arn: &'a ArnPattern) -> Self {
        Self { ctx, bucket_arn }
    }

    /// The 13 base statements, in catalogue order
    pub fn base_document(&self) -> PolicyDocument {
        let ctx = self.ctx;
        let scoped = format!("{}-*", ctx.project_deployment());
        let environments = ArnPattern::regional(ctx, "airflow").resource(format!("environment/{scoped}"));

        // Batch is scoped to the environment ARN pattern, as the catalogue has it.
        PolicyDocument::new(vec![
            PolicyStatement::allow()
                .actions(actions::AIRFLOW.iter().copied())
                .resources([environments.clone()]),
            PolicyStatement::allow()
                .actions(actions::BATCH.iter().copied())
                .resources([environments]),
            PolicyStatement::allow()
                .actions(actions::EKS.iter().copied())
                .resources([ArnPattern::regional(ctx, "eks").resource(format!("cluster/{scoped}"))]),
            PolicyStatement::allow()
                .actions(actions::S3.iter().copied())
                .resources([self.bucket_arn.child("*"), self.bucket_arn.clone()]),
            PolicyStatement::allow()
                .actions(actions::KMS.iter().copied())
                .not_resources([ArnPattern::global(ctx, "kms").any_region().resource("key/*")])
                .condition(
                    ConditionOperator::StringLike,
                    "kms:ViaService",
                    format!("sqs.{}.amazonaws.com", ctx.region),
                ),
            PolicyStatement::allow()
                .actions(actions::LOGS.iter().copied())
                .resources([ArnPattern::regional(ctx, "logs")
                    .resource(format!("log-group:airflow-{}*", ctx.project_name))]),
            PolicyStatement::allow()
                .actions(actions::LOGS_DESCRIBE.iter().copied())
                .resources([ArnPattern::global(ctx, "logs").resource("*")]),
            PolicyStatement::allow()
                .actions(actions::CLOUDWATCH.iter().copied())
                .resources(["*"]),
            PolicyStatement::allow()
                .actions(actions::SQS.iter().copied())
                .resources([ArnPattern::regional(ctx, "sqs")
                    .any_account()
                    .resource("airflow-celery-*")]),
            PolicyStatement::allow()
                .actions(actions::STS.iter().copied())
                .resources([ArnPattern::global(ctx, "iam")
                    .resource(format!("role/{}-*", ctx.project_name))]),
            PolicyStatement::allow()
                .actions(actions::DYNAMODB.iter().copied())
                .resources([ArnPattern::regional(ctx, "dynamodb")
                    .resource(format!("table/{}*", ctx.dep_mod()))]),
            PolicyStatement::allow()
                .actions(actions::SAGEMAKER.iter().copied())
                .resources([ArnPattern::regional(ctx, "sagemaker").resource("processing-job/*")]),
            PolicyStatement::allow()
                .actions(actions::EMR_SERVERLESS.iter().copied())
                .resources([ArnPattern::regional(ctx, "emr-serverless").resource("/applications/*")]),
        ])
    }

    /// PassRole grants added to the role after creation. The passed role is
    /// unknown here, so each grant is narrowed by the receiving service.
    pub fn pass_role_statements() -> [PolicyStatement; 2] {
        [
            PolicyStatement::allow()
                .actions(actions::PASS_ROLE.iter().copied())
                .resources(["*"])
                .condition(ConditionOperator::StringEquals, PASSED_TO_SERVICE, passed_to::SAGEMAKER),
            PolicyStatement::allow()
                .actions(actions::PASS_ROLE.iter().copied())
                .resources(["*"])
                .condition(ConditionOperator::StringLike, PASSED_TO_SERVICE, passed_to::EMR_SERVERLESS),
        ]
    }

    /// Create the execution role, append the PassRole grants and finalize it
    pub fn build_role(&self) -> FinalizedRole {
        let mut role = Role::new(ROLE_ID, TRUSTED_SERVICES)
            .with_inline_policy(INLINE_POLICY_NAME, self.base_document())
            .with_path(ROLE_PATH);
        for name in MANAGED_POLICIES {
            role = role.with_managed_policy(ManagedPolicy::aws_managed(name));
        }

        for statement in Self::pass_role_statements() {
            role.add_to_policy(statement);
        }

        info!(
            role = ROLE_ID,
            inline_statements = BASE_STATEMENT_COUNT,
            default_statements = role.default_policy().len(),
            "Built MWAA execution role"
        );
        role.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> DeploymentContext {
        DeploymentContext::new("addf", "demo", "core", "123456789012", "us-west-2")
    }

    fn bucket() -> ArnPattern {
        ArnPattern::s3_bucket(ctx().partition(), "dag-bucket")
    }

    #[test]
    fn test_catalogue_size_and_actions() {
        let ctx = ctx();
        let bucket = bucket();
        let role = MwaaPermissions::new(&ctx, &bucket).build_role();
        let effective = role.as_role().effective_policy();

        assert_eq!(effective.len(), BASE_STATEMENT_COUNT + 2);
        assert!(effective.statements().iter().all(|s| !s.actions.is_empty()));
        assert!(effective.statements().iter().all(|s| s.is_well_formed()));
        assert_eq!(effective.statements_granting("iam:PassRole").count(), 2);
    }

    #[test]
    fn test_bucket_arn_forms() {
        let ctx = ctx();
        let bucket = bucket();
        let doc = MwaaPermissions::new(&ctx, &bucket).base_document();

        let s3: Vec<_> = doc.statements_granting("s3:PutObject").collect();
        assert_eq!(s3.len(), 1);
        assert_eq!(
            s3[0].resources,
            vec![
                "arn:aws:s3:::dag-bucket/*".to_string(),
                "arn:aws:s3:::dag-bucket".to_string()
            ]
        );

        let mentions = doc
            .statements()
            .iter()
            .flat_map(|s| s.resources.iter())
            .filter(|r| r.contains("dag-bucket"))
            .count();
        assert_eq!(mentions, 2);
    }

    #[test]
    fn test_pass_role_conditions_are_exclusive() {
        let [sagemaker, emr] = MwaaPermissions::pass_role_statements();

        assert!(sagemaker.condition_matches(PASSED_TO_SERVICE, passed_to::SAGEMAKER));
        assert!(!sagemaker.condition_matches(PASSED_TO_SERVICE, passed_to::EMR_SERVERLESS));
        assert!(emr.condition_matches(PASSED_TO_SERVICE, passed_to::EMR_SERVERLESS));
        assert!(!emr.condition_matches(PASSED_TO_SERVICE, passed_to::SAGEMAKER));
        assert_eq!(sagemaker.resources, vec!["*".to_string()]);
    }

    #[test]
    fn test_scoped_resources() {
        let ctx = ctx();
        let bucket = bucket();
        let doc = MwaaPermissions::new(&ctx, &bucket).base_document();
        let first_resource = |action: &str| {
            doc.statements_granting(action)
                .next()
                .and_then(|s| s.resources.first().cloned())
                .unwrap_or_default()
        };

        assert_eq!(
            first_resource("airflow:PublishMetrics"),
            "arn:aws:airflow:us-west-2:123456789012:environment/addf-demo-*"
        );
        assert_eq!(
            first_resource("batch:SubmitJob"),
            "arn:aws:airflow:us-west-2:123456789012:environment/addf-demo-*"
        );
        assert_eq!(
            first_resource("eks:DescribeCluster"),
            "arn:aws:eks:us-west-2:123456789012:cluster/addf-demo-*"
        );
        assert_eq!(
            first_resource("logs:PutLogEvents"),
            "arn:aws:logs:us-west-2:123456789012:log-group:airflow-addf*"
        );
        assert_eq!(
            first_resource("sqs:SendMessage"),
            "arn:aws:sqs:us-west-2:*:airflow-celery-*"
        );
        assert_eq!(
            first_resource("sts:AssumeRole"),
            "arn:aws:iam::123456789012:role/addf-*"
        );
        assert_eq!(
            first_resource("dynamodb:*"),
            "arn:aws:dynamodb:us-west-2:123456789012:table/addf-demo-core*"
        );
        assert_eq!(
            first_resource("emr-serverless:StartJobRun"),
            "arn:aws:emr-serverless:us-west-2:123456789012:/applications/*"
        );
    }

    #[test]
    fn test_kms_statement_uses_not_resource() {
        let ctx = ctx();
        let bucket = bucket();
        let doc = MwaaPermissions::new(&ctx, &bucket).base_document();
        let kms = doc.statements_granting("kms:Decrypt").next().unwrap();

        assert!(kms.resources.is_empty());
        assert_eq!(kms.not_resources, vec!["arn:aws:kms:*:123456789012:key/*".to_string()]);
        assert!(kms.condition_matches("kms:ViaService", "sqs.us-west-2.amazonaws.com"));
        assert!(!kms.condition_matches("kms:ViaService", "s3.us-west-2.amazonaws.com"));
    }

    #[test]
    fn test_role_shape() {
        let ctx = ctx();
        let bucket = bucket();
        let role = MwaaPermissions::new(&ctx, &bucket).build_role();
        let role = role.as_role();

        assert_eq!(role.assumed_by(), TRUSTED_SERVICES);
        assert_eq!(role.path(), ROLE_PATH);
        assert_eq!(role.inline_policies().len(), 1);
        assert_eq!(
            role.inline_policies()[INLINE_POLICY_NAME].len(),
            BASE_STATEMENT_COUNT
        );
        let managed: Vec<_> = role.managed_policies().iter().map(|p| p.name()).collect();
        assert_eq!(managed, MANAGED_POLICIES);
    }
}
