//! DAG bucket
//!
//! Either an existing bucket looked up by name, or a bucket this stack
//! creates: versioned, KMS-encrypted, no public access, TLS only.

use serde_json::{json, Value};
use tracing::info;

use crate::context::{DeploymentContext, Partition};
use crate::iam::{ArnPattern, ConditionOperator, PolicyDocument, PolicyStatement, Principal};
use crate::template::{logical_id, reference, Template};

pub const BUCKET_ID: &str = "airflow-dag-bucket";

/// The bucket Airflow reads DAGs, plugins and requirements from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DagBucket {
    /// Created and owned by this stack
    Owned { name: String },
    /// Pre-existing, resolved by name only
    Referenced { name: String },
}

impl DagBucket {
    /// Reference `existing` when given and non-empty, otherwise create
    /// `{dep_mod}-{account}-{region}`
    pub fn resolve(ctx: &DeploymentContext, existing: Option<&str>) -> Self {
        match existing.filter(|name| !name.is_empty()) {
            Some(name) => {
                info!(bucket = %name, "Using existing DAG bucket");
                DagBucket::Referenced {
                    name: name.to_string(),
                }
            }
            None => DagBucket::Owned {
                name: ctx.bucket_name(),
            },
        }
    }

    pub fn name(&self) -> &str {
        match self {
            DagBucket::Owned { name } | DagBucket::Referenced { name } => name,
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, DagBucket::Owned { .. })
    }

    pub fn arn(&self, partition: Partition) -> ArnPattern {
        ArnPattern::s3_bucket(partition, self.name())
    }

    pub fn logical_id(&self) -> String {
        logical_id(BUCKET_ID)
    }

    /// Bucket name as a template value; a `Ref` when the stack owns it
    pub fn name_value(&self) -> Value {
        match self {
            DagBucket::Owned { .. } => reference(&self.logical_id()),
            DagBucket::Referenced { name } => json!(name),
        }
    }

    /// Bucket policy denying any request not sent over TLS
    pub fn enforce_ssl_policy(&self, partition: Partition) -> PolicyDocument {
        let arn = self.arn(partition);
        PolicyDocument::new(vec![PolicyStatement::deny()
            .principal(Principal::Anyone)
            .actions(["s3:*"])
            .resources([arn.clone(), arn.child("*")])
            .condition(ConditionOperator::Bool, "aws:SecureTransport", "false")])
    }

    /// Declare the bucket and its policy. A referenced bucket declares nothing.
    pub fn declare(&self, partition: Partition, template: &mut Template) {
        let DagBucket::Owned { name } = self else {
            return;
        };
        let id = self.logical_id();

        template.add_resource(
            id.clone(),
            json!({
                "Type": "AWS::S3::Bucket",
                "Properties": {
                    "BucketName": name,
                    "VersioningConfiguration": { "Status": "Enabled" },
                    "BucketEncryption": {
                        "ServerSideEncryptionConfiguration": [{
                            "ServerSideEncryptionByDefault": { "SSEAlgorithm": "aws:kms" }
                        }]
                    },
                    "PublicAccessBlockConfiguration": {
                        "BlockPublicAcls": true,
                        "BlockPublicPolicy": true,
                        "IgnorePublicAcls": true,
                        "RestrictPublicBuckets": true
                    },
                    "Tags": template.tag_list()
                },
                "DeletionPolicy": "Delete",
                "UpdateReplacePolicy": "Delete"
            }),
        );

        template.add_resource(
            format!("{id}Policy"),
            json!({
                "Type": "AWS::S3::BucketPolicy",
                "Properties": {
                    "Bucket": reference(&id),
                    "PolicyDocument": self.enforce_ssl_policy(partition)
                }
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> DeploymentContext {
        DeploymentContext::new("addf", "demo", "mwaa", "123456789012", "us-east-1")
    }

    #[test]
    fn test_owned_bucket_declares_bucket_and_policy() {
        let bucket = DagBucket::resolve(&ctx(), None);
        assert!(bucket.is_owned());
        assert_eq!(bucket.name(), "addf-demo-mwaa-123456789012-us-east-1");

        let mut template = Template::new("t").with_tag("Deployment", "addf-demo-mwaa");
        bucket.declare(Partition::Aws, &mut template);

        let resource = template.resource("AirflowDagBucket").unwrap();
        let props = &resource["Properties"];
        assert_eq!(props["VersioningConfiguration"]["Status"], "Enabled");
        assert_eq!(
            props["BucketEncryption"]["ServerSideEncryptionConfiguration"][0]
                ["ServerSideEncryptionByDefault"]["SSEAlgorithm"],
            "aws:kms"
        );
        assert_eq!(props["PublicAccessBlockConfiguration"]["BlockPublicPolicy"], true);
        assert_eq!(resource["DeletionPolicy"], "Delete");
        assert_eq!(props["Tags"][0]["Value"], "addf-demo-mwaa");

        let policy = &template.resource("AirflowDagBucketPolicy").unwrap()["Properties"];
        let statement = &policy["PolicyDocument"]["Statement"][0];
        assert_eq!(statement["Effect"], "Deny");
        assert_eq!(statement["Condition"]["Bool"]["aws:SecureTransport"], "false");
        assert_eq!(bucket.name_value(), json!({ "Ref": "AirflowDagBucket" }));
    }

    #[test]
    fn test_empty_existing_name_creates_bucket() {
        let bucket = DagBucket::resolve(&ctx(), Some(""));
        assert!(bucket.is_owned());
        assert_eq!(bucket.name(), "addf-demo-mwaa-123456789012-us-east-1");
        assert_eq!(
            bucket.arn(Partition::Aws).to_string(),
            "arn:aws:s3:::addf-demo-mwaa-123456789012-us-east-1"
        );
    }

    #[test]
    fn test_referenced_bucket_declares_nothing() {
        let bucket = DagBucket::resolve(&ctx(), Some("shared-dags"));
        assert!(!bucket.is_owned());
        assert_eq!(bucket.arn(Partition::Aws).to_string(), "arn:aws:s3:::shared-dags");

        let mut template = Template::new("t");
        bucket.declare(Partition::Aws, &mut template);
        assert_eq!(template.resource_count(), 0);
        assert_eq!(bucket.name_value(), json!("shared-dags"));
    }
}
