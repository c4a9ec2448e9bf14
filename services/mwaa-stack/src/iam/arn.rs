//! ARN pattern builder
//!
//! `arn:{partition}:{service}:{region}:{account}:{resource}` where region and
//! account may be empty (global services), a literal, or a `*` wildcard.

use crate::context::{DeploymentContext, Partition};

/// A resource ARN, possibly containing wildcards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArnPattern {
    partition: Partition,
    service: String,
    region: String,
    account: String,
    resource: String,
}

impl ArnPattern {
    /// Start an ARN for `service` with empty region and account
    pub fn new(partition: Partition, service: impl Into<String>) -> Self {
        Self {
            partition,
            service: service.into(),
            region: String::new(),
            account: String::new(),
            resource: String::new(),
        }
    }

    /// Regional ARN in the context's account and region
    pub fn regional(ctx: &DeploymentContext, service: &str) -> Self {
        Self::new(ctx.partition(), service)
            .region(&ctx.region)
            .account(&ctx.account_id)
    }

    /// Global ARN (no region) in the context's account
    pub fn global(ctx: &DeploymentContext, service: &str) -> Self {
        Self::new(ctx.partition(), service).account(&ctx.account_id)
    }

    /// ARN of an S3 bucket
    pub fn s3_bucket(partition: Partition, bucket_name: &str) -> Self {
        Self::new(partition, "s3").resource(bucket_name)
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn any_region(self) -> Self {
        self.region("*")
    }

    pub fn account(mut self, account: impl Into<String>) -> Self {
        self.account = account.into();
        self
    }

    pub fn any_account(self) -> Self {
        self.account("*")
    }

    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = resource.into();
        self
    }

    /// Child path under this ARN's resource, e.g. bucket objects
    pub fn child(&self, path: &str) -> Self {
        let mut arn = self.clone();
        arn.resource = format!("{}/{}", self.resource, path);
        arn
    }

    pub fn has_wildcard(&self) -> bool {
        self.region == "*" || self.account == "*" || self.resource.contains('*')
    }
}

impl std::fmt::Display for ArnPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "arn:{}:{}:{}:{}:{}",
            self.partition, self.service, self.region, self.account, self.resource
        )
    }
}

impl From<ArnPattern> for String {
    fn from(arn: ArnPattern) -> Self {
        arn.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> DeploymentContext {
        DeploymentContext::new("addf", "demo", "mwaa", "123456789012", "eu-west-1")
    }

    #[test]
    fn test_regional_arn() {
        let arn = ArnPattern::regional(&ctx(), "eks").resource("cluster/addf-demo-*");
        assert_eq!(
            arn.to_string(),
            "arn:aws:eks:eu-west-1:123456789012:cluster/addf-demo-*"
        );
        assert!(arn.has_wildcard());
    }

    #[test]
    fn test_global_and_wildcard_segments() {
        let iam = ArnPattern::global(&ctx(), "iam").resource("role/addf-*");
        assert_eq!(iam.to_string(), "arn:aws:iam::123456789012:role/addf-*");

        let kms = ArnPattern::global(&ctx(), "kms").any_region().resource("key/*");
        assert_eq!(kms.to_string(), "arn:aws:kms:*:123456789012:key/*");

        let sqs = ArnPattern::regional(&ctx(), "sqs")
            .any_account()
            .resource("airflow-celery-*");
        assert_eq!(sqs.to_string(), "arn:aws:sqs:eu-west-1:*:airflow-celery-*");
    }

    #[test]
    fn test_bucket_and_objects() {
        let bucket = ArnPattern::s3_bucket(Partition::AwsCn, "my-bucket");
        assert_eq!(bucket.to_string(), "arn:aws-cn:s3:::my-bucket");
        assert!(!bucket.has_wildcard());
        assert_eq!(bucket.child("*").to_string(), "arn:aws-cn:s3:::my-bucket/*");
    }
}
