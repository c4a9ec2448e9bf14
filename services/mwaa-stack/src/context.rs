//! Deployment identity context
//!
//! Project, deployment and module names plus the target account and region.
//! Everything the stack names or scopes is templated from these five values.

use serde::{Deserialize, Serialize};

use crate::error::{StackError, StackResult};

/// Maximum length of an AWS tag value
pub const TAG_VALUE_MAX_LEN: usize = 256;

/// Maximum length of an MWAA environment name
pub const ENVIRONMENT_NAME_MAX_LEN: usize = 80;

/// AWS partition the target region belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Partition {
    Aws,
    AwsCn,
    AwsUsGov,
}

impl Partition {
    /// Resolve the partition from a region name
    pub fn for_region(region: &str) -> Self {
        if region.starts_with("cn-") {
            Partition::AwsCn
        } else if region.starts_with("us-gov-") {
            Partition::AwsUsGov
        } else {
            Partition::Aws
        }
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Partition::Aws => write!(f, "aws"),
            Partition::AwsCn => write!(f, "aws-cn"),
            Partition::AwsUsGov => write!(f, "aws-us-gov"),
        }
    }
}

/// Identity of a stack deployment, fixed at construction time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentContext {
    pub project_name: String,
    pub deployment_name: String,
    pub module_name: String,
    pub account_id: String,
    pub region: String,
}

impl DeploymentContext {
    pub fn new(
        project_name: impl Into<String>,
        deployment_name: impl Into<String>,
        module_name: impl Into<String>,
        account_id: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            project_name: project_name.into(),
            deployment_name: deployment_name.into(),
            module_name: module_name.into(),
            account_id: account_id.into(),
            region: region.into(),
        }
    }

    pub fn partition(&self) -> Partition {
        Partition::for_region(&self.region)
    }

    /// `{project}-{deployment}-{module}`
    pub fn dep_mod(&self) -> String {
        format!(
            "{}-{}-{}",
            self.project_name, self.deployment_name, self.module_name
        )
    }

    /// `{project}-{deployment}`, the prefix sibling stacks name their resources with
    pub fn project_deployment(&self) -> String {
        format!("{}-{}", self.project_name, self.deployment_name)
    }

    /// Value of the `Deployment` tag, cut to the tag value limit
    pub fn deployment_tag(&self) -> String {
        truncate_chars(&self.dep_mod(), TAG_VALUE_MAX_LEN)
    }

    /// Name of the MWAA environment; rejected when over 80 characters
    pub fn environment_name(&self) -> StackResult<String> {
        let name = format!("{}-environment", self.dep_mod());
        ensure_len("Environment", name, ENVIRONMENT_NAME_MAX_LEN)
    }

    /// Name of a bucket owned by this stack
    pub fn bucket_name(&self) -> String {
        format!("{}-{}-{}", self.dep_mod(), self.account_id, self.region)
    }
}

fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

fn ensure_len(kind: &'static str, name: String, limit: usize) -> StackResult<String> {
    let len = name.chars().count();
    if len > limit {
        return Err(StackError::NameTooLong {
            kind,
            name,
            len,
            limit,
        });
    }
    Ok(name)
}
