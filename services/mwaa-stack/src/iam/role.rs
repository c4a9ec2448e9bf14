//! IAM service role
//!
//! A [`Role`] accepts extra statements until it is finalized. The
//! [`FinalizedRole`] handed to the environment declaration has no mutators,
//! so nothing can change the role once it is attached.

use serde_json::json;
use std::collections::BTreeMap;
use tracing::debug;

use super::policy::{PolicyDocument, PolicyStatement, Principal};
use crate::context::Partition;
use crate::template::{get_att, logical_id, reference, Template};

/// Reference to an AWS-managed policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedPolicy {
    name: String,
}

impl ManagedPolicy {
    pub fn aws_managed(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arn(&self, partition: Partition) -> String {
        format!("arn:{}:iam::aws:policy/{}", partition, self.name)
    }
}

/// An IAM role under construction
#[derive(Debug, Clone)]
pub struct Role {
    construct_id: String,
    assumed_by: Vec<String>,
    inline_policies: BTreeMap<String, PolicyDocument>,
    managed_policies: Vec<ManagedPolicy>,
    path: String,
    default_policy: PolicyDocument,
}

impl Role {
    /// Create a role trusted by the given service principals
    pub fn new<I, S>(construct_id: impl Into<String>, assumed_by: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            construct_id: construct_id.into(),
            assumed_by: assumed_by.into_iter().map(Into::into).collect(),
            inline_policies: BTreeMap::new(),
            managed_policies: Vec::new(),
            path: "/".to_string(),
            default_policy: PolicyDocument::default(),
        }
    }

    pub fn with_inline_policy(mut self, name: impl Into<String>, document: PolicyDocument) -> Self {
        self.inline_policies.insert(name.into(), document);
        self
    }

    pub fn with_managed_policy(mut self, policy: ManagedPolicy) -> Self {
        self.managed_policies.push(policy);
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Append a statement to the role's default policy
    pub fn add_to_policy(&mut self, statement: PolicyStatement) {
        debug!(
            role = %self.construct_id,
            actions = ?statement.actions,
            "Adding statement to default policy"
        );
        self.default_policy.add_statement(statement);
    }

    /// Freeze the role for attachment
    pub fn finalize(self) -> FinalizedRole {
        FinalizedRole(self)
    }

    pub fn construct_id(&self) -> &str {
        &self.construct_id
    }

    pub fn assumed_by(&self) -> &[String] {
        &self.assumed_by
    }

    pub fn inline_policies(&self) -> &BTreeMap<String, PolicyDocument> {
        &self.inline_policies
    }

    pub fn managed_policies(&self) -> &[ManagedPolicy] {
        &self.managed_policies
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Statements appended after creation
    pub fn default_policy(&self) -> &PolicyDocument {
        &self.default_policy
    }

    /// Trust policy allowing the principals to assume the role
    pub fn trust_policy(&self) -> PolicyDocument {
        PolicyDocument::new(vec![PolicyStatement::allow()
            .principal(Principal::Service(self.assumed_by.clone()))
            .actions(["sts:AssumeRole"])])
    }

    /// Inline policies followed by the default policy, as one document
    pub fn effective_policy(&self) -> PolicyDocument {
        self.inline_policies
            .values()
            .fold(PolicyDocument::default(), |acc, doc| acc.merged(doc))
            .merged(&self.default_policy)
    }
}

/// A role that has been attached and can no longer change
#[derive(Debug, Clone)]
pub struct FinalizedRole(Role);

impl FinalizedRole {
    pub fn as_role(&self) -> &Role {
        &self.0
    }

    pub fn logical_id(&self) -> String {
        logical_id(&self.0.construct_id)
    }

    pub fn arn(&self) -> serde_json::Value {
        get_att(&self.logical_id(), "Arn")
    }

    /// Declare the role, plus its default policy when statements were appended
    pub fn declare(&self, partition: Partition, template: &mut Template) {
        let role = &self.0;
        let id = self.logical_id();

        let policies: Vec<_> = role
            .inline_policies
            .iter()
            .map(|(name, document)| json!({ "PolicyName": name, "PolicyDocument": document }))
            .collect();
        let managed: Vec<_> = role
            .managed_policies
            .iter()
            .map(|policy| policy.arn(partition))
            .collect();

        template.add_resource(
            id.clone(),
            json!({
                "Type": "AWS::IAM::Role",
                "Properties": {
                    "AssumeRolePolicyDocument": role.trust_policy(),
                    "ManagedPolicyArns": managed,
                    "Path": role.path,
                    "Policies": policies,
                    "Tags": template.tag_list()
                }
            }),
        );

        if role.default_policy.is_empty() {
            return;
        }
        let policy_id = format!("{id}DefaultPolicy");
        template.add_resource(
            policy_id.clone(),
            json!({
                "Type": "AWS::IAM::Policy",
                "Properties": {
                    "PolicyName": policy_id,
                    "PolicyDocument": role.default_policy,
                    "Roles": [reference(&id)]
                }
            }),
        );
    }
}
