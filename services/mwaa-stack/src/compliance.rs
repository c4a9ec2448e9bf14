//! Security linting registration
//!
//! The stack runs under the AWS Solutions rule pack. Findings that are
//! accepted for this stack are recorded as suppressions with a reason, and
//! rendered into template metadata for the linter to pick up.

use serde::Serialize;
use serde_json::json;

use crate::template::Template;

/// Metadata key the linter reads suppressions from
pub const METADATA_KEY: &str = "cdk_nag";

/// AWS Solutions rules this stack suppresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NagRule {
    /// S3 bucket has server access logs disabled
    S1,
    /// S3 static website bucket without an origin access identity
    S5,
    /// IAM entity with wildcard permissions
    Iam5,
    /// IAM user, role or group uses AWS managed policies
    Iam4,
}

impl NagRule {
    pub fn id(&self) -> &'static str {
        match self {
            NagRule::S1 => "AwsSolutions-S1",
            NagRule::S5 => "AwsSolutions-S5",
            NagRule::Iam5 => "AwsSolutions-IAM5",
            NagRule::Iam4 => "AwsSolutions-IAM4",
        }
    }
}

impl std::fmt::Display for NagRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

impl Serialize for NagRule {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.id())
    }
}

/// An accepted finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suppression {
    #[serde(rename = "id")]
    pub rule: NagRule,
    pub reason: &'static str,
}

/// Rule packs applied to every construct in the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "name")]
pub enum Aspect {
    AwsSolutionsChecks { verbose: bool },
}

/// Aspects plus stack-wide suppressions
#[derive(Debug, Clone, Default)]
pub struct Compliance {
    aspects: Vec<Aspect>,
    suppressions: Vec<Suppression>,
}

impl Compliance {
    /// AWS Solutions checks with the MWAA stack's accepted findings
    pub fn mwaa_stack() -> Self {
        Self::default()
            .with_aspect(Aspect::AwsSolutionsChecks { verbose: true })
            .suppress(NagRule::S1, "Logs are disabled for demo purposes")
            .suppress(
                NagRule::S5,
                "No OAI needed - no one is accessing this data without explicit permissions",
            )
            .suppress(NagRule::Iam5, "Resource access restriced to IDF resources")
            .suppress(NagRule::Iam4, "Managed Policies are for service account roles only")
    }

    pub fn with_aspect(mut self, aspect: Aspect) -> Self {
        self.aspects.push(aspect);
        self
    }

    /// Record a suppression; a second one for the same rule replaces the first
    pub fn suppress(mut self, rule: NagRule, reason: &'static str) -> Self {
        self.suppressions.retain(|s| s.rule != rule);
        self.suppressions.push(Suppression { rule, reason });
        self
    }

    pub fn aspects(&self) -> &[Aspect] {
        &self.aspects
    }

    pub fn suppressions(&self) -> &[Suppression] {
        &self.suppressions
    }

    pub fn is_suppressed(&self, rule: NagRule) -> bool {
        self.suppressions.iter().any(|s| s.rule == rule)
    }

    pub fn declare(&self, template: &mut Template) {
        template.add_metadata(
            METADATA_KEY,
            json!({
                "aspects": self.aspects,
                "rules_to_suppress": self.suppressions
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mwaa_suppressions() {
        let compliance = Compliance::mwaa_stack();
        let ids: Vec<_> = compliance.suppressions().iter().map(|s| s.rule.id()).collect();
        assert_eq!(
            ids,
            ["AwsSolutions-S1", "AwsSolutions-S5", "AwsSolutions-IAM5", "AwsSolutions-IAM4"]
        );
        assert!(compliance.suppressions().iter().all(|s| !s.reason.is_empty()));
        assert_eq!(
            compliance.aspects(),
            [Aspect::AwsSolutionsChecks { verbose: true }]
        );
    }

    #[test]
    fn test_suppress_replaces_existing_reason() {
        let compliance = Compliance::default()
            .suppress(NagRule::Iam5, "first")
            .suppress(NagRule::Iam5, "second");
        assert_eq!(compliance.suppressions().len(), 1);
        assert_eq!(compliance.suppressions()[0].reason, "second");
        assert!(compliance.is_suppressed(NagRule::Iam5));
        assert!(!compliance.is_suppressed(NagRule::S1));
    }

    #[test]
    fn test_declare_metadata() {
        let mut template = Template::new("t");
        Compliance::mwaa_stack().declare(&mut template);

        let metadata = &template.to_value()["Metadata"][METADATA_KEY];
        assert_eq!(
            metadata["rules_to_suppress"][2],
            json!({ "id": "AwsSolutions-IAM5", "reason": "Resource access restriced to IDF resources" })
        );
        assert_eq!(
            metadata["aspects"][0],
            json!({ "name": "AwsSolutionsChecks", "verbose": true })
        );
    }
}
