//! IAM policy model
//!
//! Statements and documents serialize to the IAM JSON grammar. Single-item
//! action and resource lists are written as a bare string.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// IAM policy language version
pub const POLICY_VERSION: &str = "2012-10-17";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Effect {
    #[default]
    Allow,
    Deny,
}

/// Condition operators used by this stack's statements
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConditionOperator {
    StringEquals,
    StringNotEquals,
    StringLike,
    StringNotLike,
    Bool,
}

impl ConditionOperator {
    /// Whether `value` satisfies `pattern` under this operator
    pub fn matches(&self, pattern: &str, value: &str) -> bool {
        match self {
            ConditionOperator::StringEquals => pattern == value,
            ConditionOperator::StringNotEquals => pattern != value,
            ConditionOperator::StringLike => glob_match(pattern, value),
            ConditionOperator::StringNotLike => !glob_match(pattern, value),
            ConditionOperator::Bool => pattern.eq_ignore_ascii_case(value),
        }
    }
}

/// IAM `StringLike` wildcard match: `*` any run, `?` any single character
fn glob_match(pattern: &str, value: &str) -> bool {
    if pattern == "*" {
        return true;
    }

    let pattern: Vec<char> = pattern.chars().collect();
    let value: Vec<char> = value.chars().collect();
    let (mut p_idx, mut v_idx) = (0usize, 0usize);
    let (mut star_idx, mut match_idx) = (None, 0usize);

    while v_idx < value.len() {
        if p_idx < pattern.len() && pattern[p_idx] == '*' {
            star_idx = Some(p_idx);
            match_idx = v_idx;
            p_idx += 1;
            continue;
        }

        if p_idx < pattern.len() && (pattern[p_idx] == '?' || pattern[p_idx] == value[v_idx]) {
            p_idx += 1;
            v_idx += 1;
            continue;
        }

        if let Some(star) = star_idx {
            p_idx = star + 1;
            match_idx += 1;
            v_idx = match_idx;
            continue;
        }

        return false;
    }

    while p_idx < pattern.len() && pattern[p_idx] == '*' {
        p_idx += 1;
    }

    p_idx == pattern.len()
}

/// Operator -> (condition key -> value)
pub type Conditions = BTreeMap<ConditionOperator, BTreeMap<String, String>>;

/// Principal of a trust or resource policy statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// `{"Service": [...]}`
    Service(Vec<String>),
    /// `{"AWS": "*"}`
    Anyone,
}

impl Serialize for Principal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Principal::Service(services) => match services.as_slice() {
                [single] => map.serialize_entry("Service", single)?,
                _ => map.serialize_entry("Service", services)?,
            },
            Principal::Anyone => map.serialize_entry("AWS", "*")?,
        }
        map.end()
    }
}

fn one_or_many<S: Serializer>(values: &[String], serializer: S) -> Result<S::Ok, S::Error> {
    match values {
        [single] => serializer.serialize_str(single),
        _ => values.serialize(serializer),
    }
}

/// A single IAM policy statement
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PolicyStatement {
    #[serde(rename = "Effect")]
    pub effect: Effect,
    #[serde(rename = "Principal", skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,
    #[serde(rename = "Action", serialize_with = "one_or_many")]
    pub actions: Vec<String>,
    #[serde(
        rename = "Resource",
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "one_or_many"
    )]
    pub resources: Vec<String>,
    #[serde(
        rename = "NotResource",
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "one_or_many"
    )]
    pub not_resources: Vec<String>,
    #[serde(rename = "Condition", skip_serializing_if = "BTreeMap::is_empty")]
    pub conditions: Conditions,
}

impl PolicyStatement {
    pub fn allow() -> Self {
        Self::default()
    }

    pub fn deny() -> Self {
        Self {
            effect: Effect::Deny,
            ..Self::default()
        }
    }

    pub fn principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions.extend(actions.into_iter().map(Into::into));
        self
    }

    pub fn resources<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resources.extend(resources.into_iter().map(Into::into));
        self
    }

    pub fn not_resources<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.not_resources
            .extend(resources.into_iter().map(Into::into));
        self
    }

    pub fn condition(
        mut self,
        operator: ConditionOperator,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.conditions
            .entry(operator)
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    /// Has actions and targets resources through exactly one of
    /// `Resource`/`NotResource`
    pub fn is_well_formed(&self) -> bool {
        !self.actions.is_empty() && (self.resources.is_empty() != self.not_resources.is_empty())
    }

    pub fn grants(&self, action: &str) -> bool {
        self.actions.iter().any(|a| a == action)
    }

    /// Whether every condition on `key` is satisfied by `value`.
    /// Conditions on other keys are ignored.
    pub fn condition_matches(&self, key: &str, value: &str) -> bool {
        self.conditions.iter().all(|(operator, entries)| {
            entries
                .get(key)
                .map_or(true, |pattern| operator.matches(pattern, value))
        })
    }
}

/// An ordered list of statements
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PolicyDocument {
    statements: Vec<PolicyStatement>,
}

impl PolicyDocument {
    pub fn new(statements: Vec<PolicyStatement>) -> Self {
        Self { statements }
    }

    pub fn add_statement(&mut self, statement: PolicyStatement) {
        self.statements.push(statement);
    }

    pub fn statements(&self) -> &[PolicyStatement] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Statements granting `action`
    pub fn statements_granting<'a>(
        &'a self,
        action: &'a str,
    ) -> impl Iterator<Item = &'a PolicyStatement> + 'a {
        self.statements.iter().filter(move |s| s.grants(action))
    }

    /// Concatenate with another document, keeping order
    pub fn merged(&self, other: &PolicyDocument) -> PolicyDocument {
        let mut statements = self.statements.clone();
        statements.extend(other.statements.iter().cloned());
        PolicyDocument { statements }
    }
}

impl Serialize for PolicyDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("Version", POLICY_VERSION)?;
        map.serialize_entry("Statement", &self.statements)?;
        map.end()
    }
}
