//! Errors raised while declaring or synthesizing the stack
//!
//! Deployment-time failures (bad ARNs, policy size limits, subnet validity)
//! belong to CloudFormation. Only what this crate can observe locally is
//! modelled here.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while building the MWAA stack
#[derive(Debug, Error)]
pub enum StackError {
    /// A templated resource name exceeds the service limit
    #[error("{kind} name '{name}' is {len} characters, limit is {limit}")]
    NameTooLong {
        kind: &'static str,
        name: String,
        len: usize,
        limit: usize,
    },

    /// An asset directory could not be staged
    #[error("Failed to stage asset {path}: {source}")]
    Asset {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Template encoding failed
    #[error("Template serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StackResult<T> = Result<T, StackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_too_long_display() {
        let err = StackError::NameTooLong {
            kind: "Environment",
            name: "abc".to_string(),
            len: 3,
            limit: 2,
        };
        assert_eq!(
            err.to_string(),
            "Environment name 'abc' is 3 characters, limit is 2"
        );
    }
}
