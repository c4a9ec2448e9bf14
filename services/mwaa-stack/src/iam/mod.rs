//! IAM model for the MWAA stack
//!
//! - `arn`: typed ARN patterns shared by every statement
//! - `policy`: statements, conditions and documents (IAM JSON)
//! - `role`: service role with its build-then-finalize lifecycle
//! - `mwaa_permissions`: the execution role's statement catalogue

pub mod arn;
pub mod mwaa_permissions;
pub mod policy;
pub mod role;

pub use arn::ArnPattern;
pub use mwaa_permissions::MwaaPermissions;
pub use policy::{ConditionOperator, Effect, PolicyDocument, PolicyStatement, Principal};
pub use role::{FinalizedRole, ManagedPolicy, Role};
