//! MWAA Stack Library
//!
//! Declares a managed Airflow (MWAA) environment, its DAG bucket, network
//! and execution role, and renders them as a CloudFormation template.

pub mod compliance;
pub mod context;
pub mod error;
pub mod iam;
pub mod resources;
pub mod stack;
pub mod template;

pub use context::{DeploymentContext, Partition};
pub use error::{StackError, StackResult};
pub use iam::MwaaPermissions;
pub use stack::{MwaaStack, StackProps};
pub use template::Template;
