//! Resource declarations handed to CloudFormation
//!
//! Each type knows its logical id and how to add itself to a [`Template`].
//!
//! [`Template`]: crate::template::Template

pub mod asset;
pub mod bucket;
pub mod deployment;
pub mod environment;
pub mod network;

pub use asset::Asset;
pub use bucket::DagBucket;
pub use deployment::BucketDeployment;
pub use environment::{
    EnvironmentProperties, LogLevel, LoggingConfiguration, MwaaEnvironment, WebserverAccessMode,
};
pub use network::{NetworkConfiguration, SecurityGroup};
