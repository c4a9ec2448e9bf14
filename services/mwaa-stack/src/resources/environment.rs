//! MWAA environment declaration

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::network::NetworkConfiguration;
use crate::template::{get_att, logical_id, Template};

pub const ENVIRONMENT_ID: &str = "mwaa-environment";

/// Key of the plugins archive inside the DAG bucket
pub const PLUGINS_S3_PATH: &str = "plugins/plugins.zip";

/// Airflow log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Critical,
    Error,
    Warning,
    #[default]
    Info,
    Debug,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModuleLogging {
    pub enabled: bool,
    pub log_level: LogLevel,
}

impl ModuleLogging {
    pub fn enabled(log_level: LogLevel) -> Self {
        Self {
            enabled: true,
            log_level,
        }
    }
}

/// Logging for the five Airflow log channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoggingConfiguration {
    pub task_logs: ModuleLogging,
    pub worker_logs: ModuleLogging,
    pub scheduler_logs: ModuleLogging,
    pub dag_processing_logs: ModuleLogging,
    pub webserver_logs: ModuleLogging,
}

impl LoggingConfiguration {
    /// Every channel enabled at `log_level`
    pub fn all(log_level: LogLevel) -> Self {
        let channel = ModuleLogging::enabled(log_level);
        Self {
            task_logs: channel,
            worker_logs: channel,
            scheduler_logs: channel,
            dag_processing_logs: channel,
            webserver_logs: channel,
        }
    }

    pub fn channels(&self) -> [ModuleLogging; 5] {
        [
            self.task_logs,
            self.worker_logs,
            self.scheduler_logs,
            self.dag_processing_logs,
            self.webserver_logs,
        ]
    }
}

impl Default for LoggingConfiguration {
    fn default() -> Self {
        Self::all(LogLevel::Info)
    }
}

/// Who can reach the Airflow web server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WebserverAccessMode {
    #[default]
    PublicOnly,
    PrivateOnly,
}

/// Properties of the `AWS::MWAA::Environment` resource
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EnvironmentProperties {
    pub name: String,
    pub airflow_version: String,
    pub environment_class: String,
    pub max_workers: u32,
    #[serde(rename = "DagS3Path")]
    pub dag_s3_path: String,
    #[serde(rename = "PluginsS3Path")]
    pub plugins_s3_path: String,
    #[serde(rename = "RequirementsS3Path")]
    pub requirements_s3_path: String,
    pub source_bucket_arn: String,
    pub execution_role_arn: Value,
    pub logging_configuration: LoggingConfiguration,
    pub network_configuration: NetworkConfiguration,
    pub webserver_access_mode: WebserverAccessMode,
}

/// The managed Airflow environment and its creation-order dependencies
#[derive(Debug, Clone)]
pub struct MwaaEnvironment {
    properties: EnvironmentProperties,
    depends_on: Vec<String>,
}

impl MwaaEnvironment {
    pub fn new(properties: EnvironmentProperties) -> Self {
        Self {
            properties,
            depends_on: Vec::new(),
        }
    }

    /// Role ARN value for `execution_role_arn`
    pub fn role_arn(role_logical_id: &str) -> Value {
        get_att(role_logical_id, "Arn")
    }

    /// Require `logical_id` to be created first. Repeats are ignored.
    pub fn add_dependency(&mut self, logical_id: impl Into<String>) {
        let logical_id = logical_id.into();
        if !self.depends_on.contains(&logical_id) {
            debug!(dependency = %logical_id, "Environment dependency added");
            self.depends_on.push(logical_id);
        }
    }

    pub fn dependencies(&self) -> &[String] {
        &self.depends_on
    }

    pub fn properties(&self) -> &EnvironmentProperties {
        &self.properties
    }

    pub fn name(&self) -> &str {
        &self.properties.name
    }

    pub fn logical_id(&self) -> String {
        logical_id(ENVIRONMENT_ID)
    }

    pub fn declare(&self, template: &mut Template) {
        let mut properties = json!(self.properties);
        properties["Tags"] = template.tag_map();

        template.add_resource(
            self.logical_id(),
            json!({
                "Type": "AWS::MWAA::Environment",
                "Properties": properties,
                "DependsOn": self.depends_on
            }),
        );
    }
}
