//! Stack input properties

use crate::resources::{Asset, LoggingConfiguration, WebserverAccessMode};

pub const DEFAULT_DAG_PATH: &str = "dags";
pub const DEFAULT_ENVIRONMENT_CLASS: &str = "mw1.small";
pub const DEFAULT_MAX_WORKERS: u32 = 25;

/// Inputs of the MWAA stack
#[derive(Debug, Clone)]
pub struct StackProps {
    pub vpc_id: String,
    /// Only the first two are used
    pub private_subnet_ids: Vec<String>,
    /// Existing bucket to use instead of creating one
    pub dag_bucket_name: Option<String>,
    pub dag_path: String,
    pub environment_class: String,
    pub airflow_version: String,
    pub max_workers: u32,
    /// Key of the requirements file inside the DAG bucket
    pub unique_requirements_file: String,
    pub stack_description: String,
    /// Directory uploaded under `plugins/`
    pub plugins: Asset,
    /// Directory uploaded under `requirements/`
    pub requirements: Asset,
    pub logging: LoggingConfiguration,
    pub webserver_access_mode: WebserverAccessMode,
}

impl StackProps {
    /// Required inputs; everything else takes its default
    pub fn new(
        vpc_id: impl Into<String>,
        private_subnet_ids: Vec<String>,
        airflow_version: impl Into<String>,
        unique_requirements_file: impl Into<String>,
        stack_description: impl Into<String>,
        plugins: Asset,
        requirements: Asset,
    ) -> Self {
        Self {
            vpc_id: vpc_id.into(),
            private_subnet_ids,
            dag_bucket_name: None,
            dag_path: DEFAULT_DAG_PATH.to_string(),
            environment_class: DEFAULT_ENVIRONMENT_CLASS.to_string(),
            airflow_version: airflow_version.into(),
            max_workers: DEFAULT_MAX_WORKERS,
            unique_requirements_file: unique_requirements_file.into(),
            stack_description: stack_description.into(),
            plugins,
            requirements,
            logging: LoggingConfiguration::default(),
            webserver_access_mode: WebserverAccessMode::default(),
        }
    }

    pub fn with_dag_bucket_name(mut self, name: Option<String>) -> Self {
        self.dag_bucket_name = name.filter(|n| !n.is_empty());
        self
    }

    pub fn with_dag_path(mut self, dag_path: impl Into<String>) -> Self {
        self.dag_path = dag_path.into();
        self
    }

    pub fn with_environment_class(mut self, environment_class: impl Into<String>) -> Self {
        self.environment_class = environment_class.into();
        self
    }

    pub fn with_max_workers(mut self, max_workers: u32) -> Self {
        self.max_workers = max_workers;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props() -> StackProps {
        StackProps::new(
            "vpc-1",
            vec!["subnet-a".to_string(), "subnet-b".to_string()],
            "2.5.1",
            "requirements/requirements.txt",
            "MWAA stack",
            Asset::prestaged("plugins", "aa"),
            Asset::prestaged("requirements", "bb"),
        )
    }

    #[test]
    fn test_defaults() {
        let props = props();
        assert_eq!(props.dag_path, "dags");
        assert_eq!(props.environment_class, "mw1.small");
        assert_eq!(props.max_workers, 25);
        assert!(props.dag_bucket_name.is_none());
        assert_eq!(props.webserver_access_mode, WebserverAccessMode::PublicOnly);
    }

    #[test]
    fn test_builder_overrides() {
        let props = props()
            .with_dag_bucket_name(Some("shared".to_string()))
            .with_dag_path("airflow/dags")
            .with_environment_class("mw1.medium")
            .with_max_workers(10);
        assert_eq!(props.dag_bucket_name.as_deref(), Some("shared"));
        assert_eq!(props.dag_path, "airflow/dags");
        assert_eq!(props.environment_class, "mw1.medium");
        assert_eq!(props.max_workers, 10);
    }

    #[test]
    fn test_empty_bucket_name_means_create() {
        let props = props().with_dag_bucket_name(Some(String::new()));
        assert!(props.dag_bucket_name.is_none());
    }
}
