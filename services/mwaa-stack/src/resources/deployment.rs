//! Bucket deployments
//!
//! Copies a staged asset from the assets bucket into a prefix of the DAG
//! bucket through the bucket-deployment custom resource.

use serde_json::json;

use super::asset::Asset;
use super::bucket::DagBucket;
use crate::template::{logical_id, reference, Template};

/// Template parameter naming the bucket staged assets are published to
pub const ASSETS_BUCKET_PARAMETER: &str = "AssetsBucketName";

/// Template parameter holding the bucket-deployment handler ARN
pub const SERVICE_TOKEN_PARAMETER: &str = "BucketDeploymentServiceToken";

/// Declare the parameters every bucket deployment relies on
pub fn declare_parameters(template: &mut Template) {
    template.add_parameter(
        ASSETS_BUCKET_PARAMETER,
        json!({
            "Type": "String",
            "Description": "Bucket holding the staged asset archives"
        }),
    );
    template.add_parameter(
        SERVICE_TOKEN_PARAMETER,
        json!({
            "Type": "String",
            "Description": "ARN of the bucket deployment handler function"
        }),
    );
}

/// Upload of one asset into a key prefix of the DAG bucket
#[derive(Debug, Clone)]
pub struct BucketDeployment {
    construct_id: String,
    asset: Asset,
    destination_key_prefix: String,
}

impl BucketDeployment {
    pub fn new(
        construct_id: impl Into<String>,
        asset: Asset,
        destination_key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            construct_id: construct_id.into(),
            asset,
            destination_key_prefix: destination_key_prefix.into(),
        }
    }

    pub fn logical_id(&self) -> String {
        logical_id(&self.construct_id)
    }

    pub fn asset(&self) -> &Asset {
        &self.asset
    }

    pub fn destination_key_prefix(&self) -> &str {
        &self.destination_key_prefix
    }

    pub fn declare(&self, bucket: &DagBucket, template: &mut Template) {
        template.add_resource(
            self.logical_id(),
            json!({
                "Type": "Custom::CDKBucketDeployment",
                "Properties": {
                    "ServiceToken": reference(SERVICE_TOKEN_PARAMETER),
                    "SourceBucketNames": [reference(ASSETS_BUCKET_PARAMETER)],
                    "SourceObjectKeys": [self.asset.object_key()],
                    "DestinationBucketName": bucket.name_value(),
                    "DestinationBucketKeyPrefix": self.destination_key_prefix,
                    "Prune": true
                },
                "DeletionPolicy": "Delete",
                "UpdateReplacePolicy": "Delete"
            }),
        );
    }
}
