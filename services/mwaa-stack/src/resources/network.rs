//! Network plumbing for the environment

use serde::Serialize;
use serde_json::{json, Value};

use crate::template::{get_att, logical_id, Template};

pub const SECURITY_GROUP_ID: &str = "mwaa-sg";

/// Number of private subnets MWAA is placed in
pub const ENVIRONMENT_SUBNET_COUNT: usize = 2;

/// Security group with open egress that allows all traffic between members
#[derive(Debug, Clone)]
pub struct SecurityGroup {
    vpc_id: String,
    internal_description: String,
}

impl SecurityGroup {
    pub fn new(vpc_id: impl Into<String>) -> Self {
        Self {
            vpc_id: vpc_id.into(),
            internal_description: "MWAA".to_string(),
        }
    }

    pub fn vpc_id(&self) -> &str {
        &self.vpc_id
    }

    pub fn logical_id(&self) -> String {
        logical_id(SECURITY_GROUP_ID)
    }

    pub fn group_id(&self) -> Value {
        get_att(&self.logical_id(), "GroupId")
    }

    pub fn declare(&self, template: &mut Template) {
        let id = self.logical_id();

        template.add_resource(
            id.clone(),
            json!({
                "Type": "AWS::EC2::SecurityGroup",
                "Properties": {
                    "GroupDescription": format!("{} security group", self.internal_description),
                    "VpcId": self.vpc_id,
                    "SecurityGroupEgress": [{
                        "CidrIp": "0.0.0.0/0",
                        "Description": "Allow all outbound traffic by default",
                        "IpProtocol": "-1"
                    }],
                    "Tags": template.tag_list()
                }
            }),
        );

        template.add_resource(
            format!("{id}IngressAllTraffic"),
            json!({
                "Type": "AWS::EC2::SecurityGroupIngress",
                "Properties": {
                    "IpProtocol": "-1",
                    "Description": self.internal_description,
                    "GroupId": self.group_id(),
                    "SourceSecurityGroupId": self.group_id()
                }
            }),
        );
    }
}

/// `NetworkConfiguration` of the MWAA environment
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkConfiguration {
    pub security_group_ids: Vec<Value>,
    pub subnet_ids: Vec<String>,
}

impl NetworkConfiguration {
    /// Place the environment in the first two private subnets
    pub fn new(security_group: &SecurityGroup, private_subnet_ids: &[String]) -> Self {
        Self {
            security_group_ids: vec![security_group.group_id()],
            subnet_ids: private_subnet_ids
                .iter()
                .take(ENVIRONMENT_SUBNET_COUNT)
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_group_allows_internal_traffic() {
        let sg = SecurityGroup::new("vpc-123");
        let mut template = Template::new("t");
        sg.declare(&mut template);

        let group = &template.resource("MwaaSg").unwrap()["Properties"];
        assert_eq!(group["VpcId"], "vpc-123");
        assert_eq!(group["SecurityGroupEgress"][0]["IpProtocol"], "-1");

        let ingress = &template.resource("MwaaSgIngressAllTraffic").unwrap()["Properties"];
        assert_eq!(ingress["IpProtocol"], "-1");
        assert_eq!(ingress["Description"], "MWAA");
        assert_eq!(ingress["GroupId"], ingress["SourceSecurityGroupId"]);
    }

    #[test]
    fn test_network_configuration_uses_first_two_subnets() {
        let sg = SecurityGroup::new("vpc-123");
        let subnets = vec![
            "subnet-a".to_string(),
            "subnet-b".to_string(),
            "subnet-c".to_string(),
        ];

        let network = NetworkConfiguration::new(&sg, &subnets);
        assert_eq!(network.subnet_ids, vec!["subnet-a", "subnet-b"]);
        assert_eq!(
            serde_json::to_value(&network).unwrap(),
            json!({
                "SecurityGroupIds": [{ "Fn::GetAtt": ["MwaaSg", "GroupId"] }],
                "SubnetIds": ["subnet-a", "subnet-b"]
            })
        );

        let single = NetworkConfiguration::new(&sg, &subnets[..1]);
        assert_eq!(single.subnet_ids, vec!["subnet-a"]);
    }
}
