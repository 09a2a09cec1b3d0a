// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use std::convert::TryFrom;

use k8s_intf::gateway_agent_crd::{
    GatewayAgentPeeringsPeeringExpose, GatewayAgentPeeringsPeeringExposeAs,
    GatewayAgentPeeringsPeeringExposeIps,
};
use lpm::prefix::{Prefix, PrefixString};

use crate::converters::k8s::{FromK8sConversionError, SubnetMap};
use crate::external::overlay::vpcpeering::VpcExpose;

fn process_ip_block(
    vpc_expose: VpcExpose,
    ip: &GatewayAgentPeeringsPeeringExposeIps,
    subnets: &SubnetMap,
) -> Result<VpcExpose, FromK8sConversionError> {
    Ok(match (&ip.cidr, &ip.vpc_subnet, &ip.not) {
        (None, None, None) => {
            return Err(FromK8sConversionError::MissingData(
                "Expose ip object must specify subnet, cidr, or not".to_string(),
            ));
        }
        (Some(_), None, Some(_)) => {
            return Err(FromK8sConversionError::Invalid(
                "Expose ip block must specify either cidr or not, not both".to_string(),
            ));
        }
        (None, Some(_), Some(_)) => {
            return Err(FromK8sConversionError::Invalid(
                "Expose ip block must specify either subnet or not, not both".to_string(),
            ));
        }
        (Some(_), Some(_), None) => {
            return Err(FromK8sConversionError::Invalid(
                "Expose ip block must specify either subnet or cidr, not both".to_string(),
            ));
        }
        (Some(_), Some(_), Some(_)) => {
            return Err(FromK8sConversionError::Invalid(
                "Expose ip block must specify either subnet, cidr, or not, not all three"
                    .to_string(),
            ));
        }
        (None, Some(subnet_name), None) => {
            let prefix = subnets.get(subnet_name.as_str()).ok_or_else(|| {
                FromK8sConversionError::Invalid(format!(
                    "Expose references unknown VPC subnet {subnet_name}"
                ))
            })?;
            vpc_expose.ip(*prefix)
        }
        (Some(cidr), None, None) => {
            let prefix = cidr.parse::<Prefix>().map_err(|e| {
                FromK8sConversionError::ParseError(format!("Invalid CIDR format: {cidr}: {e}"))
            })?;
            vpc_expose.ip(prefix)
        }
        (None, None, Some(not)) => {
            let prefix = Prefix::try_from(PrefixString(not.as_str())).map_err(|e| {
                FromK8sConversionError::Invalid(format!("Invalid CIDR format: {not}: {e}"))
            })?;
            vpc_expose.not(prefix)
        }
    })
}

fn process_as_block(
    vpc_expose: VpcExpose,
    ip: &GatewayAgentPeeringsPeeringExposeAs,
) -> Result<VpcExpose, FromK8sConversionError> {
    Ok(match (&ip.cidr, &ip.not) {
        (None, None) => {
            return Err(FromK8sConversionError::MissingData(
                "Expose as object must specify cidr or not".to_string(),
            ));
        }
        (Some(_), Some(_)) => {
            return Err(FromK8sConversionError::Invalid(
                "Expose as block must specify either cidr or not, not both".to_string(),
            ));
        }
        (Some(cidr), None) => {
            let prefix = cidr.parse::<Prefix>().map_err(|e| {
                FromK8sConversionError::ParseError(format!("Invalid CIDR format: {cidr}: {e}"))
            })?;
            vpc_expose.as_range(prefix)
        }
        (None, Some(not)) => {
            let prefix = Prefix::try_from(PrefixString(not.as_str())).map_err(|e| {
                FromK8sConversionError::Invalid(format!("Invalid CIDR format: {not}: {e}"))
            })?;
            vpc_expose.not_as(prefix)
        }
    })
}

impl TryFrom<(&SubnetMap, &GatewayAgentPeeringsPeeringExpose)> for VpcExpose {
    type Error = FromK8sConversionError;

    fn try_from(
        (subnets, expose): (&SubnetMap, &GatewayAgentPeeringsPeeringExpose),
    ) -> Result<Self, Self::Error> {
        let mut vpc_expose = VpcExpose::empty();

        // Process PeeringIP rules
        if let Some(ips) = expose.ips.as_ref() {
            if ips.is_empty() {
                return Err(FromK8sConversionError::MissingData(
                    "Expose must expose something, ips block is empty vector".to_string(),
                ));
            }
            for ip in ips {
                vpc_expose = process_ip_block(vpc_expose, ip, subnets)?;
            }
        } else {
            return Err(FromK8sConversionError::MissingData(
                "Expose must expose some IPs, ips block is missing".to_string(),
            ));
        }

        if let Some(ases) = expose.r#as.as_ref() {
            for r#as in ases {
                vpc_expose = process_as_block(vpc_expose, r#as)?;
            }
        }

        Ok(vpc_expose)
    }
}
