// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use std::convert::TryFrom;

use k8s_intf::gateway_agent_crd::{
    GatewayAgentPeeringsPeeringExpose, GatewayAgentPeeringsPeeringExposeAs,
    GatewayAgentPeeringsPeeringExposeIps, GatewayAgentPeeringsPeeringExposeNat,
    GatewayAgentPeeringsPeeringExposeNatPortForwardPortsProto,
};
use lpm::prefix::{L4Protocol, PortRange, Prefix, PrefixString, PrefixWithOptionalPorts};

use crate::converters::k8s::FromK8sConversionError;
use crate::converters::k8s::config::SubnetMap;
use crate::external::overlay::vpcpeering::VpcExpose;

fn parse_port_ranges(ports_str: &str) -> Result<Vec<PortRange>, FromK8sConversionError> {
    ports_str
        // Split port ranges for prefix on ','
        .split(',')
        .map(|port_range_str| {
            port_range_str.trim().parse::<PortRange>().map_err(|e| {
                FromK8sConversionError::InvalidData(format!("port range {port_range_str}: {e}"))
            })
        })
        .collect()
}

fn process_ip_block(
    mut vpc_expose: VpcExpose,
    ip: &GatewayAgentPeeringsPeeringExposeIps,
    subnets: &SubnetMap,
) -> Result<VpcExpose, FromK8sConversionError> {
    match (&ip.cidr, &ip.vpc_subnet, &ip.not) {
        (None, None, None) => {
            return Err(FromK8sConversionError::MissingData(
                "Expose ip object must specify subnet, cidr, or not".to_string(),
            ));
        }
        (Some(_), None, Some(_)) => {
            return Err(FromK8sConversionError::NotAllowed(
                "Expose ip block must specify either cidr or not, not both".to_string(),
            ));
        }
        (None, Some(_), Some(_)) => {
            return Err(FromK8sConversionError::NotAllowed(
                "Expose ip block must specify either subnet or not, not both".to_string(),
            ));
        }
        (Some(_), Some(_), None) => {
            return Err(FromK8sConversionError::NotAllowed(
                "Expose ip block must specify either subnet or cidr, not both".to_string(),
            ));
        }
        (Some(_), Some(_), Some(_)) => {
            return Err(FromK8sConversionError::NotAllowed(
                "Expose ip block must specify either subnet, cidr, or not, not all three"
                    .to_string(),
            ));
        }
        (None, Some(subnet_name), None) => {
            let prefix = subnets.get(subnet_name.as_str()).ok_or_else(|| {
                FromK8sConversionError::NotAllowed(format!(
                    "Expose references unknown VPC subnet {subnet_name}"
                ))
            })?;
            vpc_expose = vpc_expose.ip(PrefixWithOptionalPorts::from(*prefix));
        }
        (Some(cidr), None, None) => {
            let prefix = cidr.parse::<Prefix>().map_err(|e| {
                FromK8sConversionError::InvalidData(format!("CIDR format: {cidr}: {e}"))
            })?;
            vpc_expose = vpc_expose.ip(PrefixWithOptionalPorts::from(prefix));
        }
        (None, None, Some(not)) => {
            let prefix = Prefix::try_from(PrefixString(not.as_str())).map_err(|e| {
                FromK8sConversionError::InvalidData(format!("CIDR format: {not}: {e}"))
            })?;
            vpc_expose = vpc_expose.not(PrefixWithOptionalPorts::from(prefix));
        }
    }
    Ok(vpc_expose)
}

fn process_as_block(
    mut vpc_expose: VpcExpose,
    ip: &GatewayAgentPeeringsPeeringExposeAs,
) -> Result<VpcExpose, FromK8sConversionError> {
    match (&ip.cidr, &ip.not) {
        (None, None) => {
            return Err(FromK8sConversionError::MissingData(
                "Expose as object must specify cidr or not".to_string(),
            ));
        }
        (Some(_), Some(_)) => {
            return Err(FromK8sConversionError::NotAllowed(
                "Expose as block must specify either cidr or not, not both".to_string(),
            ));
        }
        (Some(cidr), None) => {
            let prefix = cidr.parse::<Prefix>().map_err(|e| {
                FromK8sConversionError::InvalidData(format!("CIDR format: {cidr}: {e}"))
            })?;
            vpc_expose = vpc_expose.as_range(PrefixWithOptionalPorts::from(prefix));
        }
        (None, Some(not)) => {
            let prefix = Prefix::try_from(PrefixString(not.as_str())).map_err(|e| {
                FromK8sConversionError::InvalidData(format!("CIDR format: {not}: {e}"))
            })?;
            vpc_expose = vpc_expose.not_as(PrefixWithOptionalPorts::from(prefix));
        }
    }
    Ok(vpc_expose)
}

fn process_nat_block(
    vpc_expose: VpcExpose,
    nat: Option<&GatewayAgentPeeringsPeeringExposeNat>,
) -> Result<VpcExpose, FromK8sConversionError> {
    let Some(nat) = nat else {
        return Ok(vpc_expose);
    };
    match (&nat.masquerade, &nat.port_forward, &nat.r#static) {
        (Some(_), Some(_), _) | (Some(_), _, Some(_)) | (_, Some(_), Some(_)) => {
            Err(FromK8sConversionError::NotAllowed(
                "Cannot have multiple NAT modes configured on the same expose block".to_string(),
            ))
        }
        (Some(masquerade), None, None) => {
            let idle_timeout = masquerade.idle_timeout.map(std::time::Duration::from);
            vpc_expose
                .make_stateful_nat(idle_timeout)
                .map_err(|e| FromK8sConversionError::NotAllowed(e.to_string()))
        }
        (None, Some(port_forward), None) => {
            let idle_timeout = port_forward.idle_timeout.map(std::time::Duration::from);
            // Note: We'll need additional processing to handle port mapping rules, see
            // nat_expand_rules()
            vpc_expose
                .make_port_forwarding(idle_timeout)
                .map_err(|e| FromK8sConversionError::NotAllowed(e.to_string()))
        }
        (None, None, Some(_)) => vpc_expose
            .make_stateless_nat()
            .map_err(|e| FromK8sConversionError::NotAllowed(e.to_string())),
        (None, None, None) => Err(FromK8sConversionError::NotAllowed(
            "NAT config block must specify one NAT mode".to_string(),
        )),
    }
}

fn nat_expand_rules(
    vpc_expose: VpcExpose,
    nat: Option<&GatewayAgentPeeringsPeeringExposeNat>,
) -> Result<Vec<VpcExpose>, FromK8sConversionError> {
    // Only port forwarding needs some extra processing
    let Some(port_forward) = nat.and_then(|n| n.port_forward.as_ref()) else {
        return Ok(vec![vpc_expose]);
    };

    let Some(ports_vec) = port_forward.ports.as_ref() else {
        return Err(FromK8sConversionError::NotAllowed(
            "Port forward must specify ports".to_string(),
        ));
    };

    let port_range_rules = ports_vec.iter().try_fold(Vec::new(), |mut rules, ports| {
        let Some(port_string) = ports.port.as_ref() else {
            return Err(FromK8sConversionError::NotAllowed(
                "Port forward must specify a port".to_string(),
            ));
        };
        let Some(as_string) = ports.r#as.as_ref() else {
            return Err(FromK8sConversionError::NotAllowed(
                "Port forward must specify a port to map to".to_string(),
            ));
        };
        rules.push((
            parse_port_ranges(port_string)?,
            parse_port_ranges(as_string)?,
            ports.proto.as_ref(),
        ));
        Ok(rules)
    })?;

    set_port_ranges(&vpc_expose, port_range_rules)
}

fn set_port_ranges(
    vpc_expose: &VpcExpose,
    port_ranges_rules: Vec<(
        Vec<PortRange>,
        Vec<PortRange>,
        Option<&GatewayAgentPeeringsPeeringExposeNatPortForwardPortsProto>,
    )>,
) -> Result<Vec<VpcExpose>, FromK8sConversionError> {
    if port_ranges_rules.is_empty() {
        return Err(FromK8sConversionError::NotAllowed(
            "Port forward must specify at least one ports block".to_string(),
        ));
    }

    let mut vpc_exposes = Vec::new();
    for (orig_ranges, target_ranges, proto) in port_ranges_rules {
        let mut vpc_expose_clone = vpc_expose.clone();

        let nat = vpc_expose_clone
            .nat
            .as_mut()
            .unwrap_or_else(|| unreachable!());

        let orig_prefixes = vpc_expose_clone.ips.clone();
        let target_prefixes = nat.as_range.clone();

        for orig_prefix in &orig_prefixes {
            debug_assert!(orig_prefix.ports().is_none());
            for range in &orig_ranges {
                vpc_expose_clone.ips.insert(PrefixWithOptionalPorts::new(
                    orig_prefix.prefix(),
                    Some(*range),
                ));
            }
            vpc_expose_clone.ips.remove(orig_prefix);
        }

        for target_prefix in &target_prefixes {
            debug_assert!(target_prefix.ports().is_none());
            for range in &target_ranges {
                nat.as_range.insert(PrefixWithOptionalPorts::new(
                    target_prefix.prefix(),
                    Some(*range),
                ));
            }
            nat.as_range.remove(target_prefix);
        }

        nat.proto = match proto {
            Some(GatewayAgentPeeringsPeeringExposeNatPortForwardPortsProto::Tcp) => L4Protocol::Tcp,
            Some(GatewayAgentPeeringsPeeringExposeNatPortForwardPortsProto::Udp) => L4Protocol::Udp,
            Some(GatewayAgentPeeringsPeeringExposeNatPortForwardPortsProto::KopiumEmpty) | None => {
                L4Protocol::Any
            }
        };

        vpc_exposes.push(vpc_expose_clone);
    }

    Ok(vpc_exposes)
}

#[derive(Debug, Clone)]
pub(crate) struct VpcExposes(Vec<VpcExpose>);

impl VpcExposes {
    #[cfg(test)]
    fn get_single(self) -> Result<VpcExpose, FromK8sConversionError> {
        if self.0.len() != 1 {
            return Err(FromK8sConversionError::NotAllowed(
                "Expected exactly one VPC expose".to_owned(),
            ));
        }
        Ok(self.0.into_iter().next().unwrap())
    }
}

impl IntoIterator for VpcExposes {
    type Item = VpcExpose;
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl TryFrom<(&SubnetMap, &GatewayAgentPeeringsPeeringExpose)> for VpcExposes {
    type Error = FromK8sConversionError;

    fn try_from(
        (subnets, expose): (&SubnetMap, &GatewayAgentPeeringsPeeringExpose),
    ) -> Result<Self, Self::Error> {
        let mut vpc_expose = VpcExpose::empty();

        // check if it is a default expose
        vpc_expose.default = expose.default.unwrap_or(false);
        if vpc_expose.default {
            if expose.ips.as_ref().is_some_and(|ips| !ips.is_empty()) {
                return Err(FromK8sConversionError::NotAllowed(
                    "A Default expose can't contain prefixes".to_string(),
                ));
            }
            if expose.r#as.as_ref().is_some_and(|r#as| !r#as.is_empty()) {
                return Err(FromK8sConversionError::NotAllowed(
                    "A Default expose can't contain 'as' prefixes".to_string(),
                ));
            }
            return Ok(VpcExposes(vec![vpc_expose]));
        }

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

        vpc_expose = process_nat_block(vpc_expose, expose.nat.as_ref())?;

        if let Some(ases) = expose.r#as.as_ref() {
            for r#as in ases {
                vpc_expose = process_as_block(vpc_expose, r#as)?;
            }
        }

        let vpc_exposes = nat_expand_rules(vpc_expose, expose.nat.as_ref())?;

        Ok(VpcExposes(vpc_exposes))
    }
}
