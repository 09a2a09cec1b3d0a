// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use k8s_types::gateway_agent_crd::GatewayAgentStatusStateFrr;

use crate::converters::k8s::ToK8sConversionError;
use crate::internal::status::FrrStatus;

impl TryFrom<&FrrStatus> for GatewayAgentStatusStateFrr {
    type Error = ToK8sConversionError;

    fn try_from(status: &FrrStatus) -> Result<Self, Self::Error> {
        Ok(GatewayAgentStatusStateFrr {
            last_applied_gen: Some(status.applied_config_gen),
        })
    }
}
