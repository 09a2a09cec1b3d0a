// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors
//

use crate::message::StreamFilterByKind;
use rtnetlink::packet_route::link::{InfoKind, LinkMessage};
use rtnetlink::{Handle, LinkBridge};
