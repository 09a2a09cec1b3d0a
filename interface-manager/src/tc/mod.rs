// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![doc = include_str!("README.md")]

pub mod action;
pub mod block;
pub mod chain;
pub mod filter;
pub mod qdisc;
