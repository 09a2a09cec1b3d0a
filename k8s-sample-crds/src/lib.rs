// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Tiny crate to automatically generate JSON/YAML CRD templates
//! These are mostly for manual testing.
