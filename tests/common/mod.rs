//! Common test utilities

#![allow(dead_code)]

pub mod liquid_check_mock;
pub mod test_fixtures;
