//! Integration test harness.

mod github_api_tests;
mod sync_flow_tests;
