//! E2E test scenarios.

mod degraded_stages;
mod happy_path;
mod registry_properties;
mod scan_failure;
mod timeout_notice;
