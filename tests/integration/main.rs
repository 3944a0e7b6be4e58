//! Integration tests
//!
//! These tests use wiremock to stand in for the weather and region APIs and
//! exercise full runs end-to-end.

mod harvest_tests;
mod regions_tests;
