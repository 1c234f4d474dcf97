//! Integration tests for Finsight-Crawl
//!
//! HTTP-facing pieces run against wiremock servers; exploration and
//! extraction run against in-process test doubles.

mod browser_tests;
mod llm_tests;
mod pipeline_tests;
mod property_tests;
