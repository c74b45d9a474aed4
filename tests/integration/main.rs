//! Integration tests for Job-Sift
//!
//! These tests use wiremock to serve job-board pages and run the full
//! scrape, deduplicate and store cycle end-to-end.

mod scrape_tests;
