//! Integration tests for the collection engine
//!
//! These tests use wiremock to stand in for real listing endpoints and
//! exercise the full fetch, extract, merge cycle end-to-end.

mod collect_tests;
