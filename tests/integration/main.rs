//! Integration tests for Ticket-Sync
//!
//! These tests run whole invocations against a wiremock Jira server and
//! in-memory or SQLite-backed collaborators.

mod local_backends;
mod scenarios;
mod support;
mod watermark_filter;
