//! End-to-end tests.
//!
//! These drive [`crate::LlmAdapter`] against wiremock servers standing in
//! for real providers.
