//! Suggestion clients for the completion backends

pub mod client;
pub mod client_impl;
pub mod factory;

pub use client::{LlmClient, MockLlmClient};
