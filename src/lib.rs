//! bumpfix - upgrade a Node.js project's dependencies and explain what broke
//!
//! Runs the package manager to bring every outdated dependency to its latest
//! release, rebuilds the project, parses the compiler errors out of a failing
//! build and asks a completion backend (Gemini, OpenAI, or a local
//! OpenAI-compatible model server) how to fix each one.

pub mod build;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod process;
pub mod prompt;
pub mod report;
pub mod snippet;
pub mod upgrade;
pub mod util;
