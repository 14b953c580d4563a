//! Feature flag evaluation service.
//!
//! Flags are fetched from a [`store::FlagStore`], validated, and resolved to a
//! typed value by [`evaluation::FlagEvaluator`], using a JSON Logic targeting
//! rule when the flag has one and the caller supplies context.

pub mod config;
pub mod evaluation;
pub mod routes;
pub mod rules;
pub mod state;
pub mod store;
