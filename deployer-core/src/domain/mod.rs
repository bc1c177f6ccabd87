//! Core domain types
//!
//! This module contains the structures the resolver and orchestrator work on.
//! A manifest is loaded once per invocation and never mutated; units, runs and
//! jobs only live for a single resolve-then-deploy pass.

pub mod manifest;
pub mod pipeline;
pub mod selector;
