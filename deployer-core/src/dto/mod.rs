//! Data Transfer Objects for the trigger API
//!
//! Lightweight request types sent to the remote CI/CD system.

pub mod pipeline;
