//! Vizzle try-on orchestration core
//!
//! Client-side core of the Vizzle virtual try-on app: the asynchronous
//! try-on/video job lifecycle (upload, submit, poll) and the
//! redirect-resilient federated sign-in reconciliation, plus the cache,
//! profile, and history seams they depend on.

pub mod app_state;
pub mod config;
pub mod models;
pub mod services;
