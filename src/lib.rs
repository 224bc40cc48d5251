//! Listing Flow
//!
//! Client-side controller for a job-backed sell workflow: a video is uploaded
//! to an analysis backend, the job is polled until its extracted items are
//! ready, the items are edited in place, and the result is published as a
//! storefront. The crate also ships a small in-memory reference backend
//! implementing the same HTTP contract.

pub mod app_state;
pub mod config;
pub mod models;
pub mod routes;
pub mod services;
pub mod workflow;
