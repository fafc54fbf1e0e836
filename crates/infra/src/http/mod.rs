//! HTTP plumbing shared by the tracker clients.

pub mod client;

pub use client::{HttpClient, HttpClientBuilder, RetryPolicy};
