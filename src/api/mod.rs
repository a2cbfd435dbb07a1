//! High-level client API

pub mod client;

pub use client::RestApi;
