#![deny(clippy::all, clippy::pedantic, clippy::nursery, dead_code)]

//! KYC verification gateway
//!
//! A thin backend that forwards identity-verification requests to the Didit
//! verification API, keeps minimal per-user verification state in DynamoDB,
//! and reconciles the provider's asynchronous webhook callbacks into that
//! state.

pub mod cache;
pub mod middleware;
pub mod provider;
pub mod routes;
pub mod server;
pub mod types;
pub mod webhook;
