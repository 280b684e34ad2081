//! Storage services for the KYC verification gateway
//!
//! This crate provides the persistent user verification state shared by the
//! backend service: one DynamoDB item per user, carrying the KYC status
//! fields the webhook receiver and request handlers reconcile against.

pub mod user;
