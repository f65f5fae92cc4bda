//! push-service: relays batched push requests to Firebase Cloud Messaging.
pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
