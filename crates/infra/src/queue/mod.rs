//! Queue adapter speaking the SQS JSON protocol
//!
//! Every call is a `POST` to the configured endpoint with an
//! `X-Amz-Target: AmazonSQS.<Action>` header and an
//! `application/x-amz-json-1.0` body. Requests are not signed; the endpoint
//! is expected to be a local emulator or a signing proxy.

mod client;
mod wire;

pub use client::QueueClient;
