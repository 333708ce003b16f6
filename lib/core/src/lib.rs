//! Core domain types and utilities for the copper-sparrow platform.
//!
//! This crate provides the foundational identifier types and error handling
//! shared by the flow engine, the messaging boundary, and the service binary.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{
    ChannelId, CustomerId, ExecutionId, ExecutionLogId, FlowId, MessageId, StampCardId,
    StampRequestId,
};
