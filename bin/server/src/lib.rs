//! The copper-sparrow server: NATS inbound consumer, PostgreSQL-backed
//! stores, the relay messaging gateway, and the due-timer sweep.

pub mod config;
pub mod consumer;
pub mod db;
pub mod gateway;
pub mod timer;

pub use config::ServerConfig;
pub use consumer::InboundConsumer;
pub use gateway::RelayGateway;
pub use timer::TimerSweeper;
