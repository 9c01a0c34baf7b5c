//! Notification fan-out: channel adapters (real providers or simulation),
//! bounded-concurrency dispatch, delivery tracking and bounded retry.

pub mod adapter;
pub mod dispatcher;
pub mod fcm;
pub mod message;
pub mod simulation;
pub mod tracker;
pub mod twilio;

pub use adapter::*;
pub use dispatcher::*;
pub use fcm::*;
pub use message::*;
pub use simulation::*;
pub use tracker::*;
pub use twilio::*;
