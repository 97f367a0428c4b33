//! Queue backends behind the core `Queue` capability trait.
//!
//! Two interchangeable backends with deliberately different subscribe
//! semantics: the Redis variant delivers messages in a loop for the life of
//! the subscription, the NATS variant consumes exactly one message and
//! returns. The connection URL scheme selects the backend.

pub mod connect;
pub mod nats;
pub mod redis;

pub use self::connect::connect;
pub use self::nats::NatsQueue;
pub use self::redis::RedisQueue;

// Re-export core contract types for convenience
pub use crashgate_core::{Queue, QueueError, SubscribeHandler, SubscribeHeaders};
