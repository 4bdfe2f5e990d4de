//! Synchronous event primitives
//!
//! [`Emitter`] is the ordered pub/sub building block used by stores, derived
//! stores and domains. Every `on` call hands back a [`Subscription`].

pub mod emitter;
pub mod subscription;

pub use emitter::Emitter;
pub use subscription::Subscription;
