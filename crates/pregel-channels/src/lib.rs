//! Versioned channel abstractions for Pregel-style superstep execution.
//!
//! A channel is the only place state lives between supersteps. The engine in
//! `pregel-core` never inspects a channel's internals — it calls `get`,
//! `update`, `consume`, `checkpoint` and `from_checkpoint` through the
//! [`Channel`] trait and drives versioning from the booleans those methods
//! return.
//!
//! Seven variants are provided: [`LastValueChannel`], [`TopicChannel`] and
//! [`BinaryOperatorChannel`] cover the common cases; [`EphemeralValueChannel`],
//! [`AnyValueChannel`], [`UntrackedValueChannel`] and
//! [`NamedBarrierValueChannel`] cover the rest.

mod channels;
mod channels_ext;
mod error;

pub use channels::{BinaryOperatorChannel, Channel, LastValueChannel, ReducerFn, TopicChannel};
pub use channels_ext::{
    AnyValueChannel, EphemeralValueChannel, NamedBarrierValueChannel, UntrackedValueChannel,
};
pub use error::{ChannelError, Result};
