//! The tagged-union message protocol.
//!
//! Every message starts with a one-byte discriminant followed by the variant's fields
//! in a fixed order. Nested unions ([`RowSizeHint`], [`CompressableQueryUpdate`],
//! [`UpdateStatus`]) follow the same pattern.
//!
//! # Module Organization
//!
//! - [`client`] - messages the client sends
//! - [`server`] - messages the server sends
//! - [`update`] - row lists and table updates nested in server messages

pub mod client;
pub mod server;
pub mod update;

#[cfg(test)]
mod tests;

/// Client-chosen handle for a subscribed query or query group.
pub type QueryId = u32;

pub use client::ClientMessage;
pub use server::{
    IdentityToken, InitialSubscription, MultiSubscriptionUpdate, OneOffQueryResponse,
    ServerMessage, SubscriptionError, SubscriptionRows, TransactionUpdate, TransactionUpdateLight,
};
pub use update::{
    CompressableQueryUpdate, DatabaseUpdate, EnergyQuanta, OneOffTable, QueryUpdate,
    ReducerCallInfo, RowList, RowSizeHint, SubscribeRows, TableUpdate, UpdateStatus,
};
