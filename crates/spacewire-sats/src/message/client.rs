//! Client to server messages.

use spacewire_core::error::{DecodingErrorKind, Result};

use crate::{bsatn::Bsatn, reader::BinaryCursor, writer::BinaryBuffer};

use super::QueryId;

/// Every message a client can send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientMessage {
    /// Invokes a reducer.
    CallReducer {
        /// Reducer name.
        reducer: String,
        /// Encoded reducer arguments.
        args: Vec<u8>,
        /// Echoed in the resulting transaction update.
        request_id: u32,
        /// Call flags; `0` requests a full update.
        flags: u8,
    },
    /// Replaces the legacy subscription set.
    Subscribe {
        /// Queries to subscribe to.
        query_strings: Vec<String>,
        /// Echoed in the initial subscription.
        request_id: u32,
    },
    /// Runs a query once without subscribing.
    OneOffQuery {
        /// Client-chosen id echoed in the response.
        message_id: Vec<u8>,
        /// The query.
        query_string: String,
    },
    /// Adds one query to the subscription set.
    SubscribeSingle {
        /// The query.
        query: String,
        /// Echoed in the reply.
        request_id: u32,
        /// Handle for unsubscribing later.
        query_id: QueryId,
    },
    /// Adds a group of queries under one id.
    SubscribeMulti {
        /// The queries.
        query_strings: Vec<String>,
        /// Echoed in the reply.
        request_id: u32,
        /// Handle for unsubscribing later.
        query_id: QueryId,
    },
    /// Removes a query added with `SubscribeSingle`.
    Unsubscribe {
        /// Echoed in the reply.
        request_id: u32,
        /// Query to remove.
        query_id: QueryId,
    },
    /// Removes a group added with `SubscribeMulti`.
    UnsubscribeMulti {
        /// Echoed in the reply.
        request_id: u32,
        /// Group to remove.
        query_id: QueryId,
    },
}

impl ClientMessage {
    /// Wire discriminant.
    pub fn tag(&self) -> u8 {
        match self {
            ClientMessage::CallReducer { .. } => 0,
            ClientMessage::Subscribe { .. } => 1,
            ClientMessage::OneOffQuery { .. } => 2,
            ClientMessage::SubscribeSingle { .. } => 3,
            ClientMessage::SubscribeMulti { .. } => 4,
            ClientMessage::Unsubscribe { .. } => 5,
            ClientMessage::UnsubscribeMulti { .. } => 6,
        }
    }

    /// Variant name, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::CallReducer { .. } => "CallReducer",
            ClientMessage::Subscribe { .. } => "Subscribe",
            ClientMessage::OneOffQuery { .. } => "OneOffQuery",
            ClientMessage::SubscribeSingle { .. } => "SubscribeSingle",
            ClientMessage::SubscribeMulti { .. } => "SubscribeMulti",
            ClientMessage::Unsubscribe { .. } => "Unsubscribe",
            ClientMessage::UnsubscribeMulti { .. } => "UnsubscribeMulti",
        }
    }

    /// Request id carried by the message, if it has one.
    pub fn request_id(&self) -> Option<u32> {
        match self {
            ClientMessage::CallReducer { request_id, .. }
            | ClientMessage::Subscribe { request_id, .. }
            | ClientMessage::SubscribeSingle { request_id, .. }
            | ClientMessage::SubscribeMulti { request_id, .. }
            | ClientMessage::Unsubscribe { request_id, .. }
            | ClientMessage::UnsubscribeMulti { request_id, .. } => Some(*request_id),
            ClientMessage::OneOffQuery { .. } => None,
        }
    }
}

impl Bsatn for ClientMessage {
    fn encode(&self, buffer: &mut BinaryBuffer) {
        buffer.write_u8(self.tag());

        match self {
            ClientMessage::CallReducer { reducer, args, request_id, flags } => {
                buffer.write_string(reducer);
                buffer.write_byte_array(args);
                buffer.write_u32(*request_id);
                buffer.write_u8(*flags);
            }
            ClientMessage::Subscribe { query_strings, request_id } => {
                buffer.write_string_array(query_strings);
                buffer.write_u32(*request_id);
            }
            ClientMessage::OneOffQuery { message_id, query_string } => {
                buffer.write_byte_array(message_id);
                buffer.write_string(query_string);
            }
            ClientMessage::SubscribeSingle { query, request_id, query_id } => {
                buffer.write_string(query);
                buffer.write_u32(*request_id);
                buffer.write_u32(*query_id);
            }
            ClientMessage::SubscribeMulti { query_strings, request_id, query_id } => {
                buffer.write_string_array(query_strings);
                buffer.write_u32(*request_id);
                buffer.write_u32(*query_id);
            }
            ClientMessage::Unsubscribe { request_id, query_id }
            | ClientMessage::UnsubscribeMulti { request_id, query_id } => {
                buffer.write_u32(*request_id);
                buffer.write_u32(*query_id);
            }
        }
    }

    fn decode(cursor: &mut BinaryCursor<'_>) -> Result<Self> {
        let message = match cursor.read_u8()? {
            0 => ClientMessage::CallReducer {
                reducer: cursor.read_string()?,
                args: cursor.read_byte_array()?,
                request_id: cursor.read_u32()?,
                flags: cursor.read_u8()?,
            },
            1 => ClientMessage::Subscribe {
                query_strings: cursor.read_string_array()?,
                request_id: cursor.read_u32()?,
            },
            2 => ClientMessage::OneOffQuery {
                message_id: cursor.read_byte_array()?,
                query_string: cursor.read_string()?,
            },
            3 => ClientMessage::SubscribeSingle {
                query: cursor.read_string()?,
                request_id: cursor.read_u32()?,
                query_id: cursor.read_u32()?,
            },
            4 => ClientMessage::SubscribeMulti {
                query_strings: cursor.read_string_array()?,
                request_id: cursor.read_u32()?,
                query_id: cursor.read_u32()?,
            },
            5 => ClientMessage::Unsubscribe {
                request_id: cursor.read_u32()?,
                query_id: cursor.read_u32()?,
            },
            6 => ClientMessage::UnsubscribeMulti {
                request_id: cursor.read_u32()?,
                query_id: cursor.read_u32()?,
            },
            tag => return Err(DecodingErrorKind::ClientMessage(tag).into()),
        };
        Ok(message)
    }
}
