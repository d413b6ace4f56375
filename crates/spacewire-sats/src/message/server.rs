//! Server to client messages.

use spacewire_core::error::{DecodingErrorKind, Result};

use crate::{
    bsatn::Bsatn,
    reader::BinaryCursor,
    types::{ConnectionId, Identity, TimeDuration, Timestamp},
    writer::BinaryBuffer,
};

use super::{
    update::{DatabaseUpdate, EnergyQuanta, OneOffTable, ReducerCallInfo, SubscribeRows, UpdateStatus},
    QueryId,
};

/// Rows matching a legacy `Subscribe`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InitialSubscription {
    /// Current contents of every subscribed table.
    pub database_update: DatabaseUpdate,
    /// Id of the `Subscribe` request.
    pub request_id: u32,
    /// Server time spent evaluating the queries.
    pub total_host_execution_duration: TimeDuration,
}

impl Bsatn for InitialSubscription {
    fn encode(&self, buffer: &mut BinaryBuffer) {
        self.database_update.encode(buffer);
        buffer.write_u32(self.request_id);
        buffer.write_duration(self.total_host_execution_duration);
    }

    fn decode(cursor: &mut BinaryCursor<'_>) -> Result<Self> {
        Ok(Self {
            database_update: DatabaseUpdate::decode(cursor)?,
            request_id: cursor.read_u32()?,
            total_host_execution_duration: cursor.read_duration()?,
        })
    }
}

/// Result of a reducer call, with the caller details.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionUpdate {
    /// Whether the transaction committed.
    pub status: UpdateStatus,
    /// Commit time.
    pub timestamp: Timestamp,
    /// Who called the reducer.
    pub caller_identity: Identity,
    /// Which connection called the reducer.
    pub caller_connection_id: ConnectionId,
    /// The call itself.
    pub reducer_call: ReducerCallInfo,
    /// Energy spent.
    pub energy_quanta_used: EnergyQuanta,
    /// Server time spent.
    pub total_host_execution_duration: TimeDuration,
}

impl Bsatn for TransactionUpdate {
    fn encode(&self, buffer: &mut BinaryBuffer) {
        self.status.encode(buffer);
        buffer.write_timestamp(self.timestamp);
        buffer.write_identity(self.caller_identity);
        buffer.write_connection_id(self.caller_connection_id);
        self.reducer_call.encode(buffer);
        self.energy_quanta_used.encode(buffer);
        buffer.write_duration(self.total_host_execution_duration);
    }

    fn decode(cursor: &mut BinaryCursor<'_>) -> Result<Self> {
        Ok(Self {
            status: UpdateStatus::decode(cursor)?,
            timestamp: cursor.read_timestamp()?,
            caller_identity: cursor.read_identity()?,
            caller_connection_id: cursor.read_connection_id()?,
            reducer_call: ReducerCallInfo::decode(cursor)?,
            energy_quanta_used: EnergyQuanta::decode(cursor)?,
            total_host_execution_duration: cursor.read_duration()?,
        })
    }
}

/// Transaction update without caller details, sent in light mode.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionUpdateLight {
    /// Id of the originating request.
    pub request_id: u32,
    /// Changes to subscribed tables.
    pub update: DatabaseUpdate,
}

impl Bsatn for TransactionUpdateLight {
    fn encode(&self, buffer: &mut BinaryBuffer) {
        buffer.write_u32(self.request_id);
        self.update.encode(buffer);
    }

    fn decode(cursor: &mut BinaryCursor<'_>) -> Result<Self> {
        Ok(Self { request_id: cursor.read_u32()?, update: DatabaseUpdate::decode(cursor)? })
    }
}

/// First message on every connection: who the server thinks we are.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IdentityToken {
    /// Our identity.
    pub identity: Identity,
    /// Token to present on later connections.
    pub token: String,
    /// Our connection id.
    pub connection_id: ConnectionId,
}

impl Bsatn for IdentityToken {
    fn encode(&self, buffer: &mut BinaryBuffer) {
        buffer.write_identity(self.identity);
        buffer.write_string(&self.token);
        buffer.write_connection_id(self.connection_id);
    }

    fn decode(cursor: &mut BinaryCursor<'_>) -> Result<Self> {
        Ok(Self {
            identity: cursor.read_identity()?,
            token: cursor.read_string()?,
            connection_id: cursor.read_connection_id()?,
        })
    }
}

/// Answer to a `OneOffQuery`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OneOffQueryResponse {
    /// The request's message id.
    pub message_id: Vec<u8>,
    /// Set if the query failed.
    pub error: Option<String>,
    /// Matching rows, per table.
    pub tables: Vec<OneOffTable>,
    /// Server time spent.
    pub total_host_execution_duration: TimeDuration,
}

impl Bsatn for OneOffQueryResponse {
    fn encode(&self, buffer: &mut BinaryBuffer) {
        buffer.write_byte_array(&self.message_id);
        buffer.write_optional_string(self.error.as_deref());
        self.tables.encode(buffer);
        buffer.write_duration(self.total_host_execution_duration);
    }

    fn decode(cursor: &mut BinaryCursor<'_>) -> Result<Self> {
        Ok(Self {
            message_id: cursor.read_byte_array()?,
            error: cursor.read_optional_string()?,
            tables: Vec::decode(cursor)?,
            total_host_execution_duration: cursor.read_duration()?,
        })
    }
}

/// Reply to `SubscribeSingle` or `Unsubscribe`.
///
/// Both replies share one layout; `ServerMessage` tells them apart.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubscriptionRows {
    /// Id of the request.
    pub request_id: u32,
    /// Server time spent, in microseconds.
    pub total_host_execution_duration_micros: u64,
    /// The query the rows belong to.
    pub query_id: QueryId,
    /// Rows added by the subscription, or removed by the unsubscription.
    pub rows: SubscribeRows,
}

impl Bsatn for SubscriptionRows {
    fn encode(&self, buffer: &mut BinaryBuffer) {
        buffer.write_u32(self.request_id);
        buffer.write_u64(self.total_host_execution_duration_micros);
        buffer.write_u32(self.query_id);
        self.rows.encode(buffer);
    }

    fn decode(cursor: &mut BinaryCursor<'_>) -> Result<Self> {
        Ok(Self {
            request_id: cursor.read_u32()?,
            total_host_execution_duration_micros: cursor.read_u64()?,
            query_id: cursor.read_u32()?,
            rows: SubscribeRows::decode(cursor)?,
        })
    }
}

/// A subscription request was rejected, or a subscribed query later failed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubscriptionError {
    /// Server time spent, in microseconds.
    pub total_host_execution_duration_micros: u64,
    /// Request id, when the error answers a request.
    pub request_id: Option<u32>,
    /// Query id, when the error concerns a single query.
    pub query_id: Option<QueryId>,
    /// Table id, when the error concerns a single table.
    pub table_id: Option<u32>,
    /// What went wrong.
    pub error: String,
}

impl Bsatn for SubscriptionError {
    fn encode(&self, buffer: &mut BinaryBuffer) {
        buffer.write_u64(self.total_host_execution_duration_micros);
        buffer.write_optional_u32(self.request_id);
        buffer.write_optional_u32(self.query_id);
        buffer.write_optional_u32(self.table_id);
        buffer.write_string(&self.error);
    }

    fn decode(cursor: &mut BinaryCursor<'_>) -> Result<Self> {
        Ok(Self {
            total_host_execution_duration_micros: cursor.read_u64()?,
            request_id: cursor.read_optional_u32()?,
            query_id: cursor.read_optional_u32()?,
            table_id: cursor.read_optional_u32()?,
            error: cursor.read_string()?,
        })
    }
}

/// Reply to `SubscribeMulti` or `UnsubscribeMulti`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MultiSubscriptionUpdate {
    /// Id of the request.
    pub request_id: u32,
    /// Server time spent, in microseconds.
    pub total_host_execution_duration_micros: u64,
    /// The query group.
    pub query_id: QueryId,
    /// Rows added or removed.
    pub update: DatabaseUpdate,
}

impl Bsatn for MultiSubscriptionUpdate {
    fn encode(&self, buffer: &mut BinaryBuffer) {
        buffer.write_u32(self.request_id);
        buffer.write_u64(self.total_host_execution_duration_micros);
        buffer.write_u32(self.query_id);
        self.update.encode(buffer);
    }

    fn decode(cursor: &mut BinaryCursor<'_>) -> Result<Self> {
        Ok(Self {
            request_id: cursor.read_u32()?,
            total_host_execution_duration_micros: cursor.read_u64()?,
            query_id: cursor.read_u32()?,
            update: DatabaseUpdate::decode(cursor)?,
        })
    }
}

/// Every message a server can send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServerMessage {
    /// Rows for a legacy subscription.
    InitialSubscription(InitialSubscription),
    /// A reducer ran.
    TransactionUpdate(TransactionUpdate),
    /// A reducer ran (light mode).
    TransactionUpdateLight(TransactionUpdateLight),
    /// Identity assignment, sent once after connecting.
    IdentityToken(IdentityToken),
    /// Answer to a one-off query.
    OneOffQueryResponse(OneOffQueryResponse),
    /// A single query was subscribed.
    SubscribeApplied(SubscriptionRows),
    /// A single query was unsubscribed.
    UnsubscribeApplied(SubscriptionRows),
    /// A subscription failed.
    SubscriptionError(SubscriptionError),
    /// A query group was subscribed.
    SubscribeMultiApplied(MultiSubscriptionUpdate),
    /// A query group was unsubscribed.
    UnsubscribeMultiApplied(MultiSubscriptionUpdate),
}

impl ServerMessage {
    /// Wire discriminant.
    pub fn tag(&self) -> u8 {
        match self {
            ServerMessage::InitialSubscription(_) => 0,
            ServerMessage::TransactionUpdate(_) => 1,
            ServerMessage::TransactionUpdateLight(_) => 2,
            ServerMessage::IdentityToken(_) => 3,
            ServerMessage::OneOffQueryResponse(_) => 4,
            ServerMessage::SubscribeApplied(_) => 5,
            ServerMessage::UnsubscribeApplied(_) => 6,
            ServerMessage::SubscriptionError(_) => 7,
            ServerMessage::SubscribeMultiApplied(_) => 8,
            ServerMessage::UnsubscribeMultiApplied(_) => 9,
        }
    }

    /// Variant name, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::InitialSubscription(_) => "InitialSubscription",
            ServerMessage::TransactionUpdate(_) => "TransactionUpdate",
            ServerMessage::TransactionUpdateLight(_) => "TransactionUpdateLight",
            ServerMessage::IdentityToken(_) => "IdentityToken",
            ServerMessage::OneOffQueryResponse(_) => "OneOffQueryResponse",
            ServerMessage::SubscribeApplied(_) => "SubscribeApplied",
            ServerMessage::UnsubscribeApplied(_) => "UnsubscribeApplied",
            ServerMessage::SubscriptionError(_) => "SubscriptionError",
            ServerMessage::SubscribeMultiApplied(_) => "SubscribeMultiApplied",
            ServerMessage::UnsubscribeMultiApplied(_) => "UnsubscribeMultiApplied",
        }
    }
}

impl Bsatn for ServerMessage {
    fn encode(&self, buffer: &mut BinaryBuffer) {
        buffer.write_u8(self.tag());

        match self {
            ServerMessage::InitialSubscription(message) => message.encode(buffer),
            ServerMessage::TransactionUpdate(message) => message.encode(buffer),
            ServerMessage::TransactionUpdateLight(message) => message.encode(buffer),
            ServerMessage::IdentityToken(message) => message.encode(buffer),
            ServerMessage::OneOffQueryResponse(message) => message.encode(buffer),
            ServerMessage::SubscribeApplied(message)
            | ServerMessage::UnsubscribeApplied(message) => message.encode(buffer),
            ServerMessage::SubscriptionError(message) => message.encode(buffer),
            ServerMessage::SubscribeMultiApplied(message)
            | ServerMessage::UnsubscribeMultiApplied(message) => message.encode(buffer),
        }
    }

    fn decode(cursor: &mut BinaryCursor<'_>) -> Result<Self> {
        let message = match cursor.read_u8()? {
            0 => ServerMessage::InitialSubscription(Bsatn::decode(cursor)?),
            1 => ServerMessage::TransactionUpdate(Bsatn::decode(cursor)?),
            2 => ServerMessage::TransactionUpdateLight(Bsatn::decode(cursor)?),
            3 => ServerMessage::IdentityToken(Bsatn::decode(cursor)?),
            4 => ServerMessage::OneOffQueryResponse(Bsatn::decode(cursor)?),
            5 => ServerMessage::SubscribeApplied(Bsatn::decode(cursor)?),
            6 => ServerMessage::UnsubscribeApplied(Bsatn::decode(cursor)?),
            7 => ServerMessage::SubscriptionError(Bsatn::decode(cursor)?),
            8 => ServerMessage::SubscribeMultiApplied(Bsatn::decode(cursor)?),
            9 => ServerMessage::UnsubscribeMultiApplied(Bsatn::decode(cursor)?),
            tag => return Err(DecodingErrorKind::ServerMessage(tag).into()),
        };
        Ok(message)
    }
}
