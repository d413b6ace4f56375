//! Row sets and table updates nested inside server messages.

use spacewire_core::error::{DecodingErrorKind, Result};

use crate::{
    bsatn::Bsatn,
    int::U128,
    reader::BinaryCursor,
    writer::BinaryBuffer,
};

/// Describes how to split a [`RowList`] blob into rows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RowSizeHint {
    /// Every row has this many bytes.
    FixedSize(u16),
    /// Start offset of every row within the blob.
    RowOffsets(Vec<u64>),
}

impl RowSizeHint {
    /// Wire discriminant.
    pub fn tag(&self) -> u8 {
        match self {
            RowSizeHint::FixedSize(_) => 0,
            RowSizeHint::RowOffsets(_) => 1,
        }
    }
}

impl Default for RowSizeHint {
    fn default() -> Self {
        RowSizeHint::FixedSize(0)
    }
}

impl Bsatn for RowSizeHint {
    fn encode(&self, buffer: &mut BinaryBuffer) {
        buffer.write_u8(self.tag());
        match self {
            RowSizeHint::FixedSize(size) => buffer.write_u16(*size),
            RowSizeHint::RowOffsets(offsets) => {
                buffer.write_array(offsets, |buffer, offset| buffer.write_u64(*offset))
            }
        }
    }

    fn decode(cursor: &mut BinaryCursor<'_>) -> Result<Self> {
        match cursor.read_u8()? {
            0 => Ok(RowSizeHint::FixedSize(cursor.read_u16()?)),
            1 => Ok(RowSizeHint::RowOffsets(cursor.read_array(BinaryCursor::read_u64)?)),
            tag => Err(DecodingErrorKind::RowSizeHint(tag).into()),
        }
    }
}

/// Concatenated encoded rows plus the hint needed to split them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RowList {
    /// How `rows_data` divides into rows.
    pub size_hint: RowSizeHint,
    /// Every row, back to back.
    pub rows_data: Vec<u8>,
}

impl RowList {
    /// Creates a list of fixed-size rows.
    pub fn fixed(row_size: u16, rows_data: Vec<u8>) -> Self {
        Self { size_hint: RowSizeHint::FixedSize(row_size), rows_data }
    }

    /// Creates a list with an explicit offset table.
    pub fn with_offsets(offsets: Vec<u64>, rows_data: Vec<u8>) -> Self {
        Self { size_hint: RowSizeHint::RowOffsets(offsets), rows_data }
    }

    /// Splits the blob into row slices.
    ///
    /// A zero fixed size yields nothing, a trailing partial row is ignored, and
    /// offsets that point outside the blob or run backwards are skipped.
    pub fn rows(&self) -> Vec<&[u8]> {
        let data = self.rows_data.as_slice();
        match &self.size_hint {
            RowSizeHint::FixedSize(0) => Vec::new(),
            RowSizeHint::FixedSize(size) => data.chunks_exact(*size as usize).collect(),
            RowSizeHint::RowOffsets(offsets) => {
                let len = data.len() as u64;
                offsets
                    .iter()
                    .enumerate()
                    .filter_map(|(index, &start)| {
                        let end = offsets.get(index + 1).copied().unwrap_or(len);
                        (start <= end && end <= len).then(|| &data[start as usize..end as usize])
                    })
                    .collect()
            }
        }
    }

    /// Number of rows [`rows`](Self::rows) would return.
    pub fn len(&self) -> usize {
        self.rows().len()
    }

    /// Returns true if the list holds no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Bsatn for RowList {
    fn encode(&self, buffer: &mut BinaryBuffer) {
        self.size_hint.encode(buffer);
        buffer.write_byte_array(&self.rows_data);
    }

    fn decode(cursor: &mut BinaryCursor<'_>) -> Result<Self> {
        Ok(Self { size_hint: RowSizeHint::decode(cursor)?, rows_data: cursor.read_byte_array()? })
    }
}

/// Rows removed from and added to one table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryUpdate {
    /// Removed rows.
    pub deletes: RowList,
    /// Added rows.
    pub inserts: RowList,
}

impl Bsatn for QueryUpdate {
    fn encode(&self, buffer: &mut BinaryBuffer) {
        self.deletes.encode(buffer);
        self.inserts.encode(buffer);
    }

    fn decode(cursor: &mut BinaryCursor<'_>) -> Result<Self> {
        Ok(Self { deletes: RowList::decode(cursor)?, inserts: RowList::decode(cursor)? })
    }
}

/// A [`QueryUpdate`], either inline or as a compressed blob.
///
/// Compressed blobs are carried as-is; this crate does not inflate them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompressableQueryUpdate {
    /// Plain update.
    Uncompressed(QueryUpdate),
    /// Brotli-compressed encoded `QueryUpdate`.
    Brotli(Vec<u8>),
    /// Gzip-compressed encoded `QueryUpdate`.
    Gzip(Vec<u8>),
}

impl CompressableQueryUpdate {
    /// Wire discriminant.
    pub fn tag(&self) -> u8 {
        match self {
            CompressableQueryUpdate::Uncompressed(_) => 0,
            CompressableQueryUpdate::Brotli(_) => 1,
            CompressableQueryUpdate::Gzip(_) => 2,
        }
    }
}

impl Bsatn for CompressableQueryUpdate {
    fn encode(&self, buffer: &mut BinaryBuffer) {
        buffer.write_u8(self.tag());
        match self {
            CompressableQueryUpdate::Uncompressed(update) => update.encode(buffer),
            CompressableQueryUpdate::Brotli(bytes) | CompressableQueryUpdate::Gzip(bytes) => {
                buffer.write_byte_array(bytes)
            }
        }
    }

    fn decode(cursor: &mut BinaryCursor<'_>) -> Result<Self> {
        match cursor.read_u8()? {
            0 => Ok(CompressableQueryUpdate::Uncompressed(QueryUpdate::decode(cursor)?)),
            1 => Ok(CompressableQueryUpdate::Brotli(cursor.read_byte_array()?)),
            2 => Ok(CompressableQueryUpdate::Gzip(cursor.read_byte_array()?)),
            tag => Err(DecodingErrorKind::CompressableQueryUpdate(tag).into()),
        }
    }
}

/// Every change to one table within a transaction or subscription.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableUpdate {
    /// Server-side table id.
    pub table_id: u32,
    /// Table name.
    pub table_name: String,
    /// Total rows across all updates, as reported by the server.
    pub num_rows: u64,
    /// Update batches.
    pub updates: Vec<CompressableQueryUpdate>,
}

impl Bsatn for TableUpdate {
    fn encode(&self, buffer: &mut BinaryBuffer) {
        buffer.write_u32(self.table_id);
        buffer.write_string(&self.table_name);
        buffer.write_u64(self.num_rows);
        self.updates.encode(buffer);
    }

    fn decode(cursor: &mut BinaryCursor<'_>) -> Result<Self> {
        Ok(Self {
            table_id: cursor.read_u32()?,
            table_name: cursor.read_string()?,
            num_rows: cursor.read_u64()?,
            updates: Vec::decode(cursor)?,
        })
    }
}

/// Ordered list of table updates.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DatabaseUpdate {
    /// One entry per touched table.
    pub tables: Vec<TableUpdate>,
}

impl Bsatn for DatabaseUpdate {
    fn encode(&self, buffer: &mut BinaryBuffer) {
        self.tables.encode(buffer);
    }

    fn decode(cursor: &mut BinaryCursor<'_>) -> Result<Self> {
        Ok(Self { tables: Vec::decode(cursor)? })
    }
}

/// Outcome of a reducer call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpdateStatus {
    /// The transaction committed with these changes.
    Committed(DatabaseUpdate),
    /// The reducer failed with this message.
    Failed(String),
    /// The caller ran out of energy.
    OutOfEnergy,
}

impl UpdateStatus {
    /// Wire discriminant.
    pub fn tag(&self) -> u8 {
        match self {
            UpdateStatus::Committed(_) => 0,
            UpdateStatus::Failed(_) => 1,
            UpdateStatus::OutOfEnergy => 2,
        }
    }
}

impl Bsatn for UpdateStatus {
    fn encode(&self, buffer: &mut BinaryBuffer) {
        buffer.write_u8(self.tag());
        match self {
            UpdateStatus::Committed(update) => update.encode(buffer),
            UpdateStatus::Failed(message) => buffer.write_string(message),
            UpdateStatus::OutOfEnergy => {}
        }
    }

    fn decode(cursor: &mut BinaryCursor<'_>) -> Result<Self> {
        match cursor.read_u8()? {
            0 => Ok(UpdateStatus::Committed(DatabaseUpdate::decode(cursor)?)),
            1 => Ok(UpdateStatus::Failed(cursor.read_string()?)),
            2 => Ok(UpdateStatus::OutOfEnergy),
            tag => Err(DecodingErrorKind::UpdateStatus(tag).into()),
        }
    }
}

/// The reducer invocation a transaction update reports on.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReducerCallInfo {
    /// Reducer name.
    pub reducer_name: String,
    /// Server-side reducer id.
    pub reducer_id: u32,
    /// Encoded arguments, opaque here.
    pub args: Vec<u8>,
    /// Request id of the originating `CallReducer`.
    pub request_id: u32,
}

impl Bsatn for ReducerCallInfo {
    fn encode(&self, buffer: &mut BinaryBuffer) {
        buffer.write_string(&self.reducer_name);
        buffer.write_u32(self.reducer_id);
        buffer.write_byte_array(&self.args);
        buffer.write_u32(self.request_id);
    }

    fn decode(cursor: &mut BinaryCursor<'_>) -> Result<Self> {
        Ok(Self {
            reducer_name: cursor.read_string()?,
            reducer_id: cursor.read_u32()?,
            args: cursor.read_byte_array()?,
            request_id: cursor.read_u32()?,
        })
    }
}

/// 128-bit energy usage counter.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EnergyQuanta {
    /// Raw quanta.
    pub quanta: U128,
}

impl Bsatn for EnergyQuanta {
    fn encode(&self, buffer: &mut BinaryBuffer) {
        buffer.write_u128(self.quanta);
    }

    fn decode(cursor: &mut BinaryCursor<'_>) -> Result<Self> {
        Ok(Self { quanta: cursor.read_u128()? })
    }
}

/// Rows of one table returned by a one-off query.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OneOffTable {
    /// Table name.
    pub table_name: String,
    /// Matching rows.
    pub rows: RowList,
}

impl Bsatn for OneOffTable {
    fn encode(&self, buffer: &mut BinaryBuffer) {
        buffer.write_string(&self.table_name);
        self.rows.encode(buffer);
    }

    fn decode(cursor: &mut BinaryCursor<'_>) -> Result<Self> {
        Ok(Self { table_name: cursor.read_string()?, rows: RowList::decode(cursor)? })
    }
}

/// Rows of the single table a `SubscribeSingle` query touches.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubscribeRows {
    /// Server-side table id.
    pub table_id: u32,
    /// Table name.
    pub table_name: String,
    /// The rows.
    pub table_rows: TableUpdate,
}

impl Bsatn for SubscribeRows {
    fn encode(&self, buffer: &mut BinaryBuffer) {
        buffer.write_u32(self.table_id);
        buffer.write_string(&self.table_name);
        self.table_rows.encode(buffer);
    }

    fn decode(cursor: &mut BinaryCursor<'_>) -> Result<Self> {
        Ok(Self {
            table_id: cursor.read_u32()?,
            table_name: cursor.read_string()?,
            table_rows: TableUpdate::decode(cursor)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_rows_split() {
        let list = RowList::fixed(2, vec![1, 2, 3, 4, 5]);
        assert_eq!(list.rows(), vec![&[1u8, 2][..], &[3, 4][..]]);
        assert!(RowList::fixed(0, vec![1, 2]).is_empty());
    }

    #[test]
    fn test_offset_rows_split() {
        let list = RowList::with_offsets(vec![0, 1, 4], vec![9, 8, 7, 6, 5]);
        assert_eq!(list.rows(), vec![&[9u8][..], &[8, 7, 6][..], &[5][..]]);
    }

    #[test]
    fn test_malformed_offsets_stay_in_bounds() {
        let list = RowList::with_offsets(vec![3, 1, 10], vec![0, 1, 2]);
        for row in list.rows() {
            assert!(row.len() <= 3);
        }
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn test_row_list_layout() {
        let list = RowList::fixed(4, vec![0xAA; 4]);
        let bytes = list.to_bytes();
        assert_eq!(&bytes[..3], &[0, 4, 0]);
        assert_eq!(&bytes[3..7], &4i32.to_le_bytes());
        assert_eq!(RowList::from_bytes(&bytes).unwrap(), list);
    }

    #[test]
    fn test_unknown_nested_discriminant_is_an_error() {
        assert!(RowSizeHint::from_bytes(&[9]).is_err());
        assert!(CompressableQueryUpdate::from_bytes(&[3]).is_err());
        assert!(UpdateStatus::from_bytes(&[3]).is_err());
    }

    #[test]
    fn test_update_status_out_of_energy_has_no_payload() {
        assert_eq!(UpdateStatus::OutOfEnergy.to_bytes(), vec![2]);
        assert_eq!(UpdateStatus::from_bytes(&[2]).unwrap(), UpdateStatus::OutOfEnergy);
    }
}
