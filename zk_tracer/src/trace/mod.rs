//! The row sink of the hub.
//!
//! Rows are written column by column. Every column may be set at most once
//! per row; sealing a row with [`Trace::fill_and_validate_row`] requires all
//! common columns and all columns of the row's perspective to be set, and
//! zero-fills the columns of the other perspectives.

mod columns;

use bitvec::prelude::*;
pub use columns::{Column, Perspective};
use ethereum_types::{Address, H256, U256};
use serde::ser::{Serialize, SerializeMap, Serializer};
use strum::{EnumCount, IntoEnumIterator};

use crate::error::HubError;
use crate::util::{address_to_u256, h256_to_u256};

/// Values that can be written to a column.
pub trait ColumnValue {
    fn to_word(self) -> U256;
}

impl ColumnValue for U256 {
    fn to_word(self) -> U256 {
        self
    }
}

impl ColumnValue for bool {
    fn to_word(self) -> U256 {
        U256::from(self as u8)
    }
}

impl ColumnValue for u8 {
    fn to_word(self) -> U256 {
        U256::from(self)
    }
}

impl ColumnValue for u64 {
    fn to_word(self) -> U256 {
        U256::from(self)
    }
}

impl ColumnValue for usize {
    fn to_word(self) -> U256 {
        U256::from(self)
    }
}

impl ColumnValue for Address {
    fn to_word(self) -> U256 {
        address_to_u256(self)
    }
}

impl ColumnValue for H256 {
    fn to_word(self) -> U256 {
        h256_to_u256(self)
    }
}

#[derive(Debug)]
pub struct Trace {
    columns: Vec<Vec<U256>>,
    filled: BitVec,
    perspective: Option<Perspective>,
    rows: usize,
}

impl Default for Trace {
    fn default() -> Self {
        Self::new()
    }
}

impl Trace {
    pub fn new() -> Self {
        Self {
            columns: vec![vec![]; Column::COUNT],
            filled: bitvec![0; Column::COUNT],
            perspective: None,
            rows: 0,
        }
    }

    pub fn set(&mut self, column: Column, value: impl ColumnValue) -> Result<(), HubError> {
        let index = column as usize;
        if self.filled[index] {
            return Err(HubError::ColumnSetTwice(column));
        }

        match (column.perspective(), self.perspective) {
            (Perspective::Common, _) => {}
            (p, None) => self.perspective = Some(p),
            (p, Some(current)) if p == current => {}
            (_, Some(_)) => return Err(HubError::ForeignColumn(column)),
        }

        self.filled.set(index, true);
        self.columns[index].push(value.to_word());
        Ok(())
    }

    /// Seals the current row.
    pub fn fill_and_validate_row(&mut self) -> Result<(), HubError> {
        for column in Column::iter() {
            let index = column as usize;
            if self.filled[index] {
                continue;
            }
            let perspective = column.perspective();
            if perspective == Perspective::Common || Some(perspective) == self.perspective {
                return Err(HubError::ColumnUnset(column));
            }
            self.columns[index].push(U256::zero());
        }

        self.filled.fill(false);
        self.perspective = None;
        self.rows += 1;
        Ok(())
    }

    /// Number of sealed rows.
    pub fn line_count(&self) -> usize {
        self.rows
    }

    pub fn build(self) -> Result<TraceColumns, HubError> {
        let pending = self.filled.count_ones();
        if pending > 0 {
            return Err(HubError::PartialRow(pending));
        }
        log::info!("hub trace built with {} rows", self.rows);

        Ok(TraceColumns {
            rows: self.rows,
            columns: self.columns,
        })
    }
}

/// The columns of a complete trace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceColumns {
    rows: usize,
    columns: Vec<Vec<U256>>,
}

impl TraceColumns {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn column(&self, column: Column) -> &[U256] {
        &self.columns[column as usize]
    }

    /// Value of `column` at `row`, if the row exists.
    pub fn get(&self, column: Column, row: usize) -> Option<U256> {
        self.column(column).get(row).copied()
    }
}

impl Serialize for TraceColumns {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Column::COUNT))?;
        for column in Column::iter() {
            let name: &'static str = column.into();
            map.serialize_entry(name, self.column(column))?;
        }
        map.end()
    }
}
