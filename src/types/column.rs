//! This module defines the canonical, type-safe representation of column
//! metadata used throughout the export pipeline.
//!
//! The source database describes columns with numeric type constants; this
//! enum replaces that fragile constant-comparison style with a closed,
//! compile-time-checked enumeration. Adding a new semantic kind is an
//! exhaustiveness-checked change, not a scattered set of `if` chains.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The canonical, internal representation of a column's semantic type.
///
/// `Opaque` is a real member of the closed set, not an error: values of a
/// kind the codec does not understand are hex-encoded as text so that an
/// unsupported column never aborts a multi-megabyte export.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ColumnKind {
    Integer,
    BigInt,
    SmallInt,
    ByteInt,
    Float,
    VarChar,
    Char,
    Date,
    Time,
    Timestamp,
    Decimal,
    Opaque,
}

/// Character encoding of a text column's source bytes.
///
/// `Unicode` columns arrive as UTF-16LE and are transcoded to UTF-8 on the
/// wire; `Latin` columns are copied through byte-for-byte.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharSet {
    Latin,
    Unicode,
}

/// Immutable per-column metadata, supplied once by the row source before the
/// first row is read and held for the lifetime of one export session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub kind: ColumnKind,
    /// Byte width of the source encoding. For `Char` this is the fixed text
    /// width; for `Decimal` it selects the short (<= 8) or long (16) wire form.
    pub byte_width: usize,
    /// Total digits; only meaningful for `Decimal`.
    pub precision: u8,
    /// Fractional digits; only meaningful for `Decimal`. Communicated to the
    /// receiver through the handshake schema, never per value.
    pub scale: u8,
    pub charset: CharSet,
}

impl ColumnDescriptor {
    /// A plain (non-decimal, Latin) descriptor for the given kind and width.
    pub fn plain(kind: ColumnKind, byte_width: usize) -> Self {
        Self {
            kind,
            byte_width,
            precision: 0,
            scale: 0,
            charset: CharSet::Latin,
        }
    }

    /// A decimal descriptor. The wire form is selected by `byte_width`.
    pub fn decimal(byte_width: usize, precision: u8, scale: u8) -> Self {
        Self {
            kind: ColumnKind::Decimal,
            byte_width,
            precision,
            scale,
            charset: CharSet::Latin,
        }
    }

    /// A text descriptor with an explicit character set.
    pub fn text(kind: ColumnKind, byte_width: usize, charset: CharSet) -> Self {
        Self {
            kind,
            byte_width,
            precision: 0,
            scale: 0,
            charset,
        }
    }

    /// The coarse wire type advertised for this column in the handshake
    /// schema. Deliberately lossier than the descriptor itself: the receiver
    /// only needs enough to pick a fixed- or variable-width decode path.
    pub fn coarse_type(&self) -> CoarseType {
        match self.kind {
            ColumnKind::Integer | ColumnKind::SmallInt | ColumnKind::ByteInt => CoarseType::Integer,
            ColumnKind::BigInt => CoarseType::BigInt,
            ColumnKind::Float => CoarseType::Double,
            ColumnKind::VarChar | ColumnKind::Char | ColumnKind::Opaque => CoarseType::Varchar,
            ColumnKind::Date => CoarseType::Date,
            ColumnKind::Time => CoarseType::Time,
            ColumnKind::Timestamp => CoarseType::Timestamp,
            ColumnKind::Decimal => {
                if self.byte_width <= 8 {
                    CoarseType::DecimalShort
                } else {
                    CoarseType::DecimalLong
                }
            }
        }
    }
}

/// The coarse type vocabulary of the handshake schema.
///
/// These string representations are part of the wire contract with the
/// receiver and must not change.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoarseType {
    #[serde(rename = "INTEGER")]
    Integer,
    #[serde(rename = "BIGINT")]
    BigInt,
    #[serde(rename = "DOUBLE")]
    Double,
    #[serde(rename = "VARCHAR")]
    Varchar,
    #[serde(rename = "DATE")]
    Date,
    #[serde(rename = "TIME")]
    Time,
    #[serde(rename = "TIMESTAMP")]
    Timestamp,
    #[serde(rename = "DECIMAL_SHORT")]
    DecimalShort,
    #[serde(rename = "DECIMAL_LONG")]
    DecimalLong,
}

impl fmt::Display for CoarseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CoarseType::Integer => "INTEGER",
            CoarseType::BigInt => "BIGINT",
            CoarseType::Double => "DOUBLE",
            CoarseType::Varchar => "VARCHAR",
            CoarseType::Date => "DATE",
            CoarseType::Time => "TIME",
            CoarseType::Timestamp => "TIMESTAMP",
            CoarseType::DecimalShort => "DECIMAL_SHORT",
            CoarseType::DecimalLong => "DECIMAL_LONG",
        };
        write!(f, "{}", name)
    }
}

/// One column entry in the handshake schema description.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct WireColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub coarse_type: CoarseType,
}

/// The compact structured schema sent once at handshake time:
/// `{"columns":[{"name":"col_0","type":"INTEGER"}, ...]}`.
///
/// Column names are positional (`col_N`); the receiver matches them to its
/// own registered schema by index, not by name.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct WireSchema {
    pub columns: Vec<WireColumn>,
}

impl WireSchema {
    /// Builds the handshake schema from the session's column descriptors.
    pub fn from_descriptors(descriptors: &[ColumnDescriptor]) -> Self {
        let columns = descriptors
            .iter()
            .enumerate()
            .map(|(idx, desc)| WireColumn {
                name: format!("col_{}", idx),
                coarse_type: desc.coarse_type(),
            })
            .collect();
        Self { columns }
    }
}
