//! The scan predicate: a single-attribute comparison evaluated against a
//! byte range inside each record. `filterBytes = null` at the API boundary
//! becomes `Option<Filter>` here — `None` matches every record.

use std::cmp::Ordering;
use std::mem::size_of;

use common::{DbError, DbResult};

/// Declared type of the column a filter compares against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Float,
    String,
}

/// Relational operator a filter applies to the comparison's sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Lt,
    Lte,
    Eq,
    Gte,
    Gt,
    Ne,
}

impl Op {
    fn accepts(self, ordering: Ordering) -> bool {
        use Ordering::*;
        matches!(
            (self, ordering),
            (Op::Lt, Less)
                | (Op::Lte, Less | Equal)
                | (Op::Eq, Equal)
                | (Op::Gte, Equal | Greater)
                | (Op::Gt, Greater)
                | (Op::Ne, Less | Greater)
        )
    }
}

/// Raw scan parameters as a caller would supply them: an offset and length
/// into each record, the column's declared type, and the comparison value
/// encoded as bytes of that type.
#[derive(Debug, Clone)]
pub struct ScanFilterSpec {
    pub offset: i64,
    pub length: i64,
    pub column_type: ColumnType,
    pub filter_bytes: Vec<u8>,
    pub op: Op,
}

#[derive(Debug, Clone)]
enum FilterValue {
    Integer(i32),
    Float(f32),
    String(Vec<u8>),
}

/// A validated, decoded filter: the tagged comparison the design notes call
/// for in place of the raw `(type, offset, length, filterBytes, op)` tuple.
#[derive(Debug, Clone)]
pub(crate) struct Filter {
    offset: usize,
    length: usize,
    value: FilterValue,
    op: Op,
}

impl Filter {
    /// Validate and decode a caller-supplied spec. Mirrors `startScan`'s
    /// parameter checks: negative offset, zero length, or a length that
    /// disagrees with the declared type all report `BadScanParm`.
    pub(crate) fn try_new(spec: ScanFilterSpec) -> DbResult<Self> {
        if spec.offset < 0 {
            return Err(DbError::BadScanParm(format!(
                "offset must be >= 0, got {}",
                spec.offset
            )));
        }
        if spec.length < 1 {
            return Err(DbError::BadScanParm(format!(
                "length must be >= 1, got {}",
                spec.length
            )));
        }

        let value = match spec.column_type {
            ColumnType::Integer => {
                if spec.length as usize != size_of::<i32>() {
                    return Err(DbError::BadScanParm(format!(
                        "INTEGER filter length must be {}, got {}",
                        size_of::<i32>(),
                        spec.length
                    )));
                }
                let bytes: [u8; 4] = spec.filter_bytes.as_slice().try_into().map_err(|_| {
                    DbError::BadScanParm("INTEGER filter value must be exactly 4 bytes".into())
                })?;
                FilterValue::Integer(i32::from_ne_bytes(bytes))
            }
            ColumnType::Float => {
                if spec.length as usize != size_of::<f32>() {
                    return Err(DbError::BadScanParm(format!(
                        "FLOAT filter length must be {}, got {}",
                        size_of::<f32>(),
                        spec.length
                    )));
                }
                let bytes: [u8; 4] = spec.filter_bytes.as_slice().try_into().map_err(|_| {
                    DbError::BadScanParm("FLOAT filter value must be exactly 4 bytes".into())
                })?;
                FilterValue::Float(f32::from_ne_bytes(bytes))
            }
            ColumnType::String => {
                if spec.filter_bytes.len() != spec.length as usize {
                    return Err(DbError::BadScanParm(
                        "STRING filter value length must match the declared length".into(),
                    ));
                }
                FilterValue::String(spec.filter_bytes)
            }
        };

        Ok(Self {
            offset: spec.offset as usize,
            length: spec.length as usize,
            value,
            op: spec.op,
        })
    }

    /// A record shorter than `offset + length` never matches — there is no
    /// column there to compare.
    fn matches(&self, rec: &[u8]) -> bool {
        if self.offset + self.length > rec.len() {
            return false;
        }
        let window = &rec[self.offset..self.offset + self.length];
        let ordering = match &self.value {
            FilterValue::Integer(filter) => {
                let attr = i32::from_ne_bytes(window.try_into().expect("length checked to be 4"));
                attr.cmp(filter)
            }
            FilterValue::Float(filter) => {
                let attr = f32::from_ne_bytes(window.try_into().expect("length checked to be 4"));
                attr.partial_cmp(filter).unwrap_or(Ordering::Equal)
            }
            FilterValue::String(filter) => window.cmp(filter.as_slice()),
        };
        self.op.accepts(ordering)
    }
}

/// `matchRec`: true with no filter, otherwise delegates to the filter's
/// column-typed comparison.
pub(crate) fn matches(filter: Option<&Filter>, rec: &[u8]) -> bool {
    match filter {
        None => true,
        Some(f) => f.matches(rec),
    }
}
