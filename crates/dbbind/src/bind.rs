//! Parameter sources and their reshaping into driver bind order.

use crate::compiler::CompiledStatement;
use crate::error::{DbError, DbResult};
use crate::value::{KeyedRecord, Value};

/// One parameter set.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// Canonical key → value.
    Keyed(KeyedRecord),
    /// Values already aligned to the statement's keys.
    Positional(Vec<Value>),
}

impl Record {
    pub fn len(&self) -> usize {
        match self {
            Record::Keyed(r) => r.len(),
            Record::Positional(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A JSON object becomes a keyed record, a JSON array a positional one.
    pub fn from_json(value: serde_json::Value) -> DbResult<Self> {
        match value {
            serde_json::Value::Object(map) => Ok(Record::Keyed(
                map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            )),
            serde_json::Value::Array(items) => {
                Ok(Record::Positional(items.into_iter().map(Value::from).collect()))
            }
            other => Err(DbError::validation(format!(
                "expected a JSON object or array as a record, got {other}"
            ))),
        }
    }
}

impl From<KeyedRecord> for Record {
    fn from(r: KeyedRecord) -> Self {
        Record::Keyed(r)
    }
}

impl From<Vec<Value>> for Record {
    fn from(r: Vec<Value>) -> Self {
        Record::Positional(r)
    }
}

/// An ordered batch of parameter sets sharing one shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Batch {
    Keyed(Vec<KeyedRecord>),
    Positional(Vec<Vec<Value>>),
}

impl Batch {
    /// Collect records into a batch. The first record decides the shape.
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> DbResult<Self> {
        let mut records = records.into_iter();
        let Some(first) = records.next() else {
            return Ok(Batch::Keyed(Vec::new()));
        };

        match first {
            Record::Keyed(first) => {
                let mut out = vec![first];
                for (i, r) in records.enumerate() {
                    match r {
                        Record::Keyed(r) => out.push(r),
                        Record::Positional(_) => return Err(shape_mismatch(i + 1, "keyed")),
                    }
                }
                Ok(Batch::Keyed(out))
            }
            Record::Positional(first) => {
                let mut out = vec![first];
                for (i, r) in records.enumerate() {
                    match r {
                        Record::Positional(r) => out.push(r),
                        Record::Keyed(_) => return Err(shape_mismatch(i + 1, "positional")),
                    }
                }
                Ok(Batch::Positional(out))
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Batch::Keyed(b) => b.len(),
            Batch::Positional(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn shape_mismatch(index: usize, expected: &str) -> DbError {
    DbError::validation(format!(
        "record {index} does not match the batch shape (expected {expected})"
    ))
}

impl From<Vec<KeyedRecord>> for Batch {
    fn from(b: Vec<KeyedRecord>) -> Self {
        Batch::Keyed(b)
    }
}

impl From<Vec<Vec<Value>>> for Batch {
    fn from(b: Vec<Vec<Value>>) -> Self {
        Batch::Positional(b)
    }
}

/// Arguments to [`Session::execute`](crate::Session::execute).
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Args {
    #[default]
    None,
    One(Record),
    Many(Batch),
}

impl Args {
    /// No parameter set, an empty record, or an empty batch.
    pub fn is_empty(&self) -> bool {
        match self {
            Args::None => true,
            Args::One(r) => r.is_empty(),
            Args::Many(b) => b.is_empty(),
        }
    }
}

impl From<()> for Args {
    fn from(_: ()) -> Self {
        Args::None
    }
}

impl From<Record> for Args {
    fn from(r: Record) -> Self {
        Args::One(r)
    }
}

impl From<Batch> for Args {
    fn from(b: Batch) -> Self {
        Args::Many(b)
    }
}

impl From<KeyedRecord> for Args {
    fn from(r: KeyedRecord) -> Self {
        Args::One(Record::Keyed(r))
    }
}

impl From<Vec<Value>> for Args {
    fn from(r: Vec<Value>) -> Self {
        Args::One(Record::Positional(r))
    }
}

impl From<Vec<KeyedRecord>> for Args {
    fn from(b: Vec<KeyedRecord>) -> Self {
        Args::Many(Batch::Keyed(b))
    }
}

impl From<Vec<Vec<Value>>> for Args {
    fn from(b: Vec<Vec<Value>>) -> Self {
        Args::Many(Batch::Positional(b))
    }
}

impl<T: Into<Args>> From<Option<T>> for Args {
    fn from(v: Option<T>) -> Self {
        v.map_or(Args::None, Into::into)
    }
}

impl CompiledStatement {
    /// Look up each bind key in `record`, in driver order.
    pub fn bind_keyed(&self, record: &KeyedRecord, index: Option<usize>) -> DbResult<Vec<Value>> {
        self.bind_keys()
            .iter()
            .map(|key| {
                record
                    .get(key)
                    .cloned()
                    .ok_or_else(|| DbError::missing(key.as_str(), index))
            })
            .collect()
    }

    /// Align a positional row to driver order.
    ///
    /// Rows pass through unless a key fills several slots, in which case every slot takes
    /// the value at its key's first appearance.
    pub fn bind_positional(&self, row: Vec<Value>, index: Option<usize>) -> DbResult<Vec<Value>> {
        let layout = self.layout();
        if !layout.has_duplicates {
            return Ok(row);
        }

        let slots = &layout.binds;
        let lookup = if row.len() >= slots.len() {
            &layout.first
        } else if row.len() >= layout.distinct_len {
            &layout.distinct
        } else {
            let key = slots
                .iter()
                .zip(&layout.distinct)
                .find(|&(_, &d)| d >= row.len())
                .map_or("", |(k, _)| k.as_str());
            return Err(DbError::missing(key, index));
        };

        Ok(lookup.iter().map(|&i| row[i].clone()).collect())
    }

    pub fn bind(&self, record: Record) -> DbResult<Vec<Value>> {
        match record {
            Record::Keyed(r) => self.bind_keyed(&r, None),
            Record::Positional(r) => self.bind_positional(r, None),
        }
    }

    /// Bind every record of `batch`; a missing key reports the record's index.
    pub fn bind_batch(&self, batch: Batch) -> DbResult<Vec<Vec<Value>>> {
        match batch {
            Batch::Keyed(records) => records
                .iter()
                .enumerate()
                .map(|(i, r)| self.bind_keyed(r, Some(i)))
                .collect(),
            Batch::Positional(rows) => rows
                .into_iter()
                .enumerate()
                .map(|(i, r)| self.bind_positional(r, Some(i)))
                .collect(),
        }
    }
}
