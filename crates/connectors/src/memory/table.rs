use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use model::{ColumnMetadata, Row, Value};
use std::sync::Arc;
use uuid::Uuid;

/// Where the rows of a table come from.
#[derive(Clone)]
pub enum RowSource {
    Fixed(Arc<Vec<Row>>),
    /// Rows produced on demand from their index. `len == None` never ends.
    Generated {
        len: Option<usize>,
        generate: Arc<dyn Fn(usize) -> Row + Send + Sync>,
    },
}

impl RowSource {
    pub fn len(&self) -> Option<usize> {
        match self {
            RowSource::Fixed(rows) => Some(rows.len()),
            RowSource::Generated { len, .. } => *len,
        }
    }

    pub fn row(&self, index: usize) -> Option<Row> {
        match self {
            RowSource::Fixed(rows) => rows.get(index).cloned(),
            RowSource::Generated { len, generate } => match len {
                Some(len) if index >= *len => None,
                _ => Some(generate(index)),
            },
        }
    }
}

impl std::fmt::Debug for RowSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowSource::Fixed(rows) => f.debug_tuple("Fixed").field(&rows.len()).finish(),
            RowSource::Generated { len, .. } => {
                f.debug_struct("Generated").field("len", len).finish()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct MemoryTable {
    pub columns: ColumnMetadata,
    pub rows: RowSource,
}

impl MemoryTable {
    pub fn fixed(columns: ColumnMetadata, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows: RowSource::Fixed(Arc::new(rows)),
        }
    }

    pub fn generated<F>(columns: ColumnMetadata, len: Option<usize>, generate: F) -> Self
    where
        F: Fn(usize) -> Row + Send + Sync + 'static,
    {
        Self {
            columns,
            rows: RowSource::Generated {
                len,
                generate: Arc::new(generate),
            },
        }
    }
}

const FIRST_NAMES: [&str; 8] = [
    "ada", "grace", "linus", "barbara", "ken", "margaret", "dennis", "frances",
];

/// 250 users with mixed value kinds.
pub fn users() -> MemoryTable {
    let columns = ColumnMetadata::new(["id", "name", "email", "active", "signed_up"]);
    let epoch = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default();
    let rows = (0..250usize)
        .map(|i| {
            let name = format!("{}{}", FIRST_NAMES[i % FIRST_NAMES.len()], i);
            let email = if i % 7 == 0 {
                Value::Null
            } else {
                Value::String(format!("{name}@example.com"))
            };
            Row::new(vec![
                Value::Int(i as i64 + 1),
                Value::String(name),
                email,
                Value::Boolean(i % 3 != 0),
                Value::Date(epoch + ChronoDuration::days(i as i64 * 3)),
            ])
        })
        .collect();
    MemoryTable::fixed(columns, rows)
}

/// One million audit events, generated as they are read.
pub fn events() -> MemoryTable {
    let columns = ColumnMetadata::new(["seq", "event_id", "kind", "at", "payload"]);
    let start = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap_or_default();
    MemoryTable::generated(columns, Some(1_000_000), move |i| {
        let kind = ["login", "logout", "purchase", "refund"][i % 4];
        Row::new(vec![
            Value::Int(i as i64),
            Value::Uuid(Uuid::from_u128(i as u128)),
            Value::String(kind.to_string()),
            Value::Timestamp(start + ChronoDuration::seconds(i as i64)),
            Value::Json(serde_json::json!({ "user": i % 250 + 1, "amount": (i % 97) as f64 * 1.5 })),
        ])
    })
}

/// Never ends.
pub fn ticks() -> MemoryTable {
    let columns = ColumnMetadata::new(["n", "square"]);
    MemoryTable::generated(columns, None, |i| {
        let n = i as i64;
        Row::new(vec![Value::Int(n), Value::Int(n.wrapping_mul(n))])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_source_stops_at_len() {
        let table = events();
        assert_eq!(table.rows.len(), Some(1_000_000));
        assert!(table.rows.row(999_999).is_some());
        assert!(table.rows.row(1_000_000).is_none());
        assert_eq!(table.rows.row(5).unwrap()[0], Value::Int(5));
    }

    #[test]
    fn unbounded_source_has_no_len() {
        let table = ticks();
        assert_eq!(table.rows.len(), None);
        assert_eq!(table.rows.row(12).unwrap()[1], Value::Int(144));
    }

    #[test]
    fn users_mix_nulls() {
        let table = users();
        assert_eq!(table.columns.len(), 5);
        assert_eq!(table.rows.row(0).unwrap()[2], Value::Null);
        assert!(!table.rows.row(1).unwrap()[2].is_null());
    }
}
