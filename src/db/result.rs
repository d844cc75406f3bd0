//! Consume-once cursor over the rows of the last executed statement.
//!
//! The four accessors on [`Database`](super::Database) are views over the same
//! cursor: each one takes rows from the front, so mixing them yields whatever
//! rows the earlier calls left behind.

use std::collections::VecDeque;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::DbError;
use super::backend::QueryResult;

/// A row as column name → value, in column order.
pub type Row = IndexMap<String, Value>;

#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    headers: Vec<String>,
    rows: VecDeque<Vec<Value>>,
    affected: u64,
}

impl From<QueryResult> for ResultSet {
    fn from(result: QueryResult) -> Self {
        Self {
            headers: result.headers,
            rows: result.rows.into(),
            affected: result.affected,
        }
    }
}

impl ResultSet {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Rows not yet consumed.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }

    pub fn affected(&self) -> u64 {
        self.affected
    }

    /// Advance by one row, as a name → value mapping.
    pub fn next_row(&mut self) -> Option<Row> {
        let values = self.rows.pop_front()?;
        Some(self.headers.iter().cloned().zip(values).collect())
    }

    /// Advance by one row, decoded into `T`.
    pub fn next_object<T: DeserializeOwned>(&mut self) -> Result<Option<T>, DbError> {
        self.next_row().map(decode_row).transpose()
    }

    /// Take every remaining row as a mapping.
    pub fn drain_rows(&mut self) -> Vec<Row> {
        std::iter::from_fn(|| self.next_row()).collect()
    }

    /// Take every remaining row decoded into `T`.
    ///
    /// Rows are consumed even if a later one fails to decode.
    pub fn drain_objects<T: DeserializeOwned>(&mut self) -> Result<Vec<T>, DbError> {
        self.drain_rows().into_iter().map(decode_row).collect()
    }
}

fn decode_row<T: DeserializeOwned>(row: Row) -> Result<T, DbError> {
    let object: Map<String, Value> = row.into_iter().collect();
    serde_json::from_value(Value::Object(object)).map_err(|e| DbError::Decode {
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Person {
        name: String,
        age: i64,
    }

    fn people() -> ResultSet {
        QueryResult {
            headers: vec!["name".to_string(), "age".to_string()],
            rows: vec![
                vec![json!("Ana"), json!(5)],
                vec![json!("Bo"), json!(41)],
                vec![json!("Cy"), json!(17)],
            ],
            affected: 0,
        }
        .into()
    }

    #[test]
    fn test_next_row_preserves_column_order() {
        let mut results = people();
        let row = results.next_row().unwrap();
        let columns: Vec<&String> = row.keys().collect();
        assert_eq!(columns, ["name", "age"]);
        assert_eq!(row["name"], json!("Ana"));
    }

    #[test]
    fn test_drain_objects_consumes_everything() {
        let mut results = people();
        let all: Vec<Person> = results.drain_objects().unwrap();

        assert_eq!(all.len(), 3);
        assert_eq!(all[1], Person { name: "Bo".to_string(), age: 41 });
        assert_eq!(results.remaining(), 0);
        assert!(results.next_row().is_none());
    }

    #[test]
    fn test_mixed_views_share_one_cursor() {
        let mut results = people();

        let first: Option<Person> = results.next_object().unwrap();
        assert_eq!(first.unwrap().name, "Ana");

        let rest = results.drain_rows();
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[0]["name"], json!("Bo"));

        let none: Option<Person> = results.next_object().unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_decode_failure_is_reported() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Wrong {
            missing: String,
        }

        let mut results = people();
        let outcome: Result<Option<Wrong>, DbError> = results.next_object();
        assert!(matches!(outcome, Err(DbError::Decode { .. })));
    }

    #[test]
    fn test_empty_result_set() {
        let mut results = ResultSet::default();
        assert!(results.next_row().is_none());
        assert!(results.drain_rows().is_empty());
        assert_eq!(results.affected(), 0);
    }
}
