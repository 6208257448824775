//! In-memory backend for handler tests.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};

use super::query::{Filter, Order, Query};
use super::{value_string, Backend};
use crate::error::MecalError;

#[derive(Default)]
pub struct FakeBackend {
    tables: RefCell<HashMap<String, Vec<Value>>>,
    tokens: HashMap<String, String>,
    failing: RefCell<HashSet<String>>,
    next_id: Cell<u64>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(self, table: &str, rows: Vec<Value>) -> Self {
        self.tables
            .borrow_mut()
            .entry(table.to_string())
            .or_default()
            .extend(rows);
        self
    }

    pub fn with_token(mut self, token: &str, user_id: &str) -> Self {
        self.tokens.insert(token.to_string(), user_id.to_string());
        self
    }

    /// Make every call touching `table` fail.
    pub fn fail_table(&self, table: &str) {
        self.failing.borrow_mut().insert(table.to_string());
    }

    pub fn heal_table(&self, table: &str) {
        self.failing.borrow_mut().remove(table);
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables.borrow().get(table).cloned().unwrap_or_default()
    }

    fn check(&self, table: &str) -> Result<(), MecalError> {
        if self.failing.borrow().contains(table) {
            return Err(MecalError::Backend {
                status: 503,
                message: format!("{table} unavailable"),
            });
        }
        Ok(())
    }

    fn next(&self) -> u64 {
        let n = self.next_id.get() + 1;
        self.next_id.set(n);
        n
    }
}

fn field(row: &Value, column: &str) -> Option<String> {
    row.get(column).and_then(value_string)
}

fn matches(row: &Value, query: &Query) -> bool {
    query.filters.iter().all(|filter| match filter {
        Filter::Eq(col, value) => field(row, col).as_deref() == Some(value.as_str()),
        Filter::In(col, values) => field(row, col).is_some_and(|v| values.contains(&v)),
    })
}

impl Backend for FakeBackend {
    fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, MecalError> {
        self.check(table)?;
        let mut out: Vec<Value> = self
            .rows(table)
            .into_iter()
            .filter(|row| matches(row, query))
            .collect();

        if let Some((col, order)) = &query.order {
            out.sort_by_key(|row| field(row, col).unwrap_or_default());
            if *order == Order::Desc {
                out.reverse();
            }
        }
        Ok(out)
    }

    fn insert(&self, table: &str, row: &Value) -> Result<Value, MecalError> {
        self.check(table)?;
        let n = self.next();
        let mut obj: Map<String, Value> = row.as_object().cloned().unwrap_or_default();
        obj.entry("id").or_insert_with(|| Value::String(format!("{table}-{n}")));
        let stamp = format!("2024-01-01T00:{:02}:{:02}Z", n / 60, n % 60);
        obj.entry("created_at")
            .or_insert_with(|| Value::String(stamp.clone()));
        if table == "memory_assignments" {
            obj.entry("assigned_at").or_insert_with(|| Value::String(stamp));
        }

        let stored = Value::Object(obj);
        self.tables
            .borrow_mut()
            .entry(table.to_string())
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }

    fn update(&self, table: &str, query: &Query, patch: &Value) -> Result<Vec<Value>, MecalError> {
        self.check(table)?;
        let mut tables = self.tables.borrow_mut();
        let mut updated = Vec::new();
        for row in tables.entry(table.to_string()).or_default().iter_mut() {
            if matches(row, query) {
                if let (Some(obj), Some(changes)) = (row.as_object_mut(), patch.as_object()) {
                    for (k, v) in changes {
                        obj.insert(k.clone(), v.clone());
                    }
                }
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    fn delete(&self, table: &str, query: &Query) -> Result<Vec<Value>, MecalError> {
        self.check(table)?;
        let mut tables = self.tables.borrow_mut();
        let rows = tables.entry(table.to_string()).or_default();
        let (removed, kept): (Vec<Value>, Vec<Value>) =
            rows.drain(..).partition(|row| matches(row, query));
        *rows = kept;
        Ok(removed)
    }

    fn user_for_token(&self, token: &str) -> Result<Option<String>, MecalError> {
        self.check("auth")?;
        Ok(self.tokens.get(token).cloned())
    }
}
