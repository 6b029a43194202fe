//! Feature tables with named, ordered columns
//!
//! A table is the unit handed to the pipeline: its header is checked against
//! the fitted column list, so column order is part of the contract.

use serde_json::Value;
use std::collections::HashSet;

use crate::errors::{CoreError, Result};

/// A single cell value
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Number(f64),
    Category(String),
    /// Sentinel for a feature absent from the input
    Missing,
}

impl FeatureValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, FeatureValue::Missing)
    }

    pub fn to_json(&self) -> Value {
        match self {
            FeatureValue::Number(v) => serde_json::Number::from_f64(*v)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FeatureValue::Category(s) => Value::String(s.clone()),
            FeatureValue::Missing => Value::Null,
        }
    }
}

/// Row-major table with a unique, ordered column header
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    columns: Vec<String>,
    rows: Vec<Vec<FeatureValue>>,
}

impl FeatureTable {
    /// Create an empty table; fails if a column name repeats
    pub fn new(columns: Vec<String>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(CoreError::DuplicateColumn(column.clone()));
            }
        }

        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    /// Build a one-row table
    pub fn single_row(columns: Vec<String>, row: Vec<FeatureValue>) -> Result<Self> {
        let mut table = Self::new(columns)?;
        table.push_row(row)?;
        Ok(table)
    }

    pub fn push_row(&mut self, row: Vec<FeatureValue>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(CoreError::RowLength {
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<FeatureValue>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Keep only the rows at `indices`, in the given order
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// Names of the columns holding the missing sentinel in `row`
    pub fn missing_columns(&self, row: usize) -> Vec<&str> {
        self.rows
            .get(row)
            .map(|cells| {
                self.columns
                    .iter()
                    .zip(cells)
                    .filter(|(_, cell)| cell.is_missing())
                    .map(|(name, _)| name.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }
}
