// ============================================================================
// src/query/filter.rs - Conjunctive record filters
// ============================================================================
//
// A Filter is an AND of column predicates. NULL follows SQL rules: every
// comparison against NULL is false, only IS NULL / IS NOT NULL inspect it.
//
// ============================================================================

use std::cmp::Ordering;
use std::fmt;

use crate::core::{Record, Result, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    IsNull,
    IsNotNull,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::IsNull => "IS NULL",
            Self::IsNotNull => "IS NOT NULL",
        };
        f.write_str(symbol)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: String,
    pub op: CompareOp,
    pub value: Value,
}

impl Predicate {
    pub fn new(column: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    pub fn matches(&self, record: &Record) -> Result<bool> {
        let actual = record.get(&self.column);

        let ordering = || actual.compare(&self.value);

        Ok(match self.op {
            CompareOp::IsNull => actual.is_null(),
            CompareOp::IsNotNull => !actual.is_null(),
            _ if actual.is_null() || self.value.is_null() => false,
            CompareOp::Eq => ordering()? == Ordering::Equal,
            CompareOp::NotEq => ordering()? != Ordering::Equal,
            CompareOp::Lt => ordering()? == Ordering::Less,
            CompareOp::LtEq => ordering()? != Ordering::Greater,
            CompareOp::Gt => ordering()? == Ordering::Greater,
            CompareOp::GtEq => ordering()? != Ordering::Less,
        })
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            CompareOp::IsNull | CompareOp::IsNotNull => write!(f, "{} {}", self.column, self.op),
            _ => write!(f, "{} {} {}", self.column, self.op, self.value),
        }
    }
}

/// AND of predicates. An empty filter matches every record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    predicates: Vec<Predicate>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(Predicate::new(column, CompareOp::Eq, value))
    }

    pub fn not_eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(Predicate::new(column, CompareOp::NotEq, value))
    }

    pub fn lt(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(Predicate::new(column, CompareOp::Lt, value))
    }

    pub fn lt_eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(Predicate::new(column, CompareOp::LtEq, value))
    }

    pub fn gt(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(Predicate::new(column, CompareOp::Gt, value))
    }

    pub fn gt_eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(Predicate::new(column, CompareOp::GtEq, value))
    }

    pub fn is_null(self, column: impl Into<String>) -> Self {
        self.and(Predicate::new(column, CompareOp::IsNull, Value::Null))
    }

    pub fn is_not_null(self, column: impl Into<String>) -> Self {
        self.and(Predicate::new(column, CompareOp::IsNotNull, Value::Null))
    }

    /// Appends every predicate of `other`.
    pub fn merge(mut self, other: &Filter) -> Self {
        self.predicates.extend(other.predicates.iter().cloned());
        self
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn matches(&self, record: &Record) -> Result<bool> {
        for predicate in &self.predicates {
            if !predicate.matches(record)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.predicates.is_empty() {
            return f.write_str("TRUE");
        }
        for (i, predicate) in self.predicates.iter().enumerate() {
            if i > 0 {
                f.write_str(" AND ")?;
            }
            write!(f, "{}", predicate)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs;
    use chrono::{Duration, Utc};

    fn record() -> Record {
        Record::new(
            "bacon_flavours",
            attrs! { "name" => "chunky", "pending" => true, "rating" => 4i64 },
        )
    }

    #[test]
    fn test_conjunction() {
        let filter = Filter::new().eq("pending", true).gt("rating", 3i64);
        assert!(filter.matches(&record()).unwrap());

        let filter = filter.eq("name", "smoked");
        assert!(!filter.matches(&record()).unwrap());
    }

    #[test]
    fn test_null_comparisons_are_false() {
        let filter = Filter::new().not_eq("missing", 1i64);
        assert!(!filter.matches(&record()).unwrap());

        assert!(Filter::new().is_null("missing").matches(&record()).unwrap());
        assert!(Filter::new().is_not_null("name").matches(&record()).unwrap());
    }

    #[test]
    fn test_null_operand_fails_every_ordering() {
        for filter in [
            Filter::new().eq("missing", 1i64),
            Filter::new().lt("missing", 1i64),
            Filter::new().gt_eq("missing", 1i64),
            Filter::new().eq("pending", Value::Null),
            Filter::new().not_eq("pending", Value::Null),
        ] {
            assert!(!filter.matches(&record()).unwrap(), "{}", filter);
        }
        assert!(!Filter::new().is_null("pending").matches(&record()).unwrap());
    }

    #[test]
    fn test_timestamp_cutoff() {
        let now = Utc::now();
        let mut old = record();
        old.set("created_at", now - Duration::days(8));

        let filter = Filter::new()
            .eq("pending", true)
            .lt("created_at", now - Duration::weeks(1));
        assert!(filter.matches(&old).unwrap());
    }

    #[test]
    fn test_type_mismatch_propagates() {
        let filter = Filter::new().eq("name", 1i64);
        assert!(filter.matches(&record()).is_err());
    }

    #[test]
    fn test_display() {
        let filter = Filter::new().eq("pending", false).is_null("deleted_at");
        assert_eq!(filter.to_string(), "pending = false AND deleted_at IS NULL");
        assert_eq!(Filter::new().to_string(), "TRUE");
    }
}
