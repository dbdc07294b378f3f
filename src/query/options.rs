use std::cmp::Ordering;

use crate::core::{Record, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub direction: SortDirection,
}

/// Ordering and paging applied after filtering.
///
/// Without an explicit `order_by`, results come back in id order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by = Some(OrderBy {
            column: column.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Sorts, then pages. NULLs land last ascending and first descending.
    pub(crate) fn apply(&self, mut records: Vec<Record>) -> Result<Vec<Record>> {
        if let Some(order) = &self.order_by {
            let mut failure = None;
            records.sort_by(|a, b| {
                let ordering = match a.get(&order.column).compare(b.get(&order.column)) {
                    Ok(ordering) => ordering,
                    Err(err) => {
                        failure.get_or_insert(err);
                        Ordering::Equal
                    }
                };
                let ordering = match order.direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                };
                ordering.then_with(|| a.id().cmp(&b.id()))
            });
            if let Some(err) = failure {
                return Err(err);
            }
        } else {
            records.sort_by_key(|record| record.id());
        }

        let paged = records.into_iter().skip(self.offset);
        Ok(match self.limit {
            Some(limit) => paged.take(limit).collect(),
            None => paged.collect(),
        })
    }
}
