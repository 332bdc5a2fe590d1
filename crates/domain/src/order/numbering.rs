//! Per-restaurant order number sequence.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use common::{OrderNumber, RestaurantId};

/// Hands out human-facing order numbers: `0001`, `0002`, ...
///
/// Each restaurant has its own counter. Numbers past `9999` keep counting
/// with more digits.
#[derive(Debug, Default)]
pub(crate) struct OrderNumberSequence {
    counters: Mutex<HashMap<RestaurantId, u64>>,
}

impl OrderNumberSequence {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the next number for `restaurant_id`.
    pub(crate) fn next(&self, restaurant_id: &RestaurantId) -> OrderNumber {
        let mut counters = self
            .counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let counter = counters.entry(restaurant_id.clone()).or_insert(0);
        *counter += 1;
        format_order_number(*counter)
    }

    /// Gives `order_number` back if it is still the latest one handed out
    /// for `restaurant_id`. Returns whether it was taken back.
    ///
    /// A number released after a later one was issued stays unused.
    pub(crate) fn release(&self, restaurant_id: &RestaurantId, order_number: &OrderNumber) -> bool {
        let mut counters = self
            .counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match counters.get_mut(restaurant_id) {
            Some(counter) if *counter > 0 && format_order_number(*counter) == *order_number => {
                *counter -= 1;
                true
            }
            _ => false,
        }
    }
}

pub(crate) fn format_order_number(sequence: u64) -> OrderNumber {
    OrderNumber::new(format!("{sequence:04}"))
}
