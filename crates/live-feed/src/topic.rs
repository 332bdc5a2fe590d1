//! Feed topics.

use std::fmt;

use common::OrderNumber;

/// A live feed clients can stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeedTopic {
    /// Every order of the restaurant, for kitchen staff.
    Kitchen,

    /// A single order, for the customer who placed it.
    Order(String),
}

impl FeedTopic {
    pub fn order(order_number: &OrderNumber) -> Self {
        FeedTopic::Order(order_number.as_str().to_owned())
    }
}

impl fmt::Display for FeedTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedTopic::Kitchen => f.write_str("kitchen"),
            FeedTopic::Order(number) => write!(f, "order:{number}"),
        }
    }
}
