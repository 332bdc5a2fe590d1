//! Payment and fulfillment state machines.

use serde::{Deserialize, Serialize};

/// Whether funds for an order have been confirmed.
///
/// ```text
/// Pending ──┬──► Paid
///           ├──► Failed
///           └──► Expired
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Awaiting confirmation (cash not yet collected, invoice not yet settled).
    #[default]
    Pending,

    /// Funds confirmed.
    Paid,

    /// The payment attempt failed (terminal).
    Failed,

    /// The payment request expired before it was settled (terminal).
    Expired,
}

impl PaymentStatus {
    /// Returns true if payment can still be confirmed.
    pub fn can_mark_paid(&self) -> bool {
        matches!(self, PaymentStatus::Pending)
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, PaymentStatus::Paid)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Expired => "expired",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kitchen-side progress of an order.
///
/// State transitions:
/// ```text
/// Paid ──► Preparing ──► Ready ──► Completed
/// ```
///
/// The status only moves one step forward at a time; it never regresses.
/// `Paid` is the initial status of every order and does not imply that
/// payment has been confirmed: see [`PaymentStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FulfillmentStatus {
    /// Order placed and queued for the kitchen.
    #[default]
    Paid,

    /// Kitchen is preparing the order.
    Preparing,

    /// Order is ready for pickup.
    Ready,

    /// Order has been handed over (terminal state).
    Completed,
}

impl FulfillmentStatus {
    /// Statuses reachable in one step from this one.
    pub fn allowed_next(&self) -> &'static [FulfillmentStatus] {
        match self {
            FulfillmentStatus::Paid => &[FulfillmentStatus::Preparing],
            FulfillmentStatus::Preparing => &[FulfillmentStatus::Ready],
            FulfillmentStatus::Ready => &[FulfillmentStatus::Completed],
            FulfillmentStatus::Completed => &[],
        }
    }

    /// Returns true if `target` is in the transition table for this status.
    pub fn can_transition_to(&self, target: FulfillmentStatus) -> bool {
        self.allowed_next().contains(&target)
    }

    /// Position in the progression, starting at 0 for `Paid`.
    pub fn rank(&self) -> u8 {
        match self {
            FulfillmentStatus::Paid => 0,
            FulfillmentStatus::Preparing => 1,
            FulfillmentStatus::Ready => 2,
            FulfillmentStatus::Completed => 3,
        }
    }

    /// Returns true for orders still on the kitchen board.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            FulfillmentStatus::Paid | FulfillmentStatus::Preparing | FulfillmentStatus::Ready
        )
    }

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        self.allowed_next().is_empty()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentStatus::Paid => "paid",
            FulfillmentStatus::Preparing => "preparing",
            FulfillmentStatus::Ready => "ready",
            FulfillmentStatus::Completed => "completed",
        }
    }

    /// Every status, in progression order.
    pub const ALL: [FulfillmentStatus; 4] = [
        FulfillmentStatus::Paid,
        FulfillmentStatus::Preparing,
        FulfillmentStatus::Ready,
        FulfillmentStatus::Completed,
    ];
}

impl std::fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the customer chose to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Paid at the counter; confirmed manually by staff.
    #[default]
    Cash,

    /// Paid through a Lightning invoice.
    Lightning,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Lightning => "lightning",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
