//! Rendering collaborator for live views.

use std::fmt::Write;

use domain::Order;

use crate::RenderError;

/// Opaque markup for one element of a live view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment(String);

impl Fragment {
    pub fn new(markup: impl Into<String>) -> Self {
        Self(markup.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Fragment {
    fn from(markup: String) -> Self {
        Self(markup)
    }
}

/// Turns the current state of an order into markup.
pub trait FragmentRenderer: Send + Sync {
    /// The card shown on the kitchen board.
    fn order_card(&self, order: &Order) -> Result<Fragment, RenderError>;

    /// The status panel shown to the customer who placed the order.
    fn order_status(&self, order: &Order) -> Result<Fragment, RenderError>;
}

/// Minimal single-line markup, used when no template layer is plugged in.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainFragmentRenderer;

impl PlainFragmentRenderer {
    fn status_label(order: &Order) -> &'static str {
        if order.is_awaiting_payment() {
            "awaiting payment"
        } else {
            order.fulfillment_status().as_str()
        }
    }
}

impl FragmentRenderer for PlainFragmentRenderer {
    fn order_card(&self, order: &Order) -> Result<Fragment, RenderError> {
        let mut items = String::new();
        for (i, line) in order.lines().iter().enumerate() {
            if i > 0 {
                items.push_str(", ");
            }
            write!(items, "{} x{}", escape(line.name()), line.quantity())
                .map_err(|e| RenderError::Template(e.to_string()))?;
        }

        Ok(Fragment(format!(
            "<div id=\"order-{number}\" class=\"order-card {status}\" data-payment=\"{payment}\">\
             <strong>#{number}</strong> {items} <span>{total}</span> <em>{label}</em></div>",
            number = escape(order.order_number().as_str()),
            status = order.fulfillment_status(),
            payment = order.payment_status(),
            total = order.total_amount(),
            label = Self::status_label(order),
        )))
    }

    fn order_status(&self, order: &Order) -> Result<Fragment, RenderError> {
        Ok(Fragment(format!(
            "<div id=\"order-status\" class=\"{status}\">Order #{number}: {label}</div>",
            number = escape(order.order_number().as_str()),
            status = order.fulfillment_status(),
            label = Self::status_label(order),
        )))
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
