//! Domain layer of the order-fulfillment pipeline.
//!
//! This crate provides:
//! - the [`Order`] aggregate with its payment and fulfillment state machines
//! - [`OrderEvent`], the closed set of events published after each transition
//! - the [`OrderRepository`] persistence interface and an in-memory implementation
//! - the [`PaymentGateway`] collaborator used when an order is placed
//! - [`OrderService`], the order use cases (create, mark paid/preparing/ready/completed)

pub mod error;
pub mod memory;
pub mod order;
pub mod payment;
pub mod repository;

pub use error::DomainError;
pub use memory::InMemoryOrderRepository;
pub use order::{
    CreateOrder, EventKind, FulfillmentStatus, Money, Order, OrderCompletedData, OrderCreatedData,
    OrderError, OrderEvent, OrderLine, OrderOutcome, OrderPaidData, OrderPreparingData,
    OrderReadyData, OrderRef, OrderService, PaymentMethod, PaymentStatus,
};
pub use payment::{CashPayment, PaymentError, PaymentGateway, PaymentReceipt};
pub use repository::{OrderRepository, RepositoryError};

pub use common::{MenuItemId, OrderId, OrderNumber, PaymentId, RestaurantId};
