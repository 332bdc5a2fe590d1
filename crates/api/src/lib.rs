//! HTTP server for the order-fulfillment pipeline.
//!
//! Provides the order and kitchen command endpoints, the live Server-Sent
//! Events streams, structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use domain::{EventKind, InMemoryOrderRepository, OrderRepository, OrderService, RestaurantId};
use event_bus::EventBus;
use live_feed::BroadcastHub;
use metrics_exporter_prometheus::PrometheusHandle;
use notifications::{
    LiveUpdateHandler, NotificationProcessor, PlainFragmentRenderer, ProcessorHandle,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;

/// Shared application state accessible from all handlers.
pub struct AppState<R: OrderRepository> {
    pub orders: OrderService<R>,
    pub hub: BroadcastHub,
    /// Restaurant served by this instance.
    pub restaurant_id: RestaurantId,
    /// Interval between keep-alive comments on open streams.
    pub keep_alive: Duration,
}

/// Background half of the application: the bus, the hub and the loops
/// between them.
pub struct Pipeline {
    pub bus: EventBus<EventKind>,
    pub hub: BroadcastHub,
    processor: ProcessorHandle,
}

impl Pipeline {
    /// Stops the pipeline.
    ///
    /// Open streams end first, then the bus stops accepting events and the
    /// handlers get `grace` to finish what was already published.
    pub async fn shutdown(self, grace: Duration) {
        self.hub.shutdown();
        self.bus.close();

        if let Err(e) = self.bus.drain(grace).await {
            tracing::warn!(error = %e, "handlers did not finish in time, aborting");
            self.processor.abort();
        }
        self.processor.join().await;

        tracing::info!("pipeline stopped");
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<R: OrderRepository + 'static>(
    state: Arc<AppState<R>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::system::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::system::health::<R>))
        .route("/orders", post(routes::orders::create::<R>))
        .route("/order/{number}", get(routes::orders::get_by_number::<R>))
        .route("/order/{number}/stream", get(routes::stream::order::<R>))
        .route("/kitchen/stream", get(routes::stream::kitchen::<R>))
        .route("/kitchen/orders", get(routes::kitchen::list::<R>))
        .route("/kitchen/order/{id}/mark-paid", post(routes::kitchen::mark_paid::<R>))
        .route(
            "/kitchen/order/{id}/mark-preparing",
            post(routes::kitchen::mark_preparing::<R>),
        )
        .route("/kitchen/order/{id}/mark-ready", post(routes::kitchen::mark_ready::<R>))
        .route(
            "/kitchen/order/{id}/mark-completed",
            post(routes::kitchen::mark_completed::<R>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the in-memory repository, bus, hub and notification loops.
///
/// Must be called from within a Tokio runtime.
pub fn create_default_state(
    config: &Config,
) -> Result<(Arc<AppState<InMemoryOrderRepository>>, Pipeline), event_bus::BusError> {
    let repository = InMemoryOrderRepository::new();
    let bus = EventBus::new();
    let hub = BroadcastHub::new(config.feed_queue_capacity);

    let handler = LiveUpdateHandler::new(
        repository.clone(),
        Arc::new(PlainFragmentRenderer),
        hub.clone(),
    );
    let processor = NotificationProcessor::start(&bus, Arc::new(handler))?;

    let state = Arc::new(AppState {
        orders: OrderService::new(repository, bus.clone()),
        hub: hub.clone(),
        restaurant_id: RestaurantId::new(config.restaurant_id.clone()),
        keep_alive: config.keep_alive,
    });

    Ok((
        state,
        Pipeline {
            bus,
            hub,
            processor,
        },
    ))
}
