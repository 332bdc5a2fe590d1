//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use api::config::Config;
use api::{AppState, Pipeline};
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use domain::InMemoryOrderRepository;
use futures_util::StreamExt;
use live_feed::FeedTopic;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup_with_state() -> (
    axum::Router,
    Arc<AppState<InMemoryOrderRepository>>,
    Pipeline,
) {
    let (state, pipeline) = api::create_default_state(&Config::default()).unwrap();
    let app = api::create_app(state.clone(), get_metrics_handle());
    (app, state, pipeline)
}

fn setup() -> axum::Router {
    setup_with_state().0
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn burger_order() -> Value {
    json!({
        "items": [{
            "menu_item_id": "burger",
            "name": "Burger",
            "quantity": 2,
            "unit_price_cents": 1000
        }]
    })
}

async fn json_body(response: Response<Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn create_order(app: &axum::Router) -> Value {
    let response = app
        .clone()
        .oneshot(post_json("/orders", burger_order()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    json_body(response).await
}

/// Reads the next chunk of a streaming body as text.
async fn next_chunk(body: &mut axum::body::BodyDataStream) -> String {
    let chunk = tokio::time::timeout(Duration::from_secs(20), body.next())
        .await
        .expect("no chunk before timeout")
        .expect("stream ended")
        .unwrap();
    String::from_utf8(chunk.to_vec()).unwrap()
}

mod system {
    use super::*;

    #[tokio::test]
    async fn test_health_check() {
        let app = setup();

        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["kitchen_streams"], 0);
    }

    #[tokio::test]
    async fn test_health_reports_shutdown() {
        let (app, state, _pipeline) = setup_with_state();
        state.hub.shutdown();

        let json = json_body(app.oneshot(get("/health")).await.unwrap()).await;
        assert_eq!(json["status"], "shutting_down");
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let app = setup();
        create_order(&app).await;

        let response = app.oneshot(get("/metrics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("orders_created_total"));
    }
}

mod orders {
    use super::*;

    #[tokio::test]
    async fn test_create_order() {
        let app = setup();

        let json = create_order(&app).await;
        assert_eq!(json["order_number"], "0001");
        assert_eq!(json["restaurant_id"], "restaurant_1");
        assert_eq!(json["total_cents"], 2000);
        assert_eq!(json["payment_method"], "cash");
        assert_eq!(json["payment_status"], "pending");
        assert_eq!(json["fulfillment_status"], "paid");
        assert_eq!(json["items"][0]["subtotal_cents"], 2000);
        assert!(json["paid_at"].is_null());
        assert!(json["id"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_order_numbers_are_sequential() {
        let app = setup();

        let first = create_order(&app).await;
        let second = create_order(&app).await;

        assert_eq!(first["order_number"], "0001");
        assert_eq!(second["order_number"], "0002");
    }

    #[tokio::test]
    async fn test_create_order_without_items_is_rejected() {
        let app = setup();

        let response = app
            .oneshot(post_json("/orders", json!({ "items": [] })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = json_body(response).await;
        assert!(json["error"].as_str().unwrap().contains("at least one"));
    }

    #[tokio::test]
    async fn test_create_order_with_zero_quantity_is_rejected() {
        let app = setup();

        let response = app
            .oneshot(post_json(
                "/orders",
                json!({
                    "items": [{
                        "menu_item_id": "fries",
                        "name": "Fries",
                        "quantity": 0,
                        "unit_price_cents": 300
                    }]
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unsupported_payment_method_is_rejected() {
        let app = setup();

        let mut body = burger_order();
        body["payment_method"] = json!("lightning");

        let response = app.oneshot(post_json("/orders", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_order_always_uses_configured_restaurant() {
        let app = setup();
        create_order(&app).await;

        let mut body = burger_order();
        body["restaurant_id"] = json!("other");
        let response = app
            .clone()
            .oneshot(post_json("/orders", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let json = json_body(response).await;
        assert_eq!(json["restaurant_id"], "restaurant_1");
        assert_eq!(json["order_number"], "0002");

        let board = json_body(app.oneshot(get("/kitchen/orders")).await.unwrap()).await;
        assert_eq!(board.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rejected_order_does_not_use_up_a_number() {
        let app = setup();

        let response = app
            .clone()
            .oneshot(post_json("/orders", json!({ "items": [] })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = create_order(&app).await;
        assert_eq!(json["order_number"], "0001");
    }

    #[tokio::test]
    async fn test_get_order_by_number() {
        let app = setup();
        let created = create_order(&app).await;

        let response = app.oneshot(get("/order/0001")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["id"], created["id"]);
    }

    #[tokio::test]
    async fn test_get_unknown_order_number() {
        let app = setup();

        let response = app.oneshot(get("/order/9999")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

mod kitchen {
    use super::*;

    async fn transition(app: &axum::Router, id: &str, action: &str) -> Response<Body> {
        app.clone()
            .oneshot(post(&format!("/kitchen/order/{id}/{action}")))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let app = setup();
        let created = create_order(&app).await;
        let id = created["id"].as_str().unwrap();

        for (action, event, status) in [
            ("mark-paid", "OrderPaid", "paid"),
            ("mark-preparing", "OrderPreparing", "preparing"),
            ("mark-ready", "OrderReady", "ready"),
            ("mark-completed", "OrderCompleted", "completed"),
        ] {
            let response = transition(&app, id, action).await;
            assert_eq!(response.status(), StatusCode::OK, "{action}");

            let json = json_body(response).await;
            assert_eq!(json["event"], event);
            assert_eq!(json["notified"], true);
            assert_eq!(json["order"]["fulfillment_status"], status);
        }

        let json = json_body(app.oneshot(get("/order/0001")).await.unwrap()).await;
        assert_eq!(json["payment_status"], "paid");
        assert!(json["completed_at"].is_string());
    }

    #[tokio::test]
    async fn test_preparing_requires_payment() {
        let app = setup();
        let created = create_order(&app).await;
        let id = created["id"].as_str().unwrap();

        let response = transition(&app, id, "mark-preparing").await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert!(json_body(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_mark_paid_twice_conflicts() {
        let app = setup();
        let created = create_order(&app).await;
        let id = created["id"].as_str().unwrap();

        assert_eq!(transition(&app, id, "mark-paid").await.status(), StatusCode::OK);
        assert_eq!(
            transition(&app, id, "mark-paid").await.status(),
            StatusCode::CONFLICT
        );
    }

    #[tokio::test]
    async fn test_skipping_a_stage_conflicts() {
        let app = setup();
        let created = create_order(&app).await;
        let id = created["id"].as_str().unwrap();

        transition(&app, id, "mark-paid").await;
        let response = transition(&app, id, "mark-completed").await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_unknown_order_is_not_found() {
        let app = setup();
        let id = uuid::Uuid::new_v4().to_string();

        let response = transition(&app, &id, "mark-paid").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_order_id_is_bad_request() {
        let app = setup();

        let response = transition(&app, "not-a-uuid", "mark-paid").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_kitchen_list_drops_completed_orders() {
        let app = setup();
        let first = create_order(&app).await;
        create_order(&app).await;

        let id = first["id"].as_str().unwrap();
        for action in ["mark-paid", "mark-preparing", "mark-ready", "mark-completed"] {
            transition(&app, id, action).await;
        }

        let json = json_body(app.oneshot(get("/kitchen/orders")).await.unwrap()).await;
        let orders = json.as_array().unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0]["order_number"], "0002");
    }
}

mod streams {
    use super::*;

    #[tokio::test]
    async fn test_stream_headers() {
        let app = setup();

        let response = app.oneshot(get("/kitchen/stream")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let headers = response.headers();
        assert_eq!(headers["content-type"], "text/event-stream");
        assert_eq!(headers["cache-control"], "no-cache");
        assert_eq!(headers["x-accel-buffering"], "no");
    }

    #[tokio::test]
    async fn test_kitchen_stream_receives_new_order() {
        let (app, _state, _pipeline) = setup_with_state();

        let response = app.clone().oneshot(get("/kitchen/stream")).await.unwrap();
        let mut body = response.into_body().into_data_stream();

        create_order(&app).await;

        let chunk = next_chunk(&mut body).await;
        assert!(chunk.starts_with("event: datastar-patch-elements\n"));
        assert!(chunk.contains("data: selector #orders-list\n"));
        assert!(chunk.contains("data: mode prepend\n"));
        assert!(chunk.contains("order-0001"));
        assert!(chunk.ends_with("\n\n"));
    }

    #[tokio::test]
    async fn test_order_stream_receives_status_updates() {
        let (app, _state, _pipeline) = setup_with_state();

        let response = app
            .clone()
            .oneshot(get("/order/0001/stream"))
            .await
            .unwrap();
        let mut body = response.into_body().into_data_stream();

        let created = create_order(&app).await;
        let id = created["id"].as_str().unwrap();
        app.clone()
            .oneshot(post(&format!("/kitchen/order/{id}/mark-paid")))
            .await
            .unwrap();

        // Order creation only reaches the kitchen.
        let chunk = next_chunk(&mut body).await;
        assert!(chunk.contains("id=\"order-status\""));
        assert!(chunk.contains("Order #0001: paid"));
    }

    #[tokio::test]
    async fn test_order_stream_ignores_other_orders() {
        let (app, _state, _pipeline) = setup_with_state();

        let own = create_order(&app).await;
        let mut foreign = burger_order();
        foreign["restaurant_id"] = json!("other");
        let response = app
            .clone()
            .oneshot(post_json("/orders", foreign))
            .await
            .unwrap();
        let other = json_body(response).await;

        let response = app
            .clone()
            .oneshot(get("/order/0001/stream"))
            .await
            .unwrap();
        let mut body = response.into_body().into_data_stream();

        let mark = |id: &Value, action: &str| {
            let uri = format!("/kitchen/order/{}/{action}", id["id"].as_str().unwrap());
            app.clone().oneshot(post(&uri))
        };
        for action in ["mark-paid", "mark-preparing"] {
            assert_eq!(mark(&other, action).await.unwrap().status(), StatusCode::OK);
        }
        for action in ["mark-paid", "mark-preparing", "mark-ready"] {
            assert_eq!(mark(&own, action).await.unwrap().status(), StatusCode::OK);
        }

        for label in ["paid", "preparing", "ready"] {
            let chunk = next_chunk(&mut body).await;
            assert!(
                chunk.contains(&format!("Order #0001: {label}")),
                "expected {label}, got {chunk}"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_stream_sends_keep_alive() {
        let app = setup();

        let response = app.oneshot(get("/kitchen/stream")).await.unwrap();
        let mut body = response.into_body().into_data_stream();

        let chunk = next_chunk(&mut body).await;
        assert_eq!(chunk, ": keepalive\n\n");
    }

    #[tokio::test]
    async fn test_dropping_the_body_deregisters() {
        let (app, state, _pipeline) = setup_with_state();

        let response = app.clone().oneshot(get("/kitchen/stream")).await.unwrap();
        assert_eq!(state.hub.subscriber_count(&FeedTopic::Kitchen), 1);

        let json = json_body(app.clone().oneshot(get("/health")).await.unwrap()).await;
        assert_eq!(json["kitchen_streams"], 1);

        drop(response);
        assert_eq!(state.hub.subscriber_count(&FeedTopic::Kitchen), 0);
        assert_eq!(state.hub.topic_count(), 0);
    }

    #[tokio::test]
    async fn test_hub_shutdown_ends_open_streams() {
        let (app, _state, pipeline) = setup_with_state();

        let response = app.oneshot(get("/kitchen/stream")).await.unwrap();
        let mut body = response.into_body().into_data_stream();

        pipeline.shutdown(Duration::from_secs(1)).await;

        let end = tokio::time::timeout(Duration::from_secs(5), body.next())
            .await
            .unwrap();
        assert!(end.is_none());
    }
}
