//! HTTP API server for the booking engine.
//!
//! Exposes availability queries, the reservation flow, manual
//! cancellation, and the payment gateway callbacks, with structured
//! logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use calendar::AvailabilityCalendar;
use domain::{
    Currency, InMemoryCatalog, InventoryItem, ItemCategory, Location, Money, PricingConfig,
};
use metrics_exporter_prometheus::PrometheusHandle;
use notifications::{InMemoryProvider, NotificationDispatcher, RetryWorker};
use reservations::{BookingOrchestrator, InMemoryGateway, RateLimiter};
use settlement::{PaymentEventProcessor, WebhookVerifier};
use store::{InMemoryStore, Store};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use common::ItemId;
use config::Config;
use routes::bookings::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route("/availability/check", post(routes::availability::check::<S>))
        .route("/bookings", post(routes::bookings::create::<S>))
        .route("/bookings/{id}", get(routes::bookings::get::<S>))
        .route("/bookings/{id}/cancel", post(routes::bookings::cancel::<S>))
        .route("/webhooks/payment", post(routes::webhooks::payment::<S>))
        .route("/ipn/payment", post(routes::webhooks::ipn::<S>))
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

/// Fully wired in-memory services: the app state plus handles to the
/// fakes so tests and local tooling can steer them.
pub struct Services {
    pub state: Arc<AppState<InMemoryStore>>,
    pub store: InMemoryStore,
    pub catalog: Arc<InMemoryCatalog>,
    pub gateway: Arc<InMemoryGateway>,
    pub providers: Vec<Arc<InMemoryProvider>>,
    pub worker: RetryWorker<InMemoryStore>,
}

/// Creates the default application state over the in-memory store and
/// in-memory collaborators.
pub fn create_default_state(config: &Config) -> Services {
    let store = InMemoryStore::new();
    let catalog = Arc::new(InMemoryCatalog::new());
    let gateway = Arc::new(InMemoryGateway::new());

    let calendar = Arc::new(AvailabilityCalendar::new(
        catalog.clone(),
        store.clone(),
        chrono::Duration::minutes(config.hold_ttl_minutes),
    ));

    let orchestrator = BookingOrchestrator::new(
        store.clone(),
        calendar.clone(),
        catalog.clone(),
        gateway.clone(),
        PricingConfig::default(),
        RateLimiter::new(
            config.rate_limit_max,
            std::time::Duration::from_secs(config.rate_limit_window_secs),
        ),
    );

    let providers: Vec<Arc<InMemoryProvider>> = vec![
        Arc::new(InMemoryProvider::new("email-primary")),
        Arc::new(InMemoryProvider::new("email-backup")),
    ];
    let dispatcher = Arc::new(NotificationDispatcher::new(
        providers
            .iter()
            .map(|p| p.clone() as Arc<dyn notifications::NotificationProvider>)
            .collect(),
        store.clone(),
    ));

    let processor = PaymentEventProcessor::new(
        store.clone(),
        dispatcher.clone(),
        gateway.clone(),
        WebhookVerifier::new(config.webhook_secret.as_bytes().to_vec()),
        config.ops_email.clone(),
    );

    let worker = RetryWorker::new(
        store.clone(),
        dispatcher,
        config.notify_max_attempts,
        50,
        config.ops_email.clone(),
    );

    let state = Arc::new(AppState {
        orchestrator,
        calendar,
        processor,
        store: store.clone(),
    });

    Services {
        state,
        store,
        catalog,
        gateway,
        providers,
        worker,
    }
}

/// Loads a handful of items so a fresh local instance has something to
/// book.
pub async fn seed_demo_catalog(catalog: &InMemoryCatalog) {
    let items = [
        InventoryItem {
            id: ItemId::new("car-phantom-01"),
            category: ItemCategory::Car,
            base_price: Money::from_major(1_000, Currency::Usd),
            locations: vec![Location::Miami],
            min_rental_nights: 1,
            blackout_ranges: vec![],
        },
        InventoryItem {
            id: ItemId::new("yacht-azzurra-01"),
            category: ItemCategory::Yacht,
            base_price: Money::from_major(12_000, Currency::Eur),
            locations: vec![Location::Monaco],
            min_rental_nights: 3,
            blackout_ranges: vec![],
        },
        InventoryItem {
            id: ItemId::new("jet-g650-01"),
            category: ItemCategory::Jet,
            base_price: Money::from_major(45_000, Currency::Usd),
            locations: vec![Location::Miami, Location::Dubai],
            min_rental_nights: 1,
            blackout_ranges: vec![],
        },
        InventoryItem {
            id: ItemId::new("villa-mayfair-01"),
            category: ItemCategory::Property,
            base_price: Money::from_major(3_500, Currency::Gbp),
            locations: vec![Location::London],
            min_rental_nights: 2,
            blackout_ranges: vec![],
        },
    ];
    for item in items {
        catalog.insert(item).await;
    }
}

/// Periodically purges expired holds. Intended to be spawned as a
/// background task.
pub async fn run_hold_sweeper<S: Store>(
    calendar: Arc<AvailabilityCalendar<S>>,
    poll_interval: std::time::Duration,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if let Err(e) = calendar.sweep_expired().await {
            tracing::error!(error = %e, "hold sweep failed");
        }
    }
}
