//! # labcast-observability
//!
//! Observability-Crate fuer Labcast:
//! - Health-Check-Endpunkt (`/health`) mit DB-Status und Abonnentenzahlen
//! - Structured Logging via tracing-subscriber (text oder json)
//! - Request-Timing Middleware fuer die REST-API

pub mod health;
pub mod logging;
pub mod middleware;

pub use health::{health_router, HealthResponse, HealthState, HealthStatus};
pub use logging::logging_initialisieren;
pub use middleware::timing_middleware;
