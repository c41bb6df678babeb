//! Middleware de Tower aplicado a todas las requests.
//!
//! - `RequestIdLayer`: asigna o propaga `x-request-id`
//! - `LoggingLayer`: un span por request con su resultado

mod logging;
mod request_id;

pub use logging::{LoggingLayer, LoggingMiddleware};
pub use request_id::{REQUEST_ID_HEADER, RequestIdLayer, RequestIdMiddleware, request_id};
