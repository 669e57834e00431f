pub mod cli;
pub mod coap;
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod loader;
pub mod logging;
pub mod model;
pub mod observe;
pub mod registration;
pub mod router;
