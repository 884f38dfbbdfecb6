pub mod config;
pub mod logging;

pub mod api;
pub mod book;
pub mod cancel;
pub mod dispatcher;
pub mod retry;
pub mod session;
pub mod transport;
