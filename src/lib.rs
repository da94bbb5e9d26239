pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod request;
pub mod session;
pub mod surface;
