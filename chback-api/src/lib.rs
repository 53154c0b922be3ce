//! HTTP surface of the chback rating backend

pub mod api;
pub mod error;
pub mod handlers;
pub mod server;
pub mod shutdown;

pub use api::build_router;
pub use error::{ApiError, ApiResult};
pub use server::ApiServer;
pub use shutdown::Shutdown;
