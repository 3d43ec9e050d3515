//! HTTP API
//!
//! JSON 接口，字段使用 camelCase，响应统一包装为 `ApiResponse`。

pub mod dto;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::api_routes;
pub use state::AppState;
