//! 应用状态定义

use std::sync::Arc;

use crate::service::MassNotificationService;

/// Axum 应用共享状态
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<MassNotificationService>,
}

impl AppState {
    pub fn new(service: Arc<MassNotificationService>) -> Self {
        Self { service }
    }
}
