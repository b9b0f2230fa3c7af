//! API shared state

use std::sync::Arc;

use crate::notifications::NotificationManager;

/// State handed to every handler
#[derive(Clone)]
pub struct ApiState {
    pub manager: Arc<NotificationManager>,
}

impl ApiState {
    pub fn new(manager: Arc<NotificationManager>) -> Self {
        Self { manager }
    }
}
