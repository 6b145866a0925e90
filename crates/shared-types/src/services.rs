//! # Optional Host Services
//!
//! Contracts for the optional services a host may offer to remote modules.
//! Every service is capability-checked by name; a module that asks for a
//! service the host does not provide receives `None`, never a panic.

use serde::{Deserialize, Serialize};

/// Capability names used in descriptors.
pub mod capabilities {
    pub const AUTH: &str = "auth";
    pub const NOTIFICATION: &str = "notification";
    pub const MODAL: &str = "modal";
}

/// The signed-in user, as seen by remote modules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

pub trait AuthService: Send + Sync {
    /// Current session, if any.
    fn session(&self) -> Option<AuthSession>;

    fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }

    fn has_role(&self, role: &str) -> bool {
        self.session()
            .map(|s| s.roles.iter().any(|r| r == role))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
}

pub trait NotificationService: Send + Sync {
    fn notify(&self, notification: Notification);

    fn info(&self, title: &str, message: &str) {
        self.notify(Notification {
            level: NotificationLevel::Info,
            title: title.to_string(),
            message: message.to_string(),
        });
    }

    fn error(&self, title: &str, message: &str) {
        self.notify(Notification {
            level: NotificationLevel::Error,
            title: title.to_string(),
            message: message.to_string(),
        });
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModalRequest {
    pub title: String,
    pub body: String,
}

pub trait ModalService: Send + Sync {
    fn open(&self, request: ModalRequest);
    fn close(&self);
}
