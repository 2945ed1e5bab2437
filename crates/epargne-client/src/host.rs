//! The embedding application: user notices and navigation.

use std::{sync::Arc, time::Duration};

/// Path of the maintenance page.
pub const MAINTENANCE_PATH: &str = "/maintenance";

/// Path users are sent to when their session cannot be renewed.
pub const ROOT_PATH: &str = "/";

/// Default delay between a notice and the redirect that follows it.
pub const DEFAULT_REDIRECT_DELAY: Duration = Duration::from_secs(2);

/// Severity of a [Notice].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Something the user should know about.
    Warning,
    /// Something went wrong.
    Error,
}

/// A message for the user, typically rendered as a toast.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Text shown to the user.
    pub message: String,
}

impl Notice {
    pub(crate) fn maintenance() -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: "Le service est en maintenance, veuillez réessayer plus tard.".to_string(),
        }
    }

    pub(crate) fn session_expired() -> Self {
        Self {
            level: NoticeLevel::Error,
            message: "Votre session a expiré, veuillez vous reconnecter.".to_string(),
        }
    }
}

/// The application hosting the client.
pub trait Host: Send + Sync {
    /// The path currently displayed, if known.
    fn current_path(&self) -> Option<String>;

    /// Show a notice to the user.
    fn notify(&self, notice: Notice);

    /// Navigate to `path`.
    fn navigate(&self, path: &str);
}

/// A [Host] without a user interface, which only logs.
#[derive(Default)]
pub struct LoggingHost;

impl Host for LoggingHost {
    fn current_path(&self) -> Option<String> {
        None
    }

    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Warning => tracing::warn!(text = %notice.message, "notice"),
            NoticeLevel::Error => tracing::error!(text = %notice.message, "notice"),
        }
    }

    fn navigate(&self, path: &str) {
        tracing::info!(%path, "navigate");
    }
}

/// Navigate to `path` after `delay`, unless the host is already there.
///
/// Requires a tokio runtime.
pub(crate) fn schedule_redirect(host: Arc<dyn Host>, path: &'static str, delay: Duration) {
    if host.current_path().as_deref() == Some(path) {
        tracing::debug!(%path, "already on redirect target");
        return;
    }

    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        host.navigate(path);
    });
}
