//! Notification click routing.
//!
//! [`route_click`] depends only on the notification's persisted data and the
//! clicked action, so a click arriving after a restart routes the same way.

use std::sync::Arc;

use serde::Serialize;

use super::{ACTION_VIEW, HostNavigator, NotificationData, NotificationPlatform};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct NavigationDirective {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct ClickOutcome {
    pub close: bool,
    pub navigate: Option<NavigationDirective>,
}

/// Decide what a click does.
///
/// `view` and a plain body click (no action) navigate; `dismiss` and unknown
/// actions only close the notification.
pub fn route_click(data: &NotificationData, action: Option<&str>) -> ClickOutcome {
    let navigates = matches!(action.map(str::trim), None | Some("") | Some(ACTION_VIEW));
    let navigate = navigates.then(|| NavigationDirective { path: target_path(data) });
    ClickOutcome { close: true, navigate }
}

fn target_path(data: &NotificationData) -> String {
    match (data.show_id, data.url.as_deref()) {
        (Some(show_id), _) => format!("/show/{show_id}"),
        (None, Some(url)) if url.starts_with('/') => url.to_string(),
        _ => "/".to_string(),
    }
}

/// Applies a [`ClickOutcome`]: closes the notification and asks the host to navigate.
pub struct ClickHandler {
    platform: Arc<dyn NotificationPlatform>,
    navigator: Arc<dyn HostNavigator>,
}

impl ClickHandler {
    pub fn new(platform: Arc<dyn NotificationPlatform>, navigator: Arc<dyn HostNavigator>) -> Self {
        Self { platform, navigator }
    }

    /// Close and navigate. Failures of either step are logged; the computed
    /// outcome is returned regardless.
    pub async fn handle(&self, tag: &str, data: &NotificationData, action: Option<&str>) -> ClickOutcome {
        let outcome = route_click(data, action);

        if let Err(e) = self.platform.close(tag).await {
            tracing::warn!(tag, error = %e, "failed to close clicked notification");
        }

        if let Some(directive) = &outcome.navigate {
            tracing::info!(tag, path = %directive.path, "notification click opens window");
            if let Err(e) = self.navigator.open_window(&directive.path).await {
                tracing::warn!(tag, path = %directive.path, error = %e, "host navigation failed");
            }
        }

        outcome
    }
}
