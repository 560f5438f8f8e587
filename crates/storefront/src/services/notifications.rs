//! Toasts and the notification inbox.
//!
//! [`Notifier`] holds short-lived messages shown on top of the current
//! screen (order placed, write failed). [`Inbox`] is the persistent list
//! behind the notifications screen, with read/unread tracking.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use techshop_core::{NotificationId, NotificationKind, UserId};

/// Seconds a toast stays visible unless the caller asks otherwise.
pub const DEFAULT_TOAST_SECS: i64 = 5;

// =============================================================================
// Toasts
// =============================================================================

/// Visual style of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastVariant {
    #[default]
    Default,
    Destructive,
}

/// A transient message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: NotificationId,
    pub title: String,
    pub description: Option<String>,
    pub variant: ToastVariant,
    pub expires_at: DateTime<Utc>,
}

impl Toast {
    /// Whether the toast should still be shown at `now`.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Builder-style request for a new toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToastRequest {
    pub title: String,
    pub description: Option<String>,
    pub variant: ToastVariant,
    pub duration: Option<Duration>,
}

impl ToastRequest {
    /// A plain informational toast.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            variant: ToastVariant::Default,
            duration: None,
        }
    }

    /// A toast reporting a failure.
    #[must_use]
    pub fn destructive(title: impl Into<String>) -> Self {
        Self {
            variant: ToastVariant::Destructive,
            ..Self::new(title)
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}

/// Collects toasts and drops them once they expire.
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    toasts: Vec<Toast>,
}

impl Notifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Show a toast, returning its id.
    pub fn push(&mut self, request: ToastRequest) -> NotificationId {
        self.push_at(request, Utc::now())
    }

    /// Show a toast as if it were created at `now`.
    pub fn push_at(&mut self, request: ToastRequest, now: DateTime<Utc>) -> NotificationId {
        let id = NotificationId::generate();
        let duration = request
            .duration
            .unwrap_or_else(|| Duration::seconds(DEFAULT_TOAST_SECS));
        tracing::debug!(toast_id = %id, title = %request.title, "Toast");
        self.toasts.push(Toast {
            id: id.clone(),
            title: request.title,
            description: request.description,
            variant: request.variant,
            expires_at: now + duration,
        });
        id
    }

    /// Hide a toast before it expires.
    pub fn dismiss(&mut self, id: &NotificationId) {
        self.toasts.retain(|toast| &toast.id != id);
    }

    /// Toasts that are still visible, oldest first.
    pub fn active(&mut self) -> &[Toast] {
        self.active_at(Utc::now())
    }

    /// Prune toasts expired at `now` and return the rest.
    pub fn active_at(&mut self, now: DateTime<Utc>) -> &[Toast] {
        self.toasts.retain(|toast| toast.is_active_at(now));
        &self.toasts
    }
}

// =============================================================================
// Inbox
// =============================================================================

/// An entry on the notifications screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub is_read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// A new unread notification.
    #[must_use]
    pub fn new(
        user_id: UserId,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: NotificationId::generate(),
            user_id,
            title: title.into(),
            message: message.into(),
            kind,
            is_read: false,
            image_url: None,
            created_at: Utc::now(),
        }
    }
}

/// Notifications for the signed-in user, newest first.
#[derive(Debug, Clone, Default)]
pub struct Inbox {
    notifications: Vec<Notification>,
}

impl Inbox {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, notification: Notification) {
        self.notifications.insert(0, notification);
    }

    #[must_use]
    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.notifications.iter().filter(|n| !n.is_read).count()
    }

    pub fn mark_as_read(&mut self, id: &NotificationId) {
        if let Some(notification) = self.notifications.iter_mut().find(|n| &n.id == id) {
            notification.is_read = true;
        }
    }

    pub fn mark_all_as_read(&mut self) {
        for notification in &mut self.notifications {
            notification.is_read = true;
        }
    }

    pub fn remove(&mut self, id: &NotificationId) {
        self.notifications.retain(|n| &n.id != id);
    }

    pub fn clear_all(&mut self) {
        self.notifications.clear();
    }
}

/// Toasts and inbox for one signed-in user.
#[derive(Debug, Clone, Default)]
pub struct NotificationCenter {
    pub toasts: Notifier,
    pub inbox: Inbox,
}

impl NotificationCenter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_toast_expires_after_default_duration() {
        let mut notifier = Notifier::new();
        let now = Utc::now();
        notifier.push_at(ToastRequest::new("Заказ оформлен"), now);

        assert_eq!(notifier.active_at(now + Duration::seconds(4)).len(), 1);
        assert!(notifier.active_at(now + Duration::seconds(5)).is_empty());
    }

    #[test]
    fn test_toast_custom_duration_and_dismiss() {
        let mut notifier = Notifier::new();
        let now = Utc::now();
        let long = notifier.push_at(
            ToastRequest::destructive("Ошибка")
                .description("Не удалось оформить заказ")
                .duration(Duration::seconds(30)),
            now,
        );
        let short = notifier.push_at(ToastRequest::new("Готово"), now);

        let active = notifier.active_at(now + Duration::seconds(10));
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, long);
        assert_eq!(active[0].variant, ToastVariant::Destructive);

        notifier.dismiss(&short);
        notifier.dismiss(&long);
        assert!(notifier.active_at(now).is_empty());
    }

    #[test]
    fn test_inbox_read_tracking() {
        let user = UserId::new("u1");
        let mut inbox = Inbox::new();
        let first = Notification::new(user.clone(), NotificationKind::Order, "Заказ", "Оформлен");
        let second = Notification::new(user, NotificationKind::Promotion, "Акция", "Скидка 20%");
        let first_id = first.id.clone();
        inbox.push(first);
        inbox.push(second);

        assert_eq!(inbox.unread_count(), 2);
        assert_eq!(inbox.notifications()[1].id, first_id);

        inbox.mark_as_read(&first_id);
        assert_eq!(inbox.unread_count(), 1);

        inbox.mark_all_as_read();
        assert_eq!(inbox.unread_count(), 0);

        inbox.remove(&first_id);
        assert_eq!(inbox.notifications().len(), 1);

        inbox.clear_all();
        assert!(inbox.notifications().is_empty());
    }
}
