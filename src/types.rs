//! Shared primitive IDs, enums, and timestamp helpers.

use serde::{Deserialize, Serialize};

/// User document identifier (the auth uid).
pub type UserId = String;
/// Post document identifier.
pub type PostId = String;
/// Notification document identifier.
pub type NotificationId = String;
/// Comment document identifier.
pub type CommentId = String;
/// Milliseconds since the Unix epoch.
pub type TimestampMs = u64;

/// Kind of activity a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    /// Someone liked one of the recipient's posts.
    Like,
    /// Someone commented on one of the recipient's posts.
    Comment,
    /// Someone started following the recipient.
    Follow,
}

impl NotificationType {
    /// Short text rendered next to the actor's name.
    pub fn message(self) -> &'static str {
        match self {
            Self::Like => "liked one of your posts.",
            Self::Comment => "commented on one of your posts.",
            Self::Follow => "started following you.",
        }
    }
}

/// Destination bucket for an uploaded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageKind {
    /// Profile picture, stored under the owner's uid.
    Profile(UserId),
    /// Post thumbnail, stored under the post id.
    PostThumbnail(PostId),
}

const SECOND_MS: u64 = 1_000;
const MINUTE_MS: u64 = 60 * SECOND_MS;
const HOUR_MS: u64 = 60 * MINUTE_MS;
const DAY_MS: u64 = 24 * HOUR_MS;
const WEEK_MS: u64 = 7 * DAY_MS;

/// Renders the elapsed time between `ts_ms` and `now_ms` as its largest
/// whole unit, abbreviated (`"5s"`, `"3m"`, `"2h"`, `"4d"`, `"1w"`).
///
/// Timestamps in the future render as `"0s"`.
pub fn relative_label(ts_ms: TimestampMs, now_ms: TimestampMs) -> String {
    let elapsed = now_ms.saturating_sub(ts_ms);
    let (value, unit) = if elapsed >= WEEK_MS {
        (elapsed / WEEK_MS, "w")
    } else if elapsed >= DAY_MS {
        (elapsed / DAY_MS, "d")
    } else if elapsed >= HOUR_MS {
        (elapsed / HOUR_MS, "h")
    } else if elapsed >= MINUTE_MS {
        (elapsed / MINUTE_MS, "m")
    } else {
        (elapsed / SECOND_MS, "s")
    };
    format!("{value}{unit}")
}

/// Current wall-clock time in milliseconds.
pub fn now_ms() -> TimestampMs {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
