pub mod events;
pub mod health;
pub mod root;
pub mod stats;
pub mod test_tick;

use chrono::{SecondsFormat, Utc};

/// Current instant as ISO-8601 UTC with milliseconds.
pub(crate) fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
