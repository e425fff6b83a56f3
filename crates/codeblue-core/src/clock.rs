//! Episode timestamps are wall clock in Asia/Taipei, minute resolution.

use chrono::Utc;
use chrono_tz::Asia::Taipei;

pub const EVENT_TIME_FORMAT: &str = "%Y/%m/%d %H:%M";

/// Timestamp recorded on every logged event.
pub fn event_timestamp() -> String {
    Utc::now()
        .with_timezone(&Taipei)
        .format(EVENT_TIME_FORMAT)
        .to_string()
}

/// Stamp used in export filenames, second resolution.
pub fn export_stamp() -> String {
    Utc::now()
        .with_timezone(&Taipei)
        .format("%Y%m%d_%H%M%S")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_timestamp_has_minute_resolution() {
        let ts = event_timestamp();
        // 2025/03/01 14:02
        assert_eq!(ts.len(), 16);
        assert_eq!(&ts[4..5], "/");
        assert_eq!(&ts[10..11], " ");
        assert_eq!(&ts[13..14], ":");
    }

    #[test]
    fn export_stamp_is_filename_safe() {
        let stamp = export_stamp();
        assert_eq!(stamp.len(), 15);
        assert!(stamp.chars().all(|c| c.is_ascii_digit() || c == '_'));
    }
}
