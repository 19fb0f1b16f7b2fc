//! Turns leaderboard entries into chat notifications.

use std::collections::HashSet;

use cqc_common::types::{LeaderboardEntry, NotificationPayload};

pub const ACTIVITY_TITLE: &str = "CQC Activity Detected";
pub const FOOTER: &str = "CQC Monitor";
pub const COLOR_GREEN: u32 = 0x2ecc71;
pub const COLOR_BLUE: u32 = 0x3498db;

const MARKER_DEFAULT: &str = "🔹";
const MARKER_HIGHLIGHT: &str = "🔸";

pub struct NotificationRenderer {
    highlighted: HashSet<String>,
}

impl NotificationRenderer {
    pub fn new(highlighted: impl IntoIterator<Item = String>) -> Self {
        Self {
            highlighted: highlighted.into_iter().collect(),
        }
    }

    pub fn render(&self, entry: &LeaderboardEntry) -> NotificationPayload {
        let marker = if self.highlighted.contains(&entry.squadron_name) {
            MARKER_HIGHLIGHT
        } else {
            MARKER_DEFAULT
        };

        let mut body = format!(
            "{} {} gained {} points",
            marker,
            entry.squadron_name,
            group_thousands(entry.experience_gain)
        );
        if let Some(ts) = entry.timestamp {
            body.push_str(&format!("\n\n 🕛 <t:{}:f>", ts.timestamp()));
        }

        NotificationPayload {
            title: ACTIVITY_TITLE.to_string(),
            body,
            color: COLOR_GREEN,
            footer: Some(FOOTER.to_string()),
        }
    }
}

impl Default for NotificationRenderer {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// `1234567` → `"1,234,567"`.
pub fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
        assert_eq!(group_thousands(-45000), "-45,000");
    }

    #[test]
    fn test_render_plain_entry() {
        let renderer = NotificationRenderer::default();
        let entry = LeaderboardEntry::new(5, "ALPHA WING", 12500, None);

        let payload = renderer.render(&entry);

        assert_eq!(payload.title, ACTIVITY_TITLE);
        assert_eq!(payload.body, "🔹 ALPHA WING gained 12,500 points");
        assert_eq!(payload.color, COLOR_GREEN);
        assert_eq!(payload.footer.as_deref(), Some(FOOTER));
    }

    #[test]
    fn test_render_highlight_and_timestamp() {
        let renderer = NotificationRenderer::new(vec!["WE ROCK YOU ROLL".to_string()]);
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let entry = LeaderboardEntry::new(5, "WE ROCK YOU ROLL", 300, Some(ts));

        let payload = renderer.render(&entry);

        assert_eq!(
            payload.body,
            format!("🔸 WE ROCK YOU ROLL gained 300 points\n\n 🕛 <t:{}:f>", ts.timestamp())
        );
    }
}
