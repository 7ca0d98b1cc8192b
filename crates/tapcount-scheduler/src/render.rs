// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTML rendering of the counter message.

use std::fmt::Write;

use tapcount_core::RenderStats;

/// Leaderboard rows shown in the message.
pub const LEADERBOARD_SIZE: usize = 20;

/// Render the welcome message for Telegram's HTML parse mode.
pub fn render_counter_message(stats: &RenderStats) -> String {
    let mut out = String::with_capacity(512);
    // Writing to a String cannot fail.
    let _ = write!(
        out,
        "👋 <b>Welcome, {}!</b>\n\n\
         🖱 Your clicks: <b>{}</b>\n\
         🌍 Total clicks: <b>{}</b>\n\n\
         🏆 <b>Top 20 Clickers:</b>\n",
        escape_html(&stats.user_stats.username),
        group_thousands(stats.user_stats.clicks),
        group_thousands(stats.global_stats.total_clicks),
    );

    if stats.leaderboard.is_empty() {
        out.push_str("<i>No data yet...</i>");
        return out;
    }

    for (idx, entry) in stats.leaderboard.iter().take(LEADERBOARD_SIZE).enumerate() {
        let rank = match idx {
            0 => "🥇".to_string(),
            1 => "🥈".to_string(),
            2 => "🥉".to_string(),
            n => format!("{}.", n + 1),
        };
        let _ = writeln!(
            out,
            "{rank} {}: {}",
            escape_html(&entry.username),
            group_thousands(entry.clicks)
        );
    }
    out
}

/// `1234567` → `1,234,567`.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Escape the characters Telegram's HTML mode treats as markup.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tapcount_core::types::{GlobalStats, LeaderboardEntry, UserStats};

    fn stats(leaders: &[(&str, u64)]) -> RenderStats {
        RenderStats {
            user_stats: UserStats {
                username: "alice".into(),
                clicks: 1234,
            },
            global_stats: GlobalStats {
                total_clicks: 9_876_543,
                total_users: 0,
            },
            leaderboard: leaders
                .iter()
                .map(|(name, clicks)| LeaderboardEntry {
                    username: (*name).into(),
                    clicks: *clicks,
                })
                .collect(),
        }
    }

    #[test]
    fn empty_leaderboard() {
        let msg = render_counter_message(&stats(&[]));
        assert_eq!(
            msg,
            "👋 <b>Welcome, alice!</b>\n\n🖱 Your clicks: <b>1,234</b>\n🌍 Total clicks: <b>9,876,543</b>\n\n🏆 <b>Top 20 Clickers:</b>\n<i>No data yet...</i>"
        );
    }

    #[test]
    fn medals_then_numbers() {
        let msg = render_counter_message(&stats(&[
            ("bob", 5000),
            ("carol", 4000),
            ("dave", 3000),
            ("erin", 999),
        ]));
        assert!(msg.ends_with("🥇 bob: 5,000\n🥈 carol: 4,000\n🥉 dave: 3,000\n4. erin: 999\n"));
    }

    #[test]
    fn leaderboard_is_truncated() {
        let names: Vec<String> = (0..25).map(|i| format!("u{i}")).collect();
        let leaders: Vec<(&str, u64)> = names.iter().map(|n| (n.as_str(), 1)).collect();
        let msg = render_counter_message(&stats(&leaders));
        assert!(msg.contains("20. u19: 1\n"));
        assert!(!msg.contains("u20"));
    }

    #[test]
    fn usernames_are_escaped() {
        let mut s = stats(&[("<script>", 1)]);
        s.user_stats.username = "a&b".into();
        let msg = render_counter_message(&s);
        assert!(msg.contains("Welcome, a&amp;b!"));
        assert!(msg.contains("🥇 &lt;script&gt;: 1"));
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_000), "1,000");
        assert_eq!(group_thousands(12_345_678), "12,345,678");
    }
}
