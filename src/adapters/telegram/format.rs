//! Telegram Markdown rendering of merge request notifications.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, FixedOffset, Local, Locale, Utc};

use crate::domain::models::{MergeRequest, MergeRequestState};
use crate::domain::ports::MessageRenderer;

const DATE_FORMAT: &str = "%d %B %H:%M";
/// Locale used for month names unless configured otherwise.
pub const DEFAULT_LOCALE: &str = "en_US";
const THREADS_HEADER: &str = "\n\n*Unresolved threads*\n";
const THUMBS_UP: &str = "\u{1F44D}";

/// Parse a POSIX locale name such as `ru_RU`.
pub fn parse_locale(name: &str) -> Option<Locale> {
    Locale::try_from(name).ok()
}

/// Renders notifications in Telegram's legacy Markdown.
#[derive(Debug, Clone)]
pub struct TelegramMarkdownRenderer {
    /// Offset used for dates; the host's local zone when unset.
    offset: Option<FixedOffset>,
    locale: Locale,
}

impl Default for TelegramMarkdownRenderer {
    fn default() -> Self {
        Self {
            offset: None,
            locale: Locale::en_US,
        }
    }
}

impl TelegramMarkdownRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn with_offset(offset: FixedOffset) -> Self {
        Self {
            offset: Some(offset),
            locale: Locale::en_US,
        }
    }

    /// Month names in dates follow `locale`.
    #[must_use]
    pub const fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    fn format_date(&self, at: &DateTime<Utc>) -> String {
        match self.offset {
            Some(offset) => at
                .with_timezone(&offset)
                .format_localized(DATE_FORMAT, self.locale)
                .to_string(),
            None => at
                .with_timezone(&Local)
                .format_localized(DATE_FORMAT, self.locale)
                .to_string(),
        }
    }
}

impl MessageRenderer for TelegramMarkdownRenderer {
    fn render_message(&self, mr: &MergeRequest) -> String {
        let mut text = format!(
            "[Pull request !{}]({})\n`{}` -> `{}`\n{}\nOpened {} by {}",
            mr.id.iid,
            mr.web_url,
            mr.source_branch,
            mr.target_branch,
            escape_markdown(&mr.title),
            self.format_date(&mr.created_at),
            escape_markdown(&mr.author_name),
        );
        if mr.state == MergeRequestState::Merged {
            text.push_str("\nMerged");
        }
        text
    }

    fn render_update(
        &self,
        mr: &MergeRequest,
        new_threads: &BTreeMap<String, String>,
        up_voters: &BTreeSet<String>,
    ) -> String {
        let mut text = self.render_message(mr);

        if !new_threads.is_empty() {
            let lines: Vec<String> = new_threads
                .iter()
                .map(|(id, description)| format!("\t\t{} - {}", escape_markdown(id), escape_markdown(description)))
                .collect();
            text.push_str(THREADS_HEADER);
            text.push_str(&lines.join("\n"));
        }

        if !up_voters.is_empty() {
            let names: Vec<String> = up_voters.iter().map(|name| escape_markdown(name)).collect();
            text.push_str(&format!("\n\n{THUMBS_UP} - {} by {}", up_voters.len(), names.join(", ")));
        }

        text
    }
}

/// Escape the characters legacy Markdown treats as entity delimiters.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::MergeRequestId;
    use chrono::TimeZone;

    fn merge_request() -> MergeRequest {
        MergeRequest {
            id: MergeRequestId::new(7, 42),
            title: "Add login page".to_string(),
            source_branch: "feature/login".to_string(),
            target_branch: "main".to_string(),
            web_url: "https://gitlab.example.com/group/app/-/merge_requests/42".to_string(),
            author_name: "Jane Doe".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 15, 0).unwrap(),
            state: MergeRequestState::Opened,
            unresolved_threads: BTreeMap::new(),
            up_voters: BTreeSet::new(),
        }
    }

    fn renderer() -> TelegramMarkdownRenderer {
        TelegramMarkdownRenderer::with_offset(FixedOffset::east_opt(3 * 3600).unwrap())
    }

    #[test]
    fn test_render_message() {
        let text = renderer().render_message(&merge_request());
        assert_eq!(
            text,
            "[Pull request !42](https://gitlab.example.com/group/app/-/merge_requests/42)\n\
             `feature/login` -> `main`\n\
             Add login page\n\
             Opened 01 March 13:15 by Jane Doe"
        );
    }

    #[test]
    fn test_dates_follow_locale() {
        let russian = renderer().with_locale(parse_locale("ru_RU").unwrap());
        let text = russian.render_message(&merge_request());
        let opened = text.lines().last().unwrap();

        assert!(opened.starts_with("Opened 01 март"), "{opened}");
        assert!(opened.ends_with("13:15 by Jane Doe"));
        assert!(!text.contains("March"));
    }

    #[test]
    fn test_parse_locale() {
        assert_eq!(parse_locale(DEFAULT_LOCALE), Some(Locale::en_US));
        assert_eq!(parse_locale("de_DE"), Some(Locale::de_DE));
        assert_eq!(parse_locale("klingon"), None);
    }

    #[test]
    fn test_merged_request_is_marked() {
        let mut mr = merge_request();
        mr.state = MergeRequestState::Merged;
        assert!(renderer().render_message(&mr).ends_with("by Jane Doe\nMerged"));
    }

    #[test]
    fn test_update_without_activity_equals_message() {
        let r = renderer();
        let mr = merge_request();
        assert_eq!(
            r.render_update(&mr, &BTreeMap::new(), &BTreeSet::new()),
            r.render_message(&mr)
        );
    }

    #[test]
    fn test_update_with_threads_and_up_voters() {
        let r = renderer();
        let mr = merge_request();
        let threads: BTreeMap<String, String> = [
            ("t1".to_string(), "fix tests".to_string()),
            ("t2".to_string(), "rename var".to_string()),
        ]
        .into();
        let voters: BTreeSet<String> = ["bob".to_string(), "alice".to_string()].into();

        let text = r.render_update(&mr, &threads, &voters);
        let expected_tail = "\n\n*Unresolved threads*\n\t\tt1 - fix tests\n\t\tt2 - rename var\n\n\u{1F44D} - 2 by alice, bob";
        assert_eq!(text, format!("{}{expected_tail}", r.render_message(&mr)));
    }

    #[test]
    fn test_up_voters_only() {
        let voters: BTreeSet<String> = ["alice".to_string()].into();
        let text = renderer().render_update(&merge_request(), &BTreeMap::new(), &voters);
        assert!(!text.contains("Unresolved threads"));
        assert!(text.ends_with("\u{1F44D} - 1 by alice"));
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("fix snake_case *now*"), "fix snake\\_case \\*now\\*");
        assert_eq!(escape_markdown("plain"), "plain");
    }
}
