//! Text-signal extraction — links, discount codes, dates, folder
//! inference, and summary construction.
//!
//! Pure string processing, no external calls. All functions are total
//! over their inputs: absent email fields are treated as empty text.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::agent::types::EmailEnvelope;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://[^\s)>]+").unwrap());

static DISCOUNT_CODE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)(?:promo|discount|coupon)\s*code[:\s]+([A-Z0-9]{4,})").unwrap(),
        Regex::new(r"(?i)use\s+code\s+([A-Z0-9]{4,})").unwrap(),
        Regex::new(r"(?i)code[:\s]+([A-Z0-9]{4,})").unwrap(),
    ]
});

static DATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"\b\d{4}-\d{2}-\d{2}\b").unwrap(),
        Regex::new(
            r"(?i)\b(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]*\s+\d{1,2},\s+\d{4}\b",
        )
        .unwrap(),
        Regex::new(r"\b\d{1,2}/\d{1,2}/\d{2,4}\b").unwrap(),
    ]
});

static EMAIL_IN_ANGLE_BRACKETS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([^>]+)>").unwrap());

static BARE_EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+").unwrap());

static SENDER_DOMAIN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@([^\s>]+)").unwrap());

/// Folder names with their trigger keywords, checked in declaration order.
const TOPIC_FOLDERS: &[(&str, &[&str])] = &[
    ("Articles", &["newsletter", "digest", "read", "blog", "article"]),
    ("Shopping", &["sale", "deal", "promo", "discount", "shop", "order"]),
    ("Travel", &["flight", "hotel", "trip", "booking", "reservation"]),
    ("Finance", &["invoice", "receipt", "statement", "payment"]),
];

/// Lower-case and collapse all whitespace runs to single spaces.
pub fn normalize_text(text: &str) -> String {
    WHITESPACE
        .replace_all(&text.to_lowercase(), " ")
        .trim()
        .to_string()
}

/// True when the normalized text contains any of the given terms.
pub fn contains_any(text: &str, terms: &[&str]) -> bool {
    let norm = normalize_text(text);
    terms.iter().any(|term| norm.contains(term))
}

/// Concatenate the searchable text of an email: subject, snippet, and
/// body (falling back to `plain_text`), skipping absent parts.
pub fn email_text(email: &EmailEnvelope) -> String {
    let body = email
        .body
        .as_deref()
        .filter(|s| !s.is_empty())
        .or(email.plain_text.as_deref());
    [email.subject.as_deref(), email.snippet.as_deref(), body]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// One-line summary: `"{sender}: {subject}. {snippet}"`, with the
/// trailing snippet omitted when absent.
pub fn build_summary(email: &EmailEnvelope) -> String {
    let sender = email
        .from
        .as_deref()
        .filter(|s| !s.is_empty())
        .or(email.sender.as_deref().filter(|s| !s.is_empty()))
        .unwrap_or("Unknown sender");
    let subject = email
        .subject
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or("No subject");
    let snippet = email.snippet.as_deref().unwrap_or("");
    if snippet.is_empty() {
        format!("{sender}: {subject}.")
    } else {
        format!("{sender}: {subject}. {snippet}").trim().to_string()
    }
}

/// Extract `http(s)` links, strip trailing punctuation, and deduplicate
/// preserving first-seen order.
pub fn extract_links(text: &str) -> Vec<String> {
    let cleaned = LINK.find_iter(text).map(|m| {
        m.as_str()
            .trim_end_matches([')', '.', ',', ';', '!'])
            .to_string()
    });
    dedup_preserve_order(cleaned)
}

/// Extract discount codes following promo/coupon language. Codes are
/// upper-cased and deduplicated across all patterns in pattern order.
pub fn extract_discount_codes(text: &str) -> Vec<String> {
    let codes = DISCOUNT_CODE_PATTERNS.iter().flat_map(|pattern| {
        pattern
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().to_uppercase())
    });
    dedup_preserve_order(codes)
}

/// Extract date-like substrings (ISO, "Month D, YYYY", and M/D/YY(YY)),
/// deduplicated preserving first occurrence, original formatting kept.
pub fn extract_dates(text: &str) -> Vec<String> {
    let dates = DATE_PATTERNS
        .iter()
        .flat_map(|pattern| pattern.find_iter(text).map(|m| m.as_str().to_string()));
    dedup_preserve_order(dates)
}

/// Pick a destination folder from topical keywords, falling back to the
/// sender domain's first label, then `"Unsorted"`.
pub fn infer_folder(text: &str, sender_domain: Option<&str>) -> String {
    let norm = normalize_text(text);
    for (folder, terms) in TOPIC_FOLDERS {
        if terms.iter().any(|term| norm.contains(term)) {
            return folder.to_string();
        }
    }
    if let Some(domain) = sender_domain.filter(|d| !d.is_empty()) {
        return domain.split('.').next().unwrap_or(domain).to_string();
    }
    "Unsorted".to_string()
}

/// Pull a bare email address out of `"Name <addr>"` or bare-address form.
pub fn extract_email_address(raw: Option<&str>) -> Option<String> {
    let raw = raw?;
    if raw.is_empty() {
        return None;
    }
    if let Some(caps) = EMAIL_IN_ANGLE_BRACKETS.captures(raw) {
        return Some(caps[1].to_string());
    }
    if BARE_EMAIL.is_match(raw) {
        return Some(raw.to_string());
    }
    None
}

/// Resolve the sender domain: the explicit field if present, otherwise
/// parsed from the first `@token` in the sender string.
pub fn resolve_sender_domain(email: &EmailEnvelope) -> Option<String> {
    if let Some(domain) = email.sender_domain.as_deref().filter(|d| !d.is_empty()) {
        return Some(domain.to_string());
    }
    let sender = email.from.as_deref().or(email.sender.as_deref())?;
    SENDER_DOMAIN
        .captures(sender)
        .map(|caps| caps[1].to_string())
}

fn dedup_preserve_order(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        if seen.insert(item.clone()) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── extract_links ───────────────────────────────────────────────

    #[test]
    fn links_in_first_seen_order_without_duplicates() {
        let text = "See https://a.example/one, then https://b.example/two \
                    and again https://a.example/one plus http://c.example/three.";
        assert_eq!(
            extract_links(text),
            vec![
                "https://a.example/one",
                "https://b.example/two",
                "http://c.example/three",
            ]
        );
    }

    #[test]
    fn links_strip_trailing_punctuation() {
        let text = "(https://example.com/path); read https://example.org/a!";
        assert_eq!(
            extract_links(text),
            vec!["https://example.com/path", "https://example.org/a"]
        );
    }

    #[test]
    fn links_stop_at_angle_bracket() {
        let text = "<https://example.com/wrapped> done";
        assert_eq!(extract_links(text), vec!["https://example.com/wrapped"]);
    }

    #[test]
    fn no_links_in_plain_text() {
        assert!(extract_links("nothing to see here").is_empty());
    }

    // ── extract_discount_codes ──────────────────────────────────────

    #[test]
    fn discount_codes_dedup_across_patterns() {
        let codes = extract_discount_codes("promo code: SAVE20, use code SAVE20");
        assert_eq!(codes, vec!["SAVE20"]);
    }

    #[test]
    fn discount_codes_upper_cased() {
        let codes = extract_discount_codes("Use code save50 at checkout");
        assert_eq!(codes, vec!["SAVE50"]);
    }

    #[test]
    fn discount_codes_require_four_chars() {
        assert!(extract_discount_codes("use code AB1").is_empty());
        assert_eq!(extract_discount_codes("use code AB12"), vec!["AB12"]);
    }

    #[test]
    fn discount_codes_bare_code_prefix() {
        let codes = extract_discount_codes("Checkout with code: WELCOME10 today");
        assert_eq!(codes, vec!["WELCOME10"]);
    }

    // ── extract_dates ───────────────────────────────────────────────

    #[test]
    fn dates_all_three_patterns() {
        let text = "Due 2026-03-01, or March 5, 2026, or 3/7/26.";
        assert_eq!(
            extract_dates(text),
            vec!["2026-03-01", "March 5, 2026", "3/7/26"]
        );
    }

    #[test]
    fn dates_month_abbreviations_case_insensitive() {
        let dates = extract_dates("See you on jan 2, 2027!");
        assert_eq!(dates, vec!["jan 2, 2027"]);
    }

    #[test]
    fn dates_deduplicated() {
        let dates = extract_dates("2026-01-01 and again 2026-01-01");
        assert_eq!(dates, vec!["2026-01-01"]);
    }

    // ── infer_folder ────────────────────────────────────────────────

    #[test]
    fn folder_first_keyword_match_wins() {
        // "newsletter" (Articles) appears alongside "sale" (Shopping);
        // Articles is declared first.
        let folder = infer_folder("This newsletter has a sale inside", None);
        assert_eq!(folder, "Articles");
    }

    #[test]
    fn folder_falls_back_to_domain_label() {
        assert_eq!(infer_folder("hello there", Some("shop.example.com")), "shop");
    }

    #[test]
    fn folder_falls_back_to_unsorted() {
        assert_eq!(infer_folder("hello there", None), "Unsorted");
    }

    #[test]
    fn folder_finance_keywords() {
        assert_eq!(infer_folder("Your invoice is attached", None), "Finance");
    }

    // ── build_summary ───────────────────────────────────────────────

    #[test]
    fn summary_with_snippet() {
        let email = EmailEnvelope {
            from: Some("alice@example.com".into()),
            subject: Some("Lunch?".into()),
            snippet: Some("Free tomorrow?".into()),
            ..Default::default()
        };
        assert_eq!(build_summary(&email), "alice@example.com: Lunch?. Free tomorrow?");
    }

    #[test]
    fn summary_without_snippet_ends_with_period() {
        let email = EmailEnvelope {
            sender: Some("bob@example.com".into()),
            subject: Some("Update".into()),
            ..Default::default()
        };
        assert_eq!(build_summary(&email), "bob@example.com: Update.");
    }

    #[test]
    fn summary_defaults_for_absent_fields() {
        assert_eq!(
            build_summary(&EmailEnvelope::default()),
            "Unknown sender: No subject."
        );
    }

    // ── normalize / contains_any ────────────────────────────────────

    #[test]
    fn normalize_collapses_whitespace_and_lowercases() {
        assert_eq!(normalize_text("  Hello\n\tWORLD  "), "hello world");
    }

    #[test]
    fn contains_any_matches_across_line_breaks() {
        assert!(contains_any("PLEASE\nREPLY soon", &["please reply"]));
        assert!(!contains_any("nothing here", &["please reply"]));
    }

    // ── extract_email_address ───────────────────────────────────────

    #[test]
    fn address_from_display_name_form() {
        assert_eq!(
            extract_email_address(Some("Alice Smith <alice@example.com>")),
            Some("alice@example.com".to_string())
        );
    }

    #[test]
    fn address_from_bare_form() {
        assert_eq!(
            extract_email_address(Some("bob@example.com")),
            Some("bob@example.com".to_string())
        );
    }

    #[test]
    fn address_absent_or_invalid() {
        assert_eq!(extract_email_address(None), None);
        assert_eq!(extract_email_address(Some("")), None);
        assert_eq!(extract_email_address(Some("not an address")), None);
    }

    // ── resolve_sender_domain ───────────────────────────────────────

    #[test]
    fn domain_prefers_explicit_field() {
        let email = EmailEnvelope {
            sender_domain: Some("example.org".into()),
            from: Some("alice@other.com".into()),
            ..Default::default()
        };
        assert_eq!(resolve_sender_domain(&email).as_deref(), Some("example.org"));
    }

    #[test]
    fn domain_parsed_from_sender_string() {
        let email = EmailEnvelope {
            from: Some("Alice <alice@example.com>".into()),
            ..Default::default()
        };
        assert_eq!(resolve_sender_domain(&email).as_deref(), Some("example.com"));
    }

    #[test]
    fn domain_absent_when_no_sender() {
        assert_eq!(resolve_sender_domain(&EmailEnvelope::default()), None);
    }

    // ── email_text ──────────────────────────────────────────────────

    #[test]
    fn email_text_joins_present_parts() {
        let email = EmailEnvelope {
            subject: Some("Subject".into()),
            body: Some("Body".into()),
            ..Default::default()
        };
        assert_eq!(email_text(&email), "Subject\nBody");
    }

    #[test]
    fn email_text_falls_back_to_plain_text() {
        let email = EmailEnvelope {
            plain_text: Some("plain".into()),
            ..Default::default()
        };
        assert_eq!(email_text(&email), "plain");
    }
}
