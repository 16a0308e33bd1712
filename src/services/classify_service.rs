use std::sync::LazyLock;

use regex::Regex;

// Priority cascade over extracted text, first match wins: Messages, Code,
// Design, Receipts, Browser, Terminal, Errors, Documents, Images. Exactly
// one primary tag per capture; the store keeps whatever the classifier
// returned at event time.

static TIME_12H: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,2}:\d{2}\s*(?:AM|PM|am|pm)").unwrap());
static TIME_24H: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{1,2}:\d{2}\b").unwrap());
static NAME_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][a-z]+:|\b(You|Me|I):").unwrap());
static HEX_COLOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#[0-9A-Fa-f]{6}").unwrap());
static PRICE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\d+\.\d{2}").unwrap());
static SLASH_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,2}/\d{1,2}/\d{2,4}").unwrap());
static URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://[^\s]+").unwrap());
static DOMAIN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[a-z0-9-]+\.[a-z]{2,}\b").unwrap());
static INDENTED_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^    ").unwrap());
static NUMBERED_ITEM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\d+\.\s").unwrap());
static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Z|a-z]{2,}\b").unwrap()
});

const CHAT_WORDS: &[&str] = &[
    "lmao", "lmfao", "lol", "omg", "btw", "imo", "tbh", "haha", "ngl", "wyd", "ttyl", "brb",
    "ikr", "smh", "fyi", "idk", "yeah", "nah", "sounds good",
];

const MESSAGE_APPS: &[&str] = &[
    "imessage", "slack", "discord", "whatsapp", "telegram", "signal", "messenger", "group chat",
    "direct message",
];

const READ_RECEIPTS: &[&str] = &["delivered", "seen", "typing", "last seen"];

const CODE_KEYWORDS: &[&str] = &[
    "function", "const ", "let ", "class ", "import ", "export ", "def ", "return", "async",
    "await", "fn ", "impl ", "struct ",
];

const DESIGN_TOOLS: &[&str] = &["figma", "sketch", "photoshop", "illustrator"];
const DESIGN_TERMS: &[&str] = &["px", "rem", "font", "padding", "margin", "border"];

const RECEIPT_WORDS: &[&str] = &["total", "subtotal", "tax", "receipt", "invoice", "paid", "order"];

const BROWSER_CHROME: &[&str] = &[
    "address bar", "bookmarks", "new tab", "omnibox", "chrome", "safari", "firefox",
];

const SHELL_COMMANDS: &[&str] = &["cd ", "ls ", "git ", "npm ", "cargo ", "python ", "node "];

const ERROR_WORDS: &[&str] = &[
    "error", "exception", "failed", "panic", "segfault", "undefined", "traceback", "stack trace",
];

const FORMAL_MARKERS: &[&str] = &[
    "therefore", "however", "furthermore", "moreover", "in conclusion", "in summary", "chapter",
    "section", "abstract", "introduction", "references",
];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn has_message_signals(text: &str, lower: &str) -> bool {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let short_lines = lines.iter().filter(|l| l.len() < 120).count();
    let name_prefixes = lines.iter().filter(|l| NAME_PREFIX.is_match(l)).count();
    let timestamped = lines.iter().filter(|l| TIME_24H.is_match(l)).count();

    // Bubble shape: short conversational lines paired with sender names or
    // per-line timestamps. Short lines alone are not enough; code and
    // terminal captures are wall-to-wall short lines too.
    let bubbles = (short_lines >= 2 && (name_prefixes >= 1 || timestamped >= 1))
        || name_prefixes >= 2
        || (timestamped >= 2 && short_lines >= 1);

    let timestamps = TIME_12H.is_match(text) || TIME_24H.is_match(text);
    let chat_words = contains_any(lower, CHAT_WORDS);
    let questions = text.contains('?');

    bubbles
        || timestamps
        || contains_any(lower, MESSAGE_APPS)
        || contains_any(lower, READ_RECEIPTS)
        || (chat_words && questions)
}

/// Classifies extracted text into its primary collection tag. Returns an
/// empty vec when no signal fires strongly enough.
pub fn classify(text: &str) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.len() < 10 {
        return vec!["Images".to_string()];
    }

    let lower = trimmed.to_lowercase();
    let word_count = trimmed.split_whitespace().count();
    let char_count = trimmed.len();

    if has_message_signals(trimmed, &lower) {
        return vec!["Messages".to_string()];
    }

    let has_code_keywords = contains_any(&lower, CODE_KEYWORDS);
    let has_code_symbols = ["{", "}", "=>", "->", "::", "()"]
        .iter()
        .any(|s| trimmed.contains(s));
    let has_comments = trimmed.contains("//") || trimmed.contains("/*") || trimmed.contains("# ");
    if has_code_keywords && (has_code_symbols || INDENTED_LINE.is_match(trimmed) || has_comments) {
        return vec!["Code".to_string()];
    }

    if HEX_COLOR.is_match(trimmed)
        || contains_any(&lower, DESIGN_TOOLS)
        || (contains_any(&lower, DESIGN_TERMS) && lower.contains("design"))
    {
        return vec!["Design".to_string()];
    }

    if PRICE.is_match(trimmed)
        && (contains_any(&lower, RECEIPT_WORDS) || SLASH_DATE.is_match(trimmed))
    {
        return vec!["Receipts".to_string()];
    }

    let distinct_domains = DOMAIN.find_iter(&lower).count();
    if URL.is_match(trimmed)
        || lower.contains("www.")
        || contains_any(&lower, BROWSER_CHROME)
        || trimmed.contains('←')
        || trimmed.contains('→')
        || distinct_domains > 2
    {
        return vec!["Browser".to_string()];
    }

    let has_prompt = trimmed.contains("$ ") || trimmed.contains("~ ") || trimmed.contains("> ");
    if has_prompt && contains_any(trimmed, SHELL_COMMANDS) {
        return vec!["Terminal".to_string()];
    }

    let stack_trace_shape =
        (trimmed.contains("at ") && trimmed.contains(".js:")) || trimmed.contains("Traceback");
    if contains_any(&lower, ERROR_WORDS) || stack_trace_shape {
        return vec!["Errors".to_string()];
    }

    let has_structure = trimmed.contains('•')
        || NUMBERED_ITEM.is_match(trimmed)
        || trimmed.matches("\n- ").count() > 2
        || trimmed.split("\n\n").count() > 2;
    if word_count >= 50 && (has_structure || contains_any(&lower, FORMAL_MARKERS)) {
        return vec!["Documents".to_string()];
    }

    if char_count < 50 && word_count < 10 {
        return vec!["Images".to_string()];
    }

    Vec::new()
}

/// Pulls URLs and email addresses out of extracted text, in order of
/// appearance.
pub fn extract_urls_and_emails(text: &str) -> (Vec<String>, Vec<String>) {
    let urls = URL
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect();
    let emails = EMAIL
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect();
    (urls, emails)
}
