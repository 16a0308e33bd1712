use std::sync::LazyLock;

use regex::{Captures, Regex};

// OCR engines systematically confuse glyph pairs: capital I for lowercase l
// (worst in chat slang), and digits for letters inside words. Search input
// is matched against this normalized form so "lol" still finds "Iol".

/// Chat-slang misreads fixed before the general patterns run; longer forms
/// first so "Imfaooo" doesn't partially rewrite as "lmfa" + "ooo".
const SLANG_FIXES: &[(&str, &str)] = &[
    ("Imfaooo0o", "lmfao"),
    ("Imfaoooo", "lmfao"),
    ("Imfaooo", "lmfao"),
    ("Imfaoo", "lmfao"),
    ("Imfao", "lmfao"),
    ("Imfa", "lmfa"),
    ("Imaoooo", "lmao"),
    ("Imaooo", "lmao"),
    ("Imaoo", "lmao"),
    ("Imao", "lmao"),
    ("imao", "lmao"),
    ("iMAO", "lmao"),
    ("ImAO", "lmao"),
    ("IOl", "Lol"),
    ("IOI", "Lol"),
    ("ioI", "Lol"),
    ("Iol", "Lol"),
];

static IOL_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(?i)iol\b").unwrap());
static LEADING_I_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bI([a-z]{2,})\b").unwrap());
static ZERO_IN_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-zA-Z])0+([a-zA-Z])").unwrap());
static FIVE_IN_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-zA-Z])5([a-zA-Z])").unwrap());
static ONE_IN_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-zA-Z])1([a-zA-Z])").unwrap());

/// Maps extracted text to its search-normalized form, correcting systematic
/// OCR confusions. Pure; never changes digits that sit inside numbers.
pub fn normalize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut fixed = text.to_string();
    for (wrong, right) in SLANG_FIXES {
        fixed = fixed.replace(wrong, right);
    }

    fixed = IOL_WORD.replace_all(&fixed, "lol").into_owned();
    fixed = LEADING_I_WORD
        .replace_all(&fixed, |caps: &Captures| format!("l{}", &caps[1]))
        .into_owned();
    fixed = ZERO_IN_WORD
        .replace_all(&fixed, |caps: &Captures| {
            format!("{}o{}", &caps[1], &caps[2])
        })
        .into_owned();
    fixed = FIVE_IN_WORD
        .replace_all(&fixed, |caps: &Captures| {
            format!("{}s{}", &caps[1], &caps[2])
        })
        .into_owned();
    fixed = ONE_IN_WORD
        .replace_all(&fixed, |caps: &Captures| {
            format!("{}l{}", &caps[1], &caps[2])
        })
        .into_owned();

    fixed
}
