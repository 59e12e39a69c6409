// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Syntax highlighting for fenced code blocks.
//!
//! Highlighting emits class-based HTML (`hl-*` classes) so the colors live
//! in a single stylesheet produced by [`theme_css`] and embedded once per
//! document.

use crate::format::escape_html;
use regex::Regex;
use std::sync::LazyLock;
use syntect::highlighting::ThemeSet;
use syntect::html::{ClassStyle, ClassedHTMLGenerator, css_for_theme_with_class_style};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;
use tracing::{debug, warn};

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "hl-" };

/// Content signatures for untagged code, checked in order. Each entry is
/// the reported language, the syntax token to look up and a pattern that
/// must match somewhere in the code.
static SIGNATURES: LazyLock<Vec<(&'static str, &'static str, Regex)>> = LazyLock::new(|| {
    [
        ("rust", "rs", r"\bfn\s+\w+\s*(<[^>]*>)?\s*\(|\blet\s+mut\b|\bimpl\b.*\{|#\[derive\("),
        ("go", "go", r"(?m)^package\s+\w+\s*$|\bfunc\s+(\(\w+\s+\*?\w+\)\s*)?\w+\("),
        ("python", "py", r"(?m)^\s*(def|class)\s+\w+.*:\s*$|^\s*(from\s+\S+\s+)?import\s+\w+\s*$"),
        ("java", "java", r"\bpublic\s+(static\s+)?(class|void|interface)\b"),
        ("cpp", "cpp", r"(?m)^\s*#include\s*[<\x22]|\bstd::"),
        ("php", "php", r"<\?php"),
        ("html", "html", r"(?i)<(!doctype|html|head|body|div|span|p|a)[\s>]"),
        ("sql", "sql", r"(?i)\b(select\s+.+\s+from|insert\s+into|create\s+table|update\s+\w+\s+set)\b"),
        ("javascript", "js", r"\bfunction\s*\w*\s*\(|\b(const|let|var)\s+\w+\s*=|=>|\bconsole\.log\("),
        ("json", "json", r"\A\s*[\[{]\s*\x22[^\x22]*\x22\s*:"),
        ("bash", "sh", r"(?m)^\s*(echo|export|sudo|apt|cd|ls|grep|curl|git)\s"),
    ]
    .into_iter()
    .map(|(language, token, pattern)| {
        let re = Regex::new(pattern).expect("signature pattern is valid");
        (language, token, re)
    })
    .collect()
});

/// Theme used when none is configured or the configured one is unknown.
pub const DEFAULT_THEME: &str = "base16-ocean.dark";

/// Language class for code that is not highlighted.
pub const PLAIN_TEXT: &str = "plaintext";

/// A highlighted code block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlighted {
    /// HTML for the code body, safe to embed inside `<code>`.
    pub html: String,
    /// The language the code was highlighted as.
    pub language: String,
}

/// Highlights `code` as `lang`.
///
/// Unknown or missing languages fall back to detection from the first line
/// (shebangs, `<?xml`, modelines); undetectable code is emitted as escaped
/// plain text. Highlighting never fails: any error degrades to escaped text.
#[must_use]
pub fn highlight(code: &str, lang: Option<&str>) -> Highlighted {
    let requested = lang
        .filter(|lang| !lang.is_empty())
        .and_then(|lang| find_syntax(lang).map(|syntax| (lang.to_owned(), syntax)));

    let (language, syntax) = requested.unwrap_or_else(|| {
        if let Some(lang) = lang {
            debug!(lang, "unknown code block language, detecting");
        }
        detect_syntax(code)
    });

    match render_classed(code, syntax) {
        Ok(html) => Highlighted { html, language },
        Err(err) => {
            debug!(error = %err, language, "highlighting failed, emitting plain text");
            Highlighted {
                html: escape_html(code),
                language: PLAIN_TEXT.to_owned(),
            }
        }
    }
}

fn find_syntax(lang: &str) -> Option<&'static SyntaxReference> {
    let set: &'static SyntaxSet = &SYNTAX_SET;
    set.find_syntax_by_token(lang)
        .or_else(|| set.find_syntax_by_name(lang))
}

/// Guesses the language of untagged code: first-line markers (shebangs,
/// `<?xml`, modelines) win, then content signatures, then plain text.
fn detect_syntax(code: &str) -> (String, &'static SyntaxReference) {
    let set: &'static SyntaxSet = &SYNTAX_SET;
    let first_line = code.lines().next().unwrap_or_default();
    if let Some(syntax) = set.find_syntax_by_first_line(first_line) {
        let language = syntax
            .file_extensions
            .first()
            .cloned()
            .unwrap_or_else(|| PLAIN_TEXT.to_owned());
        return (language, syntax);
    }

    SIGNATURES
        .iter()
        .filter(|(_, _, re)| re.is_match(code))
        .find_map(|(language, token, _)| {
            set.find_syntax_by_extension(token)
                .map(|syntax| ((*language).to_owned(), syntax))
        })
        .unwrap_or_else(|| (PLAIN_TEXT.to_owned(), set.find_syntax_plain_text()))
}

fn render_classed(code: &str, syntax: &SyntaxReference) -> Result<String, syntect::Error> {
    let mut generator =
        ClassedHTMLGenerator::new_with_class_style(syntax, &SYNTAX_SET, CLASS_STYLE);
    for line in LinesWithEndings::from(code) {
        generator.parse_html_for_line_which_includes_newline(line)?;
    }
    Ok(generator.finalize())
}

/// Returns the stylesheet for the bundled theme `name`, matching the classes
/// emitted by [`highlight`].
///
/// Unknown theme names fall back to [`DEFAULT_THEME`].
#[must_use]
pub fn theme_css(name: &str) -> String {
    let theme = THEME_SET.themes.get(name).or_else(|| {
        warn!(theme = name, fallback = DEFAULT_THEME, "unknown highlight theme");
        THEME_SET.themes.get(DEFAULT_THEME)
    });
    let Some(theme) = theme else {
        return String::new();
    };

    css_for_theme_with_class_style(theme, CLASS_STYLE).unwrap_or_else(|err| {
        warn!(error = %err, theme = name, "failed to build highlight stylesheet");
        String::new()
    })
}

/// Returns `true` if `name` is one of the bundled themes.
#[must_use]
pub fn has_theme(name: &str) -> bool {
    THEME_SET.themes.contains_key(name)
}

/// Names of the bundled themes.
pub fn theme_names() -> impl Iterator<Item = &'static str> {
    let set: &'static ThemeSet = &THEME_SET;
    set.themes.keys().map(String::as_str)
}
