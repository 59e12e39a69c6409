// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Conversion of Discord message markup into HTML.
//!
//! [`format_content`] is used for every free-text field of a message: the
//! content itself, embed descriptions and embed field values. Input is
//! split into code and text segments first; code is emitted verbatim
//! (highlighted or escaped), while text goes through a fixed sequence of
//! passes:
//!
//! 1. `:shortcode:` emoji to unicode
//! 2. HTML escaping
//! 3. custom emoji, user, role and channel mentions
//! 4. bold, italic, underline and strikethrough
//! 5. bare URL auto-linking
//! 6. newlines to `<br>`
//!
//! HTML produced in step 3 is kept out of steps 4 to 6 and spliced back at
//! the end, so names containing `_` or `*` cannot be turned into emphasis.
//!
//! # Example
//!
//! ```
//! use dc2html::format::format_content;
//! use dc2html::parser::RoleSet;
//!
//! let html = format_content("hello **world** & `<code>`", &[], &RoleSet::default());
//! assert_eq!(html, "hello <b>world</b> &amp; <code>&lt;code&gt;</code>");
//! ```

use crate::highlight;
use crate::parser::{RoleSet, User, custom_emoji_url};
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::LazyLock;
use tracing::debug;

/// Code blocks and inline code spans, in document order.
static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```|`[^`]+`").expect("code pattern is valid"));
static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\A```([A-Za-z0-9_]+)?\s*(.*?)```\z").expect("fence pattern is valid")
});
static SHORTCODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":([A-Za-z0-9_+\-]+):").expect("shortcode pattern is valid"));
static CUSTOM_EMOJI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&lt;(a?):([A-Za-z0-9_]+):([0-9]+)&gt;").expect("emoji pattern is valid")
});
static USER_MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&lt;@!?([0-9]+)&gt;").expect("user pattern is valid"));
static ROLE_MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&lt;@&amp;([0-9]+)&gt;").expect("role pattern is valid"));
static CHANNEL_MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&lt;#([0-9]+)&gt;").expect("channel pattern is valid"));
static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\*\*(.+?)\*\*").expect("bold pattern is valid"));
static ITALIC_STAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*]+)\*").expect("italic pattern is valid"));
static ITALIC_UNDERSCORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_([^_]+)_").expect("italic pattern is valid"));
static UNDERLINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"__([^_]+)__").expect("underline pattern is valid"));
static STRIKE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"~~([^~]+)~~").expect("strike pattern is valid"));
static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://[^\s<\x{E000}\x{E001}]+").expect("url pattern is valid")
});
static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x{E000}([0-9]+)\x{E001}").expect("token pattern is valid"));
static REPLY_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```([A-Za-z0-9_]+\s)?(.*?)```").expect("reply fence pattern is valid")
});
static REPLY_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("reply code pattern is valid"));

/// Opening and closing marks of a held-out HTML token. Both are private use
/// characters; [`escape_html`] encodes any that appear in user text.
const TOKEN_OPEN: char = '\u{E000}';
const TOKEN_CLOSE: char = '\u{E001}';

/// Role mention colors for roles without a color of their own.
const DEFAULT_MENTION_COLOR: &str = "#dee0fc";
const DEFAULT_MENTION_BACKGROUND: &str = "rgba(88,101,242,0.3)";

/// Shown in a reply header when the referenced message has no text.
const EMPTY_REPLY_PREVIEW: &str = "Click to jump";

/// Escapes a string for use in HTML text and attribute values.
///
/// Handles `&`, `<`, `>`, `"` and `'`.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + s.len() / 4);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            TOKEN_OPEN => out.push_str("&#57344;"),
            TOKEN_CLOSE => out.push_str("&#57345;"),
            _ => out.push(c),
        }
    }
    out
}

/// Formats a color as `#rrggbb`.
#[must_use]
pub fn hex_color(color: u32) -> String {
    format!("#{:06x}", color & 0x00ff_ffff)
}

/// Converts Discord markup into an HTML fragment.
///
/// `mentions` resolves `<@id>` user mentions; `roles` resolves `<@&id>`
/// role mentions. Unresolvable mentions degrade to placeholders. The
/// result is always safe to embed in an HTML body.
#[must_use]
pub fn format_content(text: &str, mentions: &[User], roles: &RoleSet) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut out = String::with_capacity(text.len() * 2);
    let mut last = 0;
    for code in CODE_RE.find_iter(text) {
        out.push_str(&format_text(&text[last..code.start()], mentions, roles));
        out.push_str(&format_code(code.as_str()));
        last = code.end();
    }
    out.push_str(&format_text(&text[last..], mentions, roles));
    out
}

fn format_code(part: &str) -> String {
    if !part.starts_with("```") {
        let inner = &part[1..part.len() - 1];
        return format!("<code>{}</code>", escape_html(inner));
    }

    let Some(caps) = FENCE_RE.captures(part) else {
        return escape_html(part);
    };
    let lang = caps.get(1).map(|m| m.as_str());
    let code = caps.get(2).map_or("", |m| m.as_str());
    let highlighted = highlight::highlight(code, lang);

    format!(
        r#"<pre><code class="code hl-code language-{}">{}</code></pre>"#,
        escape_html(&highlighted.language),
        highlighted.html
    )
}

/// HTML fragments held out of the emphasis and link passes.
#[derive(Default)]
struct HeldOut(Vec<String>);

impl HeldOut {
    fn hold(&mut self, html: String) -> String {
        let token = format!("{TOKEN_OPEN}{}{TOKEN_CLOSE}", self.0.len());
        self.0.push(html);
        token
    }

    fn restore(&self, text: &str) -> String {
        if self.0.is_empty() {
            return text.to_owned();
        }
        TOKEN_RE
            .replace_all(text, |caps: &Captures| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|idx| self.0.get(idx))
                    .cloned()
                    .unwrap_or_default()
            })
            .into_owned()
    }
}

fn format_text(segment: &str, mentions: &[User], roles: &RoleSet) -> String {
    if segment.is_empty() {
        return String::new();
    }

    let escaped = escape_html(&replace_shortcodes(segment));
    let mut held = HeldOut::default();

    let text = CUSTOM_EMOJI_RE.replace_all(&escaped, |caps: &Captures| {
        held.hold(custom_emoji_html(&caps[2], &caps[3], &caps[1] == "a"))
    });
    let text = USER_MENTION_RE.replace_all(&text, |caps: &Captures| {
        held.hold(user_mention_html(&caps[1], mentions))
    });
    let text = ROLE_MENTION_RE.replace_all(&text, |caps: &Captures| {
        held.hold(role_mention_html(&caps[1], roles))
    });
    let text = CHANNEL_MENTION_RE.replace_all(&text, |_: &Captures| {
        held.hold(r#"<span class="mention">#Channel</span>"#.to_owned())
    });

    let text = BOLD_RE.replace_all(&text, "<b>${1}</b>");
    let text = ITALIC_STAR_RE.replace_all(&text, "<i>${1}</i>");
    let text = ITALIC_UNDERSCORE_RE.replace_all(&text, "<i>${1}</i>");
    let text = UNDERLINE_RE.replace_all(&text, "<u>${1}</u>");
    let text = STRIKE_RE.replace_all(&text, "<s>${1}</s>");
    let text = autolink(&text);
    let text = text.replace('\n', "<br>");

    held.restore(&text)
}

/// Replaces known `:shortcode:` aliases with their emoji.
///
/// The name part of a custom emoji tag (`<:name:id>`) is left alone.
fn replace_shortcodes(segment: &str) -> Cow<'_, str> {
    if !segment.contains(':') {
        return Cow::Borrowed(segment);
    }
    SHORTCODE_RE.replace_all(segment, |caps: &Captures| {
        let start = caps.get(0).map_or(0, |m| m.start());
        let before = &segment[..start];
        let in_custom_tag = before.ends_with('<') || before.ends_with("<a");
        match emojis::get_by_shortcode(&caps[1]) {
            Some(emoji) if !in_custom_tag => emoji.as_str().to_owned(),
            _ => caps[0].to_owned(),
        }
    })
}

/// Links bare URLs that do not directly follow `"` or `=`.
///
/// A guarded match only skips its first character, so a URL embedded
/// later in the same run is still linked.
fn autolink(text: &str) -> Cow<'_, str> {
    let mut out = String::new();
    let mut last = 0;
    let mut pos = 0;
    while let Some(m) = URL_RE.find_at(text, pos) {
        if text[..m.start()].ends_with(|c| c == '"' || c == '=') {
            // Matches start with the ASCII `h` of the scheme.
            pos = m.start() + 1;
            continue;
        }
        let url = m.as_str();
        out.push_str(&text[last..m.start()]);
        out.push_str(&format!(r#"<a href="{url}" target="_blank">{url}</a>"#));
        last = m.end();
        pos = m.end();
    }

    if last == 0 {
        return Cow::Borrowed(text);
    }
    out.push_str(&text[last..]);
    Cow::Owned(out)
}

fn custom_emoji_html(name: &str, id: &str, animated: bool) -> String {
    format!(
        r#"<img class="emoji" src="{}" alt=":{name}:" title=":{name}:">"#,
        custom_emoji_url(id, animated)
    )
}

fn user_mention_html(id: &str, mentions: &[User]) -> String {
    let user = mentions.iter().find(|user| user.id == id);
    if user.is_none() {
        debug!(id, "unresolved user mention");
    }
    let title = user.map_or(id, |user| user.username.as_str());
    let name = user.map_or(id, User::display_name);
    format!(
        r#"<span class="mention" title="{}">@{}</span>"#,
        escape_html(title),
        escape_html(name)
    )
}

fn role_mention_html(id: &str, roles: &RoleSet) -> String {
    let Some(role) = roles.get(id) else {
        debug!(id, "unresolved role mention");
        return r#"<span class="mention">@Role</span>"#.to_owned();
    };

    let (color, background) = if role.color == 0 {
        (
            DEFAULT_MENTION_COLOR.to_owned(),
            DEFAULT_MENTION_BACKGROUND.to_owned(),
        )
    } else {
        let c = role.color;
        (
            hex_color(c),
            format!(
                "rgba({}, {}, {}, 0.1)",
                (c >> 16) & 0xff,
                (c >> 8) & 0xff,
                c & 0xff
            ),
        )
    };
    format!(
        r#"<span class="mention" style="color:{color};background-color:{background}">@{}</span>"#,
        escape_html(&role.name)
    )
}

/// Flattens referenced message content into a one-line reply preview.
///
/// The text is cut to `max_chars` characters (`0` disables the limit),
/// escaped, code is reduced to plain `<code>` spans and newlines become
/// spaces. Empty content yields a "Click to jump" hint.
#[must_use]
pub fn flatten_reply_preview(content: &str, max_chars: usize) -> String {
    if content.is_empty() {
        return EMPTY_REPLY_PREVIEW.to_owned();
    }

    let escaped = escape_html(&truncate_chars(content, max_chars));
    let text = REPLY_FENCE_RE.replace_all(&escaped, "<code>${2}</code>");
    let text = REPLY_CODE_RE.replace_all(&text, "<code>${1}</code>");
    text.replace('\n', " ")
}

fn truncate_chars(s: &str, max_chars: usize) -> Cow<'_, str> {
    if max_chars == 0 {
        return Cow::Borrowed(s);
    }
    match s.char_indices().nth(max_chars) {
        Some((cut, _)) => Cow::Owned(format!("{}…", &s[..cut])),
        None => Cow::Borrowed(s),
    }
}
