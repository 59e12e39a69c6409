// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! HTML rendering for parsed channel exports.
//!
//! This module turns a list of messages into a standalone HTML document
//! styled after the Discord client. Messages are walked oldest first:
//!
//! - consecutive messages from one author within the chain window are
//!   rendered compactly, without repeating the avatar and name
//! - replies get a one-line preview of the message they answer
//! - content, embed descriptions and embed fields go through
//!   [`format_content`]
//! - attachments, embeds and reactions follow the message body
//!
//! Rendering is best-effort: missing optional data is left out and nothing
//! in one message can stop the rest of the document from rendering.
//!
//! # Example
//!
//! ```
//! use dc2html::parser::parse_transcript;
//! use dc2html::renderer::{render, RenderOptions};
//!
//! let transcript = parse_transcript(r#"{
//!     "channel": { "id": "42", "name": "general" },
//!     "messages": [{
//!         "id": "1",
//!         "author": { "id": "7", "username": "ferris" },
//!         "content": "hello **world**",
//!         "timestamp": "2024-12-05T00:00:00+00:00"
//!     }]
//! }"#).unwrap();
//!
//! let html = render(&transcript, &RenderOptions::default());
//!
//! assert!(html.starts_with("<!DOCTYPE html>"));
//! assert!(html.contains("hello <b>world</b>"));
//! ```

use crate::format::{escape_html, flatten_reply_preview, format_content, hex_color};
use crate::highlight;
use crate::parser::{
    Attachment, Channel, Embed, Guild, Message, Reaction, RoleIcon, RoleSet, Transcript,
};
use chrono::{DateTime, Duration, FixedOffset};
use std::fmt::Write;
use tracing::{info, trace};

const STYLESHEET: &str = include_str!("../assets/transcript.css");
const TWEMOJI_SCRIPT: &str = "https://unpkg.com/twemoji@latest/dist/twemoji.min.js";

const DEFAULT_NAME_COLOR: &str = "#f2f3f5";
const DEFAULT_EMBED_COLOR: &str = "#1e1f22";
const DEFAULT_VIDEO_WIDTH: u32 = 400;
const DEFAULT_VIDEO_HEIGHT: u32 = 225;

const HEADER_TIME_FORMAT: &str = "%Y/%m/%d %H:%M";
const CHAINED_TIME_FORMAT: &str = "%H:%M";

/// Configuration options for HTML rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Maximum gap between two messages of one author for the second to be
    /// rendered as a continuation of the first.
    pub chain_window: Duration,

    /// Name of the bundled syntax highlighting theme for code blocks.
    pub highlight_theme: String,

    /// Whether to load twemoji so unicode emoji render as Discord shows them.
    ///
    /// Disable for documents that must work offline.
    pub twemoji: bool,

    /// Maximum number of characters of a replied-to message shown in the
    /// reply header. `0` shows the whole message.
    pub reply_preview_chars: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            chain_window: Duration::minutes(5),
            highlight_theme: highlight::DEFAULT_THEME.to_owned(),
            twemoji: true,
            reply_preview_chars: 100,
        }
    }
}

/// Renders a parsed transcript as an HTML document.
///
/// Convenience wrapper around [`render_transcript`] that builds the
/// [`RoleSet`] from the transcript's roles.
#[must_use]
pub fn render(transcript: &Transcript, opts: &RenderOptions) -> String {
    let roles = RoleSet::new(transcript.roles.clone());
    render_transcript(
        &transcript.messages,
        &transcript.channel,
        transcript.guild.as_ref(),
        &roles,
        opts,
    )
}

/// Renders `messages` (oldest first) as a complete HTML document.
///
/// # Arguments
///
/// * `messages` - The messages to render, oldest first
/// * `channel` - The channel the messages come from
/// * `guild` - The guild owning the channel, if any
/// * `roles` - Guild roles, used for name colors, role icons and role mentions
/// * `opts` - Configuration options controlling the output
#[must_use]
pub fn render_transcript(
    messages: &[Message],
    channel: &Channel,
    guild: Option<&Guild>,
    roles: &RoleSet,
    opts: &RenderOptions,
) -> String {
    let mut body = String::new();
    let mut previous: Option<(&str, DateTime<FixedOffset>)> = None;

    for msg in messages {
        let chained = continues(previous, msg, opts.chain_window);
        previous = Some((msg.author.id.as_str(), msg.timestamp));
        trace!(id = %msg.id, chained, "rendering message");
        render_message(&mut body, msg, chained, roles, opts);
    }

    info!(
        channel = %channel.id,
        messages = messages.len(),
        "rendered transcript"
    );
    render_document(&body, messages.len(), channel, guild, opts)
}

/// Returns `true` if `msg` continues the run of the previous message: same
/// author, not a reply, and sent less than `window` after it.
fn continues(
    previous: Option<(&str, DateTime<FixedOffset>)>,
    msg: &Message,
    window: Duration,
) -> bool {
    previous.is_some_and(|(author_id, sent_at)| {
        author_id == msg.author.id && !msg.is_reply() && msg.timestamp - sent_at < window
    })
}

fn render_document(
    body: &str,
    count: usize,
    channel: &Channel,
    guild: Option<&Guild>,
    opts: &RenderOptions,
) -> String {
    let channel_name = escape_html(channel.display_name());
    let title = match guild {
        Some(guild) => format!("{} - #{channel_name}", escape_html(&guild.name)),
        None => format!("#{channel_name}"),
    };
    let subtitle = match guild {
        Some(guild) => format!("{} • {}", escape_html(&guild.name), message_count(count)),
        None => message_count(count),
    };

    let mut out = String::with_capacity(body.len() + STYLESHEET.len() + 4096);
    out.push_str("<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"UTF-8\">");
    out.push_str(
        "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">",
    );
    write!(out, "<title>Transcript: {title}</title>").unwrap();
    write!(out, "<style>{STYLESHEET}</style>").unwrap();
    write!(out, "<style>{}</style>", highlight::theme_css(&opts.highlight_theme)).unwrap();
    if opts.twemoji {
        write!(
            out,
            r#"<script src="{TWEMOJI_SCRIPT}" crossorigin="anonymous"></script>"#
        )
        .unwrap();
    }
    out.push_str("</head><body><div class=\"container\">");
    write!(
        out,
        r#"<div class="header"><h1>Start of #{channel_name}</h1><p>{subtitle} • Generated with {}</p></div>"#,
        env!("CARGO_PKG_NAME")
    )
    .unwrap();
    write!(out, r#"<div class="messages">{body}</div></div>"#).unwrap();
    if opts.twemoji {
        out.push_str("<script>twemoji.parse(document.body);</script>");
    }
    out.push_str("</body></html>");
    out
}

fn message_count(count: usize) -> String {
    if count == 1 {
        "1 message".to_owned()
    } else {
        format!("{count} messages")
    }
}

fn render_message(
    out: &mut String,
    msg: &Message,
    chained: bool,
    roles: &RoleSet,
    opts: &RenderOptions,
) {
    let id = escape_html(&msg.id);
    let content = format_content(&msg.content, &msg.mentions, roles);

    if chained {
        write!(
            out,
            r#"<div class="message-group chained" id="msg-{id}"><div class="chained-timestamp">{}</div><div class="content-wrapper">{content}"#,
            msg.timestamp.format(CHAINED_TIME_FORMAT)
        )
        .unwrap();
    } else {
        let name = escape_html(msg.author_display_name());
        let style = msg
            .member
            .as_ref()
            .map(|member| roles.style_for(&member.roles))
            .unwrap_or_default();
        let color = style
            .color
            .map_or_else(|| DEFAULT_NAME_COLOR.to_owned(), hex_color);

        write!(
            out,
            r#"<div class="message-group" id="msg-{id}"><div class="avatar"><img src="{}" alt="{name}"></div><div class="content-wrapper"><div class="meta"><span class="username" style="color:{color}" title="{}">{name}</span>"#,
            escape_html(&msg.author.avatar_url()),
            escape_html(&msg.author.username),
        )
        .unwrap();
        if let Some(icon) = style.icon {
            render_role_icon(out, icon);
        }
        if msg.author.bot {
            out.push_str(r#"<span class="bot-tag">App</span>"#);
        }
        write!(
            out,
            r#"<span class="timestamp">{}</span></div>"#,
            msg.timestamp.format(HEADER_TIME_FORMAT)
        )
        .unwrap();
        if let Some(reply) = &msg.referenced_message {
            render_reply(out, reply, opts);
        }
        write!(out, r#"<div class="content">{content}</div>"#).unwrap();
    }

    for attachment in &msg.attachments {
        render_attachment(out, attachment);
    }
    for embed in &msg.embeds {
        render_embed(out, embed, msg, roles);
    }
    render_reactions(out, &msg.reactions);
    out.push_str("</div></div>\n");
}

fn render_role_icon(out: &mut String, icon: RoleIcon<'_>) {
    match icon {
        RoleIcon::Asset { name, .. } => {
            let url = icon.asset_url().unwrap_or_default();
            write!(
                out,
                r#"<img src="{}" class="role-icon" title="{}">"#,
                escape_html(&url),
                escape_html(name)
            )
            .unwrap();
        }
        RoleIcon::Unicode { glyph, name } => {
            write!(
                out,
                r#"<span class="role-icon-unicode" title="{}">{}</span>"#,
                escape_html(name),
                escape_html(glyph)
            )
            .unwrap();
        }
    }
}

fn render_reply(out: &mut String, reply: &Message, opts: &RenderOptions) {
    let jump = format!(
        "document.getElementById('msg-{}').scrollIntoView({{behavior:'smooth',block:'center'}})",
        escape_html(&reply.id)
    );
    write!(
        out,
        r#"<div class="reply-bar"><div class="reply-spine"></div><img class="reply-avatar" src="{}"><div class="reply-name" onclick="{jump}">@{}</div><div class="reply-content" onclick="{jump}">{}</div></div>"#,
        escape_html(&reply.author.avatar_url()),
        escape_html(reply.author_display_name()),
        flatten_reply_preview(&reply.content, opts.reply_preview_chars)
    )
    .unwrap();
}

fn render_attachment(out: &mut String, attachment: &Attachment) {
    let url = escape_html(&attachment.url);
    let filename = escape_html(&attachment.filename);
    if attachment.is_image() {
        write!(
            out,
            r#"<div class="attachment"><a href="{url}" target="_blank"><img src="{url}" alt="{filename}"></a></div>"#
        )
        .unwrap();
    } else {
        write!(
            out,
            r#"<div class="attachment file-attachment"><a href="{url}" target="_blank">📄 {filename}</a> ({} KB)</div>"#,
            kibibytes(attachment.size)
        )
        .unwrap();
    }
}

/// Formats a byte count in KiB with two decimals.
#[allow(clippy::cast_precision_loss)]
fn kibibytes(bytes: u64) -> String {
    format!("{:.2}", bytes as f64 / 1024.0)
}

/// Returns `true` for embeds rendered as an inline video player.
///
/// Matches the provider name or a substring of the embed URL, exactly as the
/// Discord exporter always has.
fn is_video_embed(embed: &Embed) -> bool {
    embed
        .provider
        .as_ref()
        .and_then(|provider| provider.name.as_deref())
        == Some("YouTube")
        || embed.url.as_deref().is_some_and(|url| url.contains("youtube"))
}

fn render_embed(out: &mut String, embed: &Embed, msg: &Message, roles: &RoleSet) {
    let color = embed
        .color
        .filter(|&color| color != 0)
        .map_or_else(|| DEFAULT_EMBED_COLOR.to_owned(), hex_color);

    if let Some(video) = &embed.video
        && let Some(video_url) = video.url.as_deref()
        && is_video_embed(embed)
    {
        let width = video.width.unwrap_or(DEFAULT_VIDEO_WIDTH);
        let height = video.height.unwrap_or(DEFAULT_VIDEO_HEIGHT);
        write!(
            out,
            r#"<div class="embed embed-video" style="border-left-color:{color};max-width:{width}px"><div class="embed-grid">"#
        )
        .unwrap();
        render_embed_title(out, embed);
        write!(
            out,
            r#"<iframe width="{width}" height="{height}" src="{}" frameborder="0" allowfullscreen></iframe></div></div>"#,
            escape_html(&video_url.replace("watch?v=", "embed/"))
        )
        .unwrap();
        return;
    }

    write!(
        out,
        r#"<div class="embed" style="border-left-color:{color}"><div class="embed-grid">"#
    )
    .unwrap();

    if let Some(author) = &embed.author {
        out.push_str(r#"<div class="embed-author">"#);
        if let Some(icon) = &author.icon_url {
            write!(
                out,
                r#"<img class="embed-author-icon" src="{}">"#,
                escape_html(icon)
            )
            .unwrap();
        }
        let name = escape_html(&author.name);
        match &author.url {
            Some(url) => write!(
                out,
                r#"<a href="{}" class="embed-author-name" target="_blank">{name}</a>"#,
                escape_html(url)
            )
            .unwrap(),
            None => write!(out, r#"<span class="embed-author-name">{name}</span>"#).unwrap(),
        }
        out.push_str("</div>");
    }

    if let Some(thumbnail) = &embed.thumbnail {
        write!(
            out,
            r#"<img class="embed-thumbnail" src="{}">"#,
            escape_html(&thumbnail.url)
        )
        .unwrap();
    }

    render_embed_title(out, embed);

    if let Some(description) = embed.description.as_deref().filter(|d| !d.is_empty()) {
        write!(
            out,
            r#"<div class="embed-desc">{}</div>"#,
            format_content(description, &msg.mentions, roles)
        )
        .unwrap();
    }

    if !embed.fields.is_empty() {
        out.push_str(r#"<div class="embed-fields">"#);
        for field in &embed.fields {
            write!(
                out,
                r#"<div class="embed-field{}"><div class="embed-field-name">{}</div><div class="embed-field-value">{}</div></div>"#,
                if field.inline { " inline" } else { "" },
                escape_html(&field.name),
                format_content(&field.value, &msg.mentions, roles)
            )
            .unwrap();
        }
        out.push_str("</div>");
    }

    if let Some(image) = &embed.image {
        write!(
            out,
            r#"<div class="embed-image"><img src="{}"></div>"#,
            escape_html(&image.url)
        )
        .unwrap();
    }

    if let Some(footer) = &embed.footer {
        out.push_str(r#"<div class="embed-footer">"#);
        if let Some(icon) = &footer.icon_url {
            write!(
                out,
                r#"<img class="embed-footer-icon" src="{}">"#,
                escape_html(icon)
            )
            .unwrap();
        }
        out.push_str(&escape_html(&footer.text));
        if let Some(timestamp) = embed.timestamp {
            write!(
                out,
                r#"<span class="embed-footer-timestamp">• {}</span>"#,
                timestamp.format(HEADER_TIME_FORMAT)
            )
            .unwrap();
        }
        out.push_str("</div>");
    }

    out.push_str("</div></div>");
}

fn render_embed_title(out: &mut String, embed: &Embed) {
    let Some(title) = embed.title.as_deref().filter(|t| !t.is_empty()) else {
        return;
    };
    let title = escape_html(title);
    match &embed.url {
        Some(url) => write!(
            out,
            r#"<a href="{}" class="embed-title" target="_blank">{title}</a>"#,
            escape_html(url)
        )
        .unwrap(),
        None => write!(out, r#"<div class="embed-title">{title}</div>"#).unwrap(),
    }
}

fn render_reactions(out: &mut String, reactions: &[Reaction]) {
    if reactions.is_empty() {
        return;
    }
    out.push_str(r#"<div class="reactions">"#);
    for reaction in reactions {
        let name = reaction.emoji.name.as_deref().unwrap_or("emoji");
        write!(
            out,
            r#"<div class="reaction{}" title="{}">"#,
            if reaction.me { " reaction-me" } else { "" },
            escape_html(name)
        )
        .unwrap();
        match reaction.emoji.image_url() {
            Some(url) => write!(
                out,
                r#"<img class="reaction-emoji" src="{}" alt=":{}:">"#,
                escape_html(&url),
                escape_html(name)
            )
            .unwrap(),
            None => write!(
                out,
                r#"<span class="reaction-emoji">{}</span>"#,
                escape_html(name)
            )
            .unwrap(),
        }
        write!(
            out,
            r#"<span class="reaction-count">{}</span></div>"#,
            reaction.count
        )
        .unwrap();
    }
    out.push_str("</div>");
}
