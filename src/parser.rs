// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! JSON parsing for Discord channel exports.
//!
//! This module holds the typed model of everything a transcript needs:
//! messages with their authors, attachments, embeds, reactions and reply
//! targets, plus the channel, guild and role lookup data fetched alongside
//! them. The field names follow the Discord REST API so raw API payloads
//! deserialize directly.
//!
//! Parsing is lenient where the renderer can cope: a malformed embed,
//! attachment or reaction is dropped and an unparseable embed timestamp
//! becomes `None`. Fields the renderer cannot work without (a message's
//! `id`, `author` and `timestamp`) are required and their absence is a
//! [`ParseError`].
//!
//! # Example
//!
//! ```
//! use dc2html::parser::parse_transcript;
//!
//! let json = r#"{
//!     "channel": { "id": "42", "name": "general" },
//!     "messages": [{
//!         "id": "1",
//!         "author": { "id": "7", "username": "ferris" },
//!         "content": "Hello",
//!         "timestamp": "2024-12-05T00:00:00+00:00"
//!     }]
//! }"#;
//!
//! let transcript = parse_transcript(json).unwrap();
//! assert_eq!(transcript.messages.len(), 1);
//! assert_eq!(transcript.channel.display_name(), "general");
//! ```

use chrono::{DateTime, FixedOffset};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use snafu::prelude::*;
use tracing::warn;

/// Base URL of the Discord media CDN used for avatars, emoji and role icons.
pub const CDN_BASE: &str = "https://cdn.discordapp.com";

/// Error type for JSON parsing failures.
#[derive(Debug, Snafu)]
pub enum ParseError {
    /// Failed to parse JSON content.
    #[snafu(display("failed to parse JSON: {source}"))]
    Json {
        /// The underlying JSON parsing error.
        source: serde_json::Error,
    },
}

/// A complete channel export: the messages plus the lookup data needed to
/// render them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Transcript {
    /// The channel the messages were fetched from.
    pub channel: Channel,

    /// The guild owning the channel, if it is a guild channel.
    #[serde(default)]
    pub guild: Option<Guild>,

    /// Every role of the guild, in any order.
    #[serde(default, deserialize_with = "lenient_list")]
    pub roles: Vec<Role>,

    /// Messages, oldest first.
    pub messages: Vec<Message>,
}

/// The channel a transcript was taken from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Channel {
    /// Channel snowflake.
    pub id: String,
    /// Channel name; direct messages have none.
    #[serde(default)]
    pub name: Option<String>,
}

impl Channel {
    /// Returns the channel name, or its id when it has no name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.id)
    }
}

/// The guild (server) a channel belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Guild {
    /// Guild snowflake.
    pub id: String,
    /// Guild name.
    pub name: String,
}

/// A Discord user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    /// User snowflake.
    pub id: String,

    /// Unique account name.
    pub username: String,

    /// Global display name, if the user set one.
    #[serde(default)]
    pub global_name: Option<String>,

    /// Avatar hash; `None` means the user has the default avatar.
    #[serde(default)]
    pub avatar: Option<String>,

    /// Whether the account is a bot or application.
    #[serde(default, deserialize_with = "null_default")]
    pub bot: bool,

    /// Legacy four digit suffix; `"0"` for accounts on the new username system.
    #[serde(default = "default_discriminator")]
    pub discriminator: String,

    /// Partial guild member attached to mentioned users.
    #[serde(default, deserialize_with = "lenient_option")]
    pub member: Option<GuildMember>,
}

fn default_discriminator() -> String {
    "0".to_owned()
}

impl User {
    /// Returns the name shown for this user: guild nickname, then global
    /// display name, then username.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.member
            .as_ref()
            .and_then(GuildMember::nickname)
            .or_else(|| self.global_name.as_deref().filter(|name| !name.is_empty()))
            .unwrap_or(&self.username)
    }

    /// Returns the avatar image URL, falling back to one of the default
    /// avatars when the user has not uploaded one.
    #[must_use]
    pub fn avatar_url(&self) -> String {
        match self.avatar.as_deref().filter(|hash| !hash.is_empty()) {
            Some(hash) => format!("{CDN_BASE}/avatars/{}/{hash}.png", self.id),
            None => format!(
                "{CDN_BASE}/embed/avatars/{}.png",
                self.default_avatar_index()
            ),
        }
    }

    /// Index of the default avatar assigned to this user.
    ///
    /// Accounts on the new username system are keyed by the timestamp bits
    /// of their id (`(id >> 22) % 6`); legacy accounts by `discriminator % 5`.
    /// Ids or discriminators that are not numbers map to the first avatar.
    #[must_use]
    pub fn default_avatar_index(&self) -> u64 {
        if self.discriminator == "0" {
            self.id.parse::<u64>().map_or(0, |id| (id >> 22) % 6)
        } else {
            self.discriminator.parse::<u64>().map_or(0, |d| d % 5)
        }
    }
}

/// Per-guild data of a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GuildMember {
    /// Guild nickname.
    #[serde(default)]
    pub nick: Option<String>,
    /// Ids of the roles the member holds.
    #[serde(default, deserialize_with = "null_default")]
    pub roles: Vec<String>,
}

impl GuildMember {
    /// Returns the nickname if one is set and non-empty.
    #[must_use]
    pub fn nickname(&self) -> Option<&str> {
        self.nick.as_deref().filter(|nick| !nick.is_empty())
    }
}

/// A guild role.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Role {
    /// Role snowflake.
    pub id: String,
    /// Role name.
    pub name: String,
    /// RGB color; `0` means the role has no color.
    #[serde(default, deserialize_with = "null_default")]
    pub color: u32,
    /// Icon asset hash.
    #[serde(default)]
    pub icon: Option<String>,
    /// Unicode emoji used as the role icon.
    #[serde(default)]
    pub unicode_emoji: Option<String>,
    /// Sort position; higher positions take precedence.
    #[serde(default, deserialize_with = "null_default")]
    pub position: i64,
}

/// The icon shown next to a member's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleIcon<'a> {
    /// An uploaded icon image.
    Asset {
        /// Id of the role owning the icon.
        role_id: &'a str,
        /// Asset hash of the icon.
        hash: &'a str,
        /// Role name, used as a tooltip.
        name: &'a str,
    },
    /// A unicode emoji.
    Unicode {
        /// The emoji itself.
        glyph: &'a str,
        /// Role name, used as a tooltip.
        name: &'a str,
    },
}

impl RoleIcon<'_> {
    /// Returns the CDN URL for an uploaded icon.
    #[must_use]
    pub fn asset_url(&self) -> Option<String> {
        match self {
            Self::Asset { role_id, hash, .. } => {
                Some(format!("{CDN_BASE}/role-icons/{role_id}/{hash}.png"))
            }
            Self::Unicode { .. } => None,
        }
    }
}

impl Role {
    /// Returns the role's icon, preferring an uploaded image over a unicode
    /// emoji.
    #[must_use]
    pub fn icon(&self) -> Option<RoleIcon<'_>> {
        if let Some(hash) = self.icon.as_deref().filter(|hash| !hash.is_empty()) {
            return Some(RoleIcon::Asset {
                role_id: &self.id,
                hash,
                name: &self.name,
            });
        }
        self.unicode_emoji
            .as_deref()
            .filter(|glyph| !glyph.is_empty())
            .map(|glyph| RoleIcon::Unicode {
                glyph,
                name: &self.name,
            })
    }
}

/// The display attributes a member gets from their roles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleStyle<'a> {
    /// Name color from the highest colored role.
    pub color: Option<u32>,
    /// Icon from the highest role that has one.
    pub icon: Option<RoleIcon<'a>>,
}

/// Guild roles sorted by descending position.
///
/// Built once before rendering; the order never changes afterwards, so a
/// single set can be shared by any number of renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSet {
    roles: Vec<Role>,
}

impl RoleSet {
    /// Creates a role set, sorting the roles highest position first.
    ///
    /// Roles sharing a position keep their input order.
    #[must_use]
    pub fn new(mut roles: Vec<Role>) -> Self {
        roles.sort_by(|a, b| b.position.cmp(&a.position));
        Self { roles }
    }

    /// Looks up a role by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Role> {
        self.roles.iter().find(|role| role.id == id)
    }

    /// Iterates over the roles, highest position first.
    pub fn iter(&self) -> std::slice::Iter<'_, Role> {
        self.roles.iter()
    }

    /// Resolves the name color and role icon for a member holding `role_ids`.
    ///
    /// Roles are scanned from the highest position down. The first colored
    /// role supplies the color and the first role with an icon supplies the
    /// icon; the two are picked independently and the scan stops once both
    /// are found. Roles with color `0` never supply a color.
    #[must_use]
    pub fn style_for(&self, role_ids: &[String]) -> RoleStyle<'_> {
        let mut style = RoleStyle::default();
        for role in self.roles.iter().filter(|role| role_ids.contains(&role.id)) {
            if style.icon.is_none() {
                style.icon = role.icon();
            }
            if style.color.is_none() && role.color != 0 {
                style.color = Some(role.color);
            }
            if style.color.is_some() && style.icon.is_some() {
                break;
            }
        }
        style
    }
}

/// A message sent in a channel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Message {
    /// Message snowflake.
    pub id: String,

    /// The user who sent the message.
    pub author: User,

    /// Raw message text with Discord markup.
    #[serde(default, deserialize_with = "null_default")]
    pub content: String,

    /// When the message was sent.
    pub timestamp: DateTime<FixedOffset>,

    /// Uploaded files.
    #[serde(default, deserialize_with = "lenient_list")]
    pub attachments: Vec<Attachment>,

    /// Rich embeds.
    #[serde(default, deserialize_with = "lenient_list")]
    pub embeds: Vec<Embed>,

    /// Reactions; empty when nobody reacted.
    #[serde(default, deserialize_with = "lenient_list")]
    pub reactions: Vec<Reaction>,

    /// Users mentioned in the message.
    #[serde(default, deserialize_with = "lenient_list")]
    pub mentions: Vec<User>,

    /// The message this one replies to. `None` for non-replies and for
    /// replies whose target was deleted or could not be read.
    #[serde(default, deserialize_with = "lenient_option")]
    pub referenced_message: Option<Box<Message>>,

    /// The author's guild membership at the time of the export.
    #[serde(default, deserialize_with = "lenient_option")]
    pub member: Option<GuildMember>,
}

impl Message {
    /// Returns the author's name as shown in the guild: the member nickname,
    /// then the author's global name, then their username.
    #[must_use]
    pub fn author_display_name(&self) -> &str {
        self.member
            .as_ref()
            .and_then(GuildMember::nickname)
            .unwrap_or_else(|| self.author.display_name())
    }

    /// Returns `true` if the message replies to another message.
    #[must_use]
    pub const fn is_reply(&self) -> bool {
        self.referenced_message.is_some()
    }
}

/// A file attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Attachment {
    /// Original file name.
    pub filename: String,
    /// MIME type, when Discord detected one.
    #[serde(default)]
    pub content_type: Option<String>,
    /// Size in bytes.
    #[serde(default, deserialize_with = "null_default")]
    pub size: u64,
    /// Download URL.
    pub url: String,
}

impl Attachment {
    /// Returns `true` for attachments with an `image/*` content type.
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|kind| kind.starts_with("image/"))
    }
}

/// A rich embed.
///
/// Every part is optional. Sub-objects that fail to parse are treated as
/// absent rather than invalidating the whole embed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Embed {
    /// Title line.
    #[serde(default)]
    pub title: Option<String>,
    /// Link target of the title.
    #[serde(default)]
    pub url: Option<String>,
    /// Body text with Discord markup.
    #[serde(default)]
    pub description: Option<String>,
    /// Accent color of the left border.
    #[serde(default, deserialize_with = "lenient_option")]
    pub color: Option<u32>,
    /// Timestamp shown in the footer.
    #[serde(default, deserialize_with = "lenient_option")]
    pub timestamp: Option<DateTime<FixedOffset>>,
    /// Author line.
    #[serde(default, deserialize_with = "lenient_option")]
    pub author: Option<EmbedAuthor>,
    /// Footer line.
    #[serde(default, deserialize_with = "lenient_option")]
    pub footer: Option<EmbedFooter>,
    /// Large image.
    #[serde(default, deserialize_with = "lenient_option")]
    pub image: Option<EmbedMedia>,
    /// Small image in the top right corner.
    #[serde(default, deserialize_with = "lenient_option")]
    pub thumbnail: Option<EmbedMedia>,
    /// Video player.
    #[serde(default, deserialize_with = "lenient_option")]
    pub video: Option<EmbedVideo>,
    /// Site that produced the embed.
    #[serde(default, deserialize_with = "lenient_option")]
    pub provider: Option<EmbedProvider>,
    /// Name/value fields.
    #[serde(default, deserialize_with = "lenient_list")]
    pub fields: Vec<EmbedField>,
}

/// Author line of an embed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmbedAuthor {
    /// Author name.
    pub name: String,
    /// Link target of the name.
    #[serde(default)]
    pub url: Option<String>,
    /// Small icon before the name.
    #[serde(default)]
    pub icon_url: Option<String>,
}

/// Footer of an embed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmbedFooter {
    /// Footer text.
    pub text: String,
    /// Small icon before the text.
    #[serde(default)]
    pub icon_url: Option<String>,
}

/// An image or thumbnail of an embed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmbedMedia {
    /// Image URL.
    pub url: String,
}

/// A video of an embed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EmbedVideo {
    /// Video URL.
    #[serde(default)]
    pub url: Option<String>,
    /// Width in pixels.
    #[serde(default)]
    pub width: Option<u32>,
    /// Height in pixels.
    #[serde(default)]
    pub height: Option<u32>,
}

/// Provider of an embed (e.g. "YouTube").
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EmbedProvider {
    /// Provider name.
    #[serde(default)]
    pub name: Option<String>,
    /// Provider URL.
    #[serde(default)]
    pub url: Option<String>,
}

/// A name/value field of an embed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmbedField {
    /// Field name (plain text).
    pub name: String,
    /// Field value with Discord markup.
    pub value: String,
    /// Whether the field may share a row with its neighbours.
    #[serde(default, deserialize_with = "null_default")]
    pub inline: bool,
}

/// A reaction on a message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Reaction {
    /// Number of users who reacted.
    pub count: u64,
    /// Whether the exporting account is one of them.
    #[serde(default, deserialize_with = "null_default")]
    pub me: bool,
    /// The emoji reacted with.
    pub emoji: Emoji,
}

/// An emoji: custom emoji have an id, unicode emoji only a name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Emoji {
    /// Custom emoji snowflake.
    #[serde(default)]
    pub id: Option<String>,
    /// Emoji name, or the unicode glyph itself.
    #[serde(default)]
    pub name: Option<String>,
    /// Whether a custom emoji is animated.
    #[serde(default, deserialize_with = "null_default")]
    pub animated: bool,
}

impl Emoji {
    /// Returns the CDN image URL for a custom emoji.
    #[must_use]
    pub fn image_url(&self) -> Option<String> {
        self.id
            .as_deref()
            .map(|id| custom_emoji_url(id, self.animated))
    }
}

/// Builds the CDN URL of a custom emoji image.
#[must_use]
pub fn custom_emoji_url(id: &str, animated: bool) -> String {
    let ext = if animated { "gif" } else { "png" };
    format!("{CDN_BASE}/emojis/{id}.{ext}")
}

/// Deserializes `null` as the type's default value.
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Deserializes a list, skipping entries that do not match `T`.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let values = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(values.into_iter().filter_map(from_value_or_warn).collect())
}

/// Deserializes an optional value, treating a value that does not match `T`
/// as absent.
fn lenient_option<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(Option::<serde_json::Value>::deserialize(deserializer)?
        .filter(|value| !value.is_null())
        .and_then(from_value_or_warn))
}

fn from_value_or_warn<T: DeserializeOwned>(value: serde_json::Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            warn!(
                error = %err,
                kind = std::any::type_name::<T>(),
                "skipping malformed entry"
            );
            None
        }
    }
}

/// Parses a JSON string into a [`Transcript`].
///
/// This is the main entry point for reading exports written by the fetcher.
///
/// # Errors
///
/// Returns an error if the JSON is malformed or a required field (such as
/// a message author) is missing.
///
/// # Example
///
/// ```
/// use dc2html::parser::parse_transcript;
///
/// let json = r#"{ "channel": { "id": "42" }, "messages": [] }"#;
/// let transcript = parse_transcript(json).unwrap();
/// assert_eq!(transcript.channel.display_name(), "42");
/// ```
pub fn parse_transcript(json_str: &str) -> Result<Transcript, ParseError> {
    serde_json::from_str(json_str).context(JsonSnafu)
}

/// Parses a JSON array of messages as returned by the channel messages
/// endpoint.
///
/// The API returns newest first; the result is reversed so it is oldest
/// first, the order the renderer expects.
///
/// # Errors
///
/// Returns an error if the JSON is malformed or a message lacks a required
/// field.
pub fn parse_api_messages(json_str: &str) -> Result<Vec<Message>, ParseError> {
    let mut messages: Vec<Message> = serde_json::from_str(json_str).context(JsonSnafu)?;
    messages.reverse();
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_json(extra: &str) -> String {
        format!(
            r#"{{
                "id": "100",
                "author": {{ "id": "7", "username": "ferris" }},
                "content": "hi",
                "timestamp": "2024-12-05T00:00:00+00:00"
                {extra}
            }}"#
        )
    }

    fn parse_message(extra: &str) -> Message {
        serde_json::from_str(&message_json(extra)).unwrap()
    }

    fn role(id: &str, position: i64, color: u32) -> Role {
        Role {
            id: id.into(),
            name: format!("role-{id}"),
            color,
            icon: None,
            unicode_emoji: None,
            position,
        }
    }

    fn user(id: &str, discriminator: &str) -> User {
        User {
            id: id.into(),
            username: "ferris".into(),
            global_name: None,
            avatar: None,
            bot: false,
            discriminator: discriminator.into(),
            member: None,
        }
    }

    #[test]
    fn parses_minimal_message() {
        let msg = parse_message("");

        assert_eq!(msg.id, "100");
        assert_eq!(msg.author.username, "ferris");
        assert_eq!(msg.author.discriminator, "0");
        assert_eq!(msg.content, "hi");
        assert!(msg.attachments.is_empty());
        assert!(msg.embeds.is_empty());
        assert!(msg.reactions.is_empty());
        assert!(msg.member.is_none());
        assert!(!msg.is_reply());
    }

    #[test]
    fn parses_null_content_as_empty() {
        let json = r#"{
            "id": "1",
            "author": { "id": "7", "username": "ferris" },
            "content": null,
            "timestamp": "2024-12-05T00:00:00+00:00"
        }"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.content, "");
    }

    #[test]
    fn rejects_message_without_author() {
        let json = r#"{
            "channel": { "id": "1" },
            "messages": [{ "id": "1", "content": "x", "timestamp": "2024-12-05T00:00:00+00:00" }]
        }"#;
        let err = parse_transcript(json).unwrap_err();
        assert!(err.to_string().contains("author"));
    }

    #[test]
    fn parses_reply_and_null_reference() {
        let reply = parse_message(&format!(r#", "referenced_message": {}"#, message_json("")));
        assert!(reply.is_reply());
        assert_eq!(reply.referenced_message.unwrap().id, "100");

        let orphan = parse_message(r#", "referenced_message": null"#);
        assert!(!orphan.is_reply());
    }

    #[test]
    fn drops_malformed_embed_but_keeps_others() {
        let msg = parse_message(r#", "embeds": [{ "title": 5 }, { "title": "ok" }]"#);

        assert_eq!(msg.embeds.len(), 1);
        assert_eq!(msg.embeds[0].title.as_deref(), Some("ok"));
    }

    #[test]
    fn omits_unparseable_embed_sub_fields() {
        let msg = parse_message(
            r#", "embeds": [{
                "title": "t",
                "timestamp": "yesterday-ish",
                "author": { "url": "https://example.com" },
                "footer": { "text": "foot" }
            }]"#,
        );

        let embed = &msg.embeds[0];
        assert!(embed.timestamp.is_none());
        assert!(embed.author.is_none());
        assert_eq!(embed.footer.as_ref().unwrap().text, "foot");
    }

    #[test]
    fn parses_embed_timestamp_and_fields() {
        let msg = parse_message(
            r#", "embeds": [{
                "timestamp": "2024-12-05T10:30:00.000000+00:00",
                "fields": [
                    { "name": "a", "value": "1", "inline": true },
                    { "name": "b", "value": "2" }
                ]
            }]"#,
        );

        let embed = &msg.embeds[0];
        assert!(embed.timestamp.is_some());
        assert_eq!(embed.fields.len(), 2);
        assert!(embed.fields[0].inline);
        assert!(!embed.fields[1].inline);
    }

    #[test]
    fn parses_reactions_and_attachments() {
        let msg = parse_message(
            r#",
            "reactions": [
                { "count": 3, "me": true, "emoji": { "id": null, "name": "👍" } },
                { "count": 1, "me": false, "emoji": { "id": "55", "name": "party", "animated": true } }
            ],
            "attachments": [
                { "filename": "a.png", "content_type": "image/png", "size": 2048, "url": "https://x/a.png" },
                { "filename": "b.pdf", "size": 10, "url": "https://x/b.pdf" }
            ]"#,
        );

        assert_eq!(msg.reactions.len(), 2);
        assert!(msg.reactions[0].me);
        assert!(msg.reactions[0].emoji.image_url().is_none());
        assert_eq!(
            msg.reactions[1].emoji.image_url().as_deref(),
            Some("https://cdn.discordapp.com/emojis/55.gif")
        );
        assert!(msg.attachments[0].is_image());
        assert!(!msg.attachments[1].is_image());
    }

    #[test]
    fn author_display_name_prefers_nick_then_global_name() {
        let mut msg = parse_message("");
        assert_eq!(msg.author_display_name(), "ferris");

        msg.author.global_name = Some("Ferris the Crab".into());
        assert_eq!(msg.author_display_name(), "Ferris the Crab");

        msg.member = Some(GuildMember {
            nick: Some("crab".into()),
            roles: vec![],
        });
        assert_eq!(msg.author_display_name(), "crab");

        msg.member = Some(GuildMember {
            nick: Some(String::new()),
            roles: vec![],
        });
        assert_eq!(msg.author_display_name(), "Ferris the Crab");
    }

    #[test]
    fn avatar_url_uses_custom_avatar() {
        let mut u = user("80351110224678912", "0");
        u.avatar = Some("abc".into());
        assert_eq!(
            u.avatar_url(),
            "https://cdn.discordapp.com/avatars/80351110224678912/abc.png"
        );
    }

    #[test]
    fn default_avatar_for_new_usernames_uses_id_bits() {
        let u = user("80351110224678912", "0");
        let expected = (80_351_110_224_678_912_u64 >> 22) % 6;
        assert_eq!(u.default_avatar_index(), expected);
        assert_eq!(
            u.avatar_url(),
            format!("https://cdn.discordapp.com/embed/avatars/{expected}.png")
        );
    }

    #[test]
    fn default_avatar_for_legacy_users_uses_discriminator() {
        assert_eq!(user("1", "1337").default_avatar_index(), 2);
        assert_eq!(user("1", "garbage").default_avatar_index(), 0);
        assert_eq!(user("not-a-number", "0").default_avatar_index(), 0);
    }

    #[test]
    fn role_set_sorts_by_descending_position() {
        let roles = RoleSet::new(vec![role("a", 1, 0), role("b", 5, 0), role("c", 3, 0)]);
        let ids: Vec<_> = roles.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["b", "c", "a"]);
        assert_eq!(roles.get("c").unwrap().position, 3);
        assert!(roles.get("zzz").is_none());
    }

    #[test]
    fn role_style_prefers_higher_position() {
        let mut low = role("low", 1, 0x00ff00);
        low.unicode_emoji = Some("🌱".into());
        let mut high = role("high", 9, 0xff0000);
        high.icon = Some("hash".into());
        let roles = RoleSet::new(vec![low, high]);

        let style = roles.style_for(&["low".to_owned(), "high".to_owned()]);

        assert_eq!(style.color, Some(0xff0000));
        assert_eq!(
            style.icon.and_then(|icon| icon.asset_url()).as_deref(),
            Some("https://cdn.discordapp.com/role-icons/high/hash.png")
        );
    }

    #[test]
    fn role_style_skips_colorless_roles() {
        let mut top = role("top", 10, 0);
        top.unicode_emoji = Some("⭐".into());
        let roles = RoleSet::new(vec![top, role("mid", 5, 0x123456)]);

        let style = roles.style_for(&["top".to_owned(), "mid".to_owned()]);

        assert_eq!(style.color, Some(0x123456));
        assert!(matches!(
            style.icon,
            Some(RoleIcon::Unicode { glyph: "⭐", .. })
        ));
    }

    #[test]
    fn role_style_ignores_roles_not_held() {
        let roles = RoleSet::new(vec![role("a", 10, 0xabcdef)]);
        assert_eq!(roles.style_for(&["b".to_owned()]), RoleStyle::default());
    }

    #[test]
    fn parses_transcript_with_guild_and_roles() {
        let json = format!(
            r#"{{
                "channel": {{ "id": "42", "name": "general" }},
                "guild": {{ "id": "9", "name": "Rustaceans" }},
                "roles": [{{ "id": "1", "name": "mod", "color": 255, "position": 2 }}],
                "messages": [{}]
            }}"#,
            message_json("")
        );
        let transcript = parse_transcript(&json).unwrap();

        assert_eq!(transcript.guild.unwrap().name, "Rustaceans");
        assert_eq!(transcript.roles[0].color, 255);
        assert_eq!(transcript.messages.len(), 1);
    }

    #[test]
    fn parses_api_messages_oldest_first() {
        let json = format!(
            "[{}, {}]",
            message_json("").replace("\"100\"", "\"2\""),
            message_json("").replace("\"100\"", "\"1\"")
        );
        let messages = parse_api_messages(&json).unwrap();
        let ids: Vec<_> = messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["1", "2"]);
    }

    #[test]
    fn malformed_member_is_dropped() {
        let msg = parse_message(r#", "member": { "nick": 5, "roles": [] }"#);
        assert!(msg.member.is_none());
        assert_eq!(msg.author_display_name(), "ferris");
    }

    #[test]
    fn malformed_mention_member_is_dropped() {
        let msg = parse_message(
            r#", "mentions": [{ "id": "8", "username": "crab", "member": { "roles": "x" } }]"#,
        );
        assert_eq!(msg.mentions.len(), 1);
        assert!(msg.mentions[0].member.is_none());
    }

    #[test]
    fn unreadable_reply_target_is_dropped() {
        let msg = parse_message(
            r#", "referenced_message": { "id": "99", "content": "no author here" }"#,
        );
        assert!(msg.referenced_message.is_none());
        assert!(!msg.is_reply());
    }

    #[test]
    fn malformed_role_is_skipped() {
        let json = format!(
            r#"{{
                "channel": {{ "id": "1" }},
                "roles": [
                    {{ "id": "bad", "name": "Bad", "color": -1 }},
                    {{ "id": "ok", "name": "Ok", "color": 16 }}
                ],
                "messages": [{}]
            }}"#,
            message_json("")
        );
        let transcript = parse_transcript(&json).unwrap();

        assert_eq!(transcript.roles.len(), 1);
        assert_eq!(transcript.roles[0].id, "ok");
    }

    #[test]
    fn returns_error_for_invalid_json() {
        assert!(parse_transcript("not valid json").is_err());
    }
}
