// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Integration tests for dc2html parsing and rendering.

use dc2html::{parser, renderer};
use std::fs;
use std::path::Path;

fn fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read {}: {e}", path.display()))
}

fn render_fixture(name: &str) -> String {
    let transcript = parser::parse_transcript(&fixture(name)).unwrap();
    renderer::render(&transcript, &renderer::RenderOptions::default())
}

/// Parses all JSON files in the fixtures directory and verifies they produce valid output.
#[test]
fn parses_all_fixtures() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");

    for entry in fs::read_dir(&dir).expect("Failed to read fixtures directory") {
        let entry = entry.expect("Failed to read directory entry");
        let path = entry.path();

        if path.extension().is_some_and(|ext| ext == "json") {
            let json = fs::read_to_string(&path)
                .unwrap_or_else(|e| panic!("Failed to read {}: {e}", path.display()));

            let transcript = parser::parse_transcript(&json)
                .unwrap_or_else(|e| panic!("Failed to parse {}: {e}", path.display()));

            let html = renderer::render(&transcript, &renderer::RenderOptions::default());

            assert!(
                html.starts_with("<!DOCTYPE html>"),
                "Missing doctype in {}",
                path.display()
            );
            assert_eq!(
                html.matches("id=\"msg-").count(),
                transcript.messages.len(),
                "Every message should get an anchor in {}",
                path.display()
            );
        }
    }
}

/// Tests that the fixture's malformed embed is dropped without losing the message.
#[test]
fn malformed_entries_are_skipped() {
    let transcript = parser::parse_transcript(&fixture("general.json")).unwrap();

    assert_eq!(transcript.messages.len(), 4);
    assert_eq!(transcript.messages[3].embeds.len(), 2);
}

/// Tests the document header and title.
#[test]
fn document_header_names_channel_and_guild() {
    let html = render_fixture("general.json");

    assert!(html.contains("<title>Transcript: Crab Shack - #general</title>"));
    assert!(html.contains("<h1>Start of #general</h1>"));
    assert!(html.contains("Crab Shack • 4 messages"));
}

/// Tests that member roles drive name color and role icon.
#[test]
fn member_identity_uses_highest_roles() {
    let html = render_fixture("general.json");

    assert!(
        html.contains(r#"style="color:#e74c3c" title="ferris">Crab</span>"#),
        "Highest colored role should color the nickname"
    );
    assert!(html.contains(r#"<span class="role-icon-unicode" title="Moderator">🛡️</span>"#));
    assert!(html.contains(r#"style="color:#3498db" title="nelly">nelly</span>"#));
    assert!(html.contains("https://cdn.discordapp.com/avatars/175928847299117063/a1b2c3.png"));
    assert!(
        html.contains("https://cdn.discordapp.com/embed/avatars/2.png"),
        "Legacy discriminator should pick a default avatar"
    );
}

/// Tests that a quick follow-up by the same author is chained.
#[test]
fn follow_up_is_chained() {
    let html = render_fixture("general.json");

    assert!(html.contains(r#"<div class="message-group chained" id="msg-3002">"#));
    assert!(html.contains(r#"<div class="chained-timestamp">10:01</div>"#));
    assert!(html.contains(r#"<div class="message-group" id="msg-3003">"#));
}

/// Tests content formatting of the fixture messages.
#[test]
fn content_is_formatted() {
    let html = render_fixture("general.json");

    assert!(html.contains("Welcome to <b>Crab Shack</b>!"));
    assert!(html.contains(
        r#"<a href="https://example.com/rules" target="_blank">https://example.com/rules</a>"#
    ));
    assert!(html.contains("first 👋"));
    assert!(html.contains(r#"<pre><code class="code hl-code language-rust">"#));
    assert!(html.contains(r#"<span class="mention" title="ferris">@Ferris</span>"#));
    assert!(html.contains(
        r#"<span class="mention" style="color:#e74c3c;background-color:rgba(231, 76, 60, 0.1)">@Moderator</span>"#
    ));
    assert!(html.contains(r#"<span class="mention">#Channel</span>"#));
}

/// Tests the reply header of a reply.
#[test]
fn reply_shows_preview() {
    let html = render_fixture("general.json");

    assert!(html.contains(r#"<div class="reply-bar">"#));
    assert!(html.contains(">@Ferris</div>"));
    assert!(html.contains("Welcome to **Crab Shack**! Read the rules"));
    assert!(html.contains("document.getElementById('msg-3001')"));
}

/// Tests attachments, embeds and reactions.
#[test]
fn attachments_embeds_and_reactions() {
    let html = render_fixture("general.json");

    assert!(html.contains(r#"<img src="https://cdn.discordapp.com/attachments/1/2/screenshot.png" alt="screenshot.png">"#));
    assert!(html.contains("📄 notes.txt</a> (2.00 KB)"));

    assert!(html.contains(r#"<span class="bot-tag">App</span>"#));
    assert!(html.contains("border-left-color:#5865f2"));
    assert!(html.contains(r#"<a href="https://example.com/releases" class="embed-title" target="_blank">Release notes</a>"#));
    assert!(html.contains("Version <b>1.2</b> is out"));
    assert_eq!(html.matches(r#"<div class="embed-field inline">"#).count(), 2);
    assert!(html.contains("helper bot<span class=\"embed-footer-timestamp\">• 2024/12/05 10:19</span>"));

    assert!(html.contains(r#"src="https://www.youtube.com/embed/LDU_Txk06tM""#));
    assert!(html.contains(r#"<iframe width="1280" height="720""#));

    assert!(html.contains(r#"<div class="reaction reaction-me" title="🦀">"#));
    assert!(html.contains(r#"<span class="reaction-count">2</span>"#));
}

/// Tests that the highlight theme option selects the stylesheet.
#[test]
fn highlight_theme_is_embedded() {
    let transcript = parser::parse_transcript(&fixture("general.json")).unwrap();

    let dark = renderer::render(&transcript, &renderer::RenderOptions::default());
    let light = renderer::render(
        &transcript,
        &renderer::RenderOptions {
            highlight_theme: "InspiredGitHub".to_owned(),
            ..Default::default()
        },
    );

    assert!(dark.contains(".hl-"));
    assert_ne!(dark, light, "Theme should change the embedded stylesheet");
}

/// Tests rendering a page of raw API messages.
#[test]
fn renders_api_message_page() {
    let json = r#"[
        {
            "id": "2",
            "author": { "id": "1", "username": "a" },
            "content": "second",
            "timestamp": "2024-12-05T00:01:00+00:00"
        },
        {
            "id": "1",
            "author": { "id": "1", "username": "a" },
            "content": "first",
            "timestamp": "2024-12-05T00:00:00+00:00"
        }
    ]"#;

    let messages = parser::parse_api_messages(json).unwrap();
    let channel = parser::Channel {
        id: "42".to_owned(),
        name: None,
    };
    let html = renderer::render_transcript(
        &messages,
        &channel,
        None,
        &parser::RoleSet::default(),
        &renderer::RenderOptions::default(),
    );

    let first = html.find("first").unwrap();
    let second = html.find("second").unwrap();
    assert!(first < second, "Messages should render oldest first");
    assert!(html.contains("<h1>Start of #42</h1>"));
    assert!(html.contains(r#"<div class="message-group chained" id="msg-2">"#));
}

/// Tests that a message without an author is rejected.
#[test]
fn missing_author_is_an_error() {
    let json = r#"{
        "channel": { "id": "1" },
        "messages": [{ "id": "1", "content": "x", "timestamp": "2024-12-05T00:00:00+00:00" }]
    }"#;

    assert!(parser::parse_transcript(json).is_err());
}

/// Tests that bad optional data in one message does not lose the document.
#[test]
fn malformed_optional_fields_do_not_stop_rendering() {
    let json = r#"{
        "channel": { "id": "1", "name": "general" },
        "roles": [{ "id": "9", "name": "Broken", "color": -1 }],
        "messages": [
            {
                "id": "1",
                "author": { "id": "1", "username": "a" },
                "content": "first message",
                "timestamp": "2024-12-05T00:00:00+00:00"
            },
            {
                "id": "2",
                "author": { "id": "2", "username": "b" },
                "member": { "nick": 5 },
                "referenced_message": { "id": "1", "content": "no author" },
                "content": "second message",
                "timestamp": "2024-12-05T00:01:00+00:00"
            }
        ]
    }"#;

    let transcript = parser::parse_transcript(json).unwrap();
    let html = renderer::render(&transcript, &renderer::RenderOptions::default());

    assert!(html.contains("first message"));
    assert!(html.contains("second message"));
    assert!(html.contains(r#"title="b">b</span>"#));
    assert!(!html.contains(r#"<div class="reply-bar">"#));
}
