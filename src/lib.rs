// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Convert Discord channel exports to static HTML transcripts.
//!
//! This crate turns the JSON a channel fetcher writes (messages plus the
//! channel, guild and role metadata needed to display them) into a single
//! self-contained HTML page that looks like the Discord client.
//!
//! # Overview
//!
//! 1. [`parser`] reads the JSON into typed Rust representations
//! 2. [`format`] converts message text (Discord markdown, mentions, emoji)
//!    into HTML fragments
//! 3. [`highlight`] colors fenced code blocks
//! 4. [`renderer`] assembles messages into the final document
//!
//! # Example
//!
//! ```no_run
//! use dc2html::{parser, renderer};
//!
//! let json = std::fs::read_to_string("transcript.json").unwrap();
//! let transcript = parser::parse_transcript(&json).unwrap();
//!
//! let opts = renderer::RenderOptions {
//!     twemoji: false,
//!     ..Default::default()
//! };
//!
//! let html = renderer::render(&transcript, &opts);
//! std::fs::write("transcript.html", html).unwrap();
//! ```
//!
//! # Modules
//!
//! - [`parser`]: JSON parsing and type definitions for channel exports
//! - [`format`]: Inline formatter for message content
//! - [`highlight`]: Syntax highlighting for code blocks
//! - [`renderer`]: HTML generation with configurable output options

#![deny(missing_docs)]

pub mod format;
pub mod highlight;
pub mod parser;
pub mod renderer;
