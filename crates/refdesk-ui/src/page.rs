//! Chat page HTML generation and embedding.
//!
//! The Refdesk chat page is a single self-contained HTML file with all CSS
//! and JavaScript inlined. It provides the sidebar mode selector with usage
//! examples, the conversation log, the message composer with a progress
//! spinner, and the error/fatal notice banners.
//!
//! The HTML is embedded at compile time via `include_str!` so the binary has
//! no external file dependencies at runtime.

/// The complete self-contained chat page HTML.
///
/// A single HTML file with all CSS in `<style>` tags and all JavaScript in
/// `<script>` tags. It has zero external dependencies -- no CDN links, no
/// npm packages, no build step required.
///
/// The page talks to the Refdesk API on the same origin:
///
/// - `POST /sessions` on first load (the id is kept in `sessionStorage`, so
///   it lives exactly as long as the browser session)
/// - `GET /guide` for the sidebar content
/// - `POST /chat` per submitted message, with an optimistic user echo that
///   is rolled back when the turn fails
/// - `PUT /sessions/{id}/mode` when the user switches modes
///
/// A 503 from any chat route is treated as the fatal initialization notice:
/// the page hides the chat UI entirely and shows only the notice.
pub const CHAT_HTML: &str = include_str!("../assets/chat.html");
