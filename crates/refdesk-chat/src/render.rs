//! Mode-specific response rendering.
//!
//! Each renderer turns an opaque `BackendResponse` into the exact content
//! string committed to the log plus the rich blocks the browser displays.
//! A malformed response (missing locations, empty answer) is a
//! `ResponseRender` error: the turn fails and nothing is committed.

use crate::error::ChatError;
use crate::types::{BackendResponse, DocumentRef, Mode, RenderedReply, ReplyBlock};

/// Message shown when document search finds nothing.
const NO_MATCH_TEXT: &str =
    "No matching internal documents were found. Try rephrasing with more specific wording.";

/// Select and run the renderer bound to `mode`.
///
/// The match is exhaustive on purpose: a third mode must be wired here
/// before the crate compiles.
pub fn render_reply(mode: Mode, response: &BackendResponse) -> Result<RenderedReply, ChatError> {
    match mode {
        Mode::DocSearch => render_doc_search(response),
        Mode::Inquiry => render_inquiry(response),
    }
}

/// Render a document-location reply: where the best-matching documents live.
pub fn render_doc_search(response: &BackendResponse) -> Result<RenderedReply, ChatError> {
    validate_documents(&response.documents)?;

    if response.documents.is_empty() {
        return Ok(RenderedReply {
            content: NO_MATCH_TEXT.to_string(),
            blocks: vec![ReplyBlock::Notice {
                text: NO_MATCH_TEXT.to_string(),
            }],
        });
    }

    let primary = &response.documents[0];
    let related = &response.documents[1..];

    let mut lines = vec![
        "The document below is the closest match to your input.".to_string(),
        document_line(primary),
    ];
    let mut blocks = vec![
        ReplyBlock::Text {
            text: "The document below is the closest match to your input.".to_string(),
        },
        document_block(primary),
    ];

    if !related.is_empty() {
        lines.push("Other documents that may be related:".to_string());
        blocks.push(ReplyBlock::Text {
            text: "Other documents that may be related:".to_string(),
        });
        for doc in related {
            lines.push(format!("- {}", document_line(doc)));
            blocks.push(document_block(doc));
        }
    }

    Ok(RenderedReply {
        content: lines.join("\n"),
        blocks,
    })
}

/// Render an inquiry reply: the synthesized answer plus its sources.
pub fn render_inquiry(response: &BackendResponse) -> Result<RenderedReply, ChatError> {
    validate_documents(&response.documents)?;

    if response.answer.trim().is_empty() {
        return Err(ChatError::ResponseRender(
            "backend returned an empty answer".to_string(),
        ));
    }

    let mut lines = vec![response.answer.clone()];
    let mut blocks = vec![ReplyBlock::Text {
        text: response.answer.clone(),
    }];

    if !response.documents.is_empty() {
        lines.push("References:".to_string());
        blocks.push(ReplyBlock::Text {
            text: "References:".to_string(),
        });
        for doc in &response.documents {
            lines.push(format!("- {}", document_line(doc)));
            blocks.push(document_block(doc));
        }
    }

    Ok(RenderedReply {
        content: lines.join("\n"),
        blocks,
    })
}

// -- Private helpers --

/// A document reference without a title or path cannot be displayed.
fn validate_documents(documents: &[DocumentRef]) -> Result<(), ChatError> {
    for doc in documents {
        if doc.path.trim().is_empty() || doc.title.trim().is_empty() {
            return Err(ChatError::ResponseRender(format!(
                "document reference missing title or path: {:?}",
                doc
            )));
        }
    }
    Ok(())
}

fn document_line(doc: &DocumentRef) -> String {
    match doc.page {
        Some(page) => format!("{} ({}, page {})", doc.title, doc.path, page),
        None => format!("{} ({})", doc.title, doc.path),
    }
}

fn document_block(doc: &DocumentRef) -> ReplyBlock {
    ReplyBlock::Document {
        title: doc.title.clone(),
        path: doc.path.clone(),
        page: doc.page,
    }
}

// =============================================================================
// Tests
// =============================================================================
