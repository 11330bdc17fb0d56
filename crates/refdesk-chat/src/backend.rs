//! Retrieval backend abstraction.
//!
//! The dispatcher treats the backend as a black box: one blocking call per
//! turn, `respond(message) -> BackendResponse`, failing with an error. No
//! retry or timeout is applied at this layer.
//!
//! `StaticBackend` is the built-in implementation: deterministic keyword
//! retrieval over a small in-memory corpus of internal-document entries.
//! It doubles as the test backend. `FailingBackend` always errors and exists
//! for exercising the failure path.

use serde::{Deserialize, Serialize};

use crate::types::{BackendResponse, DocumentRef};

/// Error signaled by a backend call.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct BackendError(pub String);

/// A blocking retrieval/LLM backend.
pub trait ResponseBackend: Send + Sync {
    fn respond(&self, message: &str) -> Result<BackendResponse, BackendError>;
}

// =============================================================================
// StaticBackend
// =============================================================================

/// One entry in the static knowledge corpus.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KnowledgeDoc {
    /// Document title.
    pub title: String,
    /// Repository-relative location.
    pub path: String,
    /// Page number, for paginated formats.
    pub page: Option<u32>,
    /// One-sentence summary used as answer material.
    pub summary: String,
    /// Phrases that mark a message as relevant to this document. Matched by
    /// case-insensitive containment so CJK text works without tokenization.
    pub keywords: Vec<String>,
}

/// Deterministic keyword-retrieval backend over an in-memory corpus.
pub struct StaticBackend {
    corpus: Vec<KnowledgeDoc>,
    /// Maximum number of retrieved documents per query.
    max_results: usize,
    /// Minimum keyword-overlap score for a document to count as a hit.
    min_score: f32,
}

impl StaticBackend {
    /// Create a backend over the built-in corpus.
    pub fn new(max_results: usize, min_score: f32) -> Self {
        Self::with_corpus(builtin_corpus(), max_results, min_score)
    }

    /// Create a backend over a caller-supplied corpus.
    pub fn with_corpus(corpus: Vec<KnowledgeDoc>, max_results: usize, min_score: f32) -> Self {
        Self {
            corpus,
            max_results,
            min_score,
        }
    }

    pub fn corpus_len(&self) -> usize {
        self.corpus.len()
    }

    /// Fraction of a document's keywords contained in the message.
    fn score(doc: &KnowledgeDoc, message_lower: &str) -> f32 {
        if doc.keywords.is_empty() {
            return 0.0;
        }
        let hits = doc
            .keywords
            .iter()
            .filter(|k| message_lower.contains(&k.to_lowercase()))
            .count();
        hits as f32 / doc.keywords.len() as f32
    }
}

impl ResponseBackend for StaticBackend {
    fn respond(&self, message: &str) -> Result<BackendResponse, BackendError> {
        if self.corpus.is_empty() {
            return Err(BackendError("knowledge corpus is empty".to_string()));
        }

        let message_lower = message.to_lowercase();

        let mut scored: Vec<(f32, &KnowledgeDoc)> = self
            .corpus
            .iter()
            .map(|doc| (Self::score(doc, &message_lower), doc))
            .filter(|(score, _)| *score >= self.min_score)
            .collect();

        // Stable order: score descending, then title, for determinism.
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.title.cmp(&b.1.title))
        });
        scored.truncate(self.max_results);

        let documents: Vec<DocumentRef> = scored
            .iter()
            .map(|(score, doc)| DocumentRef {
                title: doc.title.clone(),
                path: doc.path.clone(),
                page: doc.page,
                score: *score,
            })
            .collect();

        let answer = match scored.first() {
            Some((_, top)) => top.summary.clone(),
            None => "No internal document matched the request.".to_string(),
        };

        Ok(BackendResponse { answer, documents })
    }
}

/// The built-in internal-document corpus.
fn builtin_corpus() -> Vec<KnowledgeDoc> {
    vec![
        KnowledgeDoc {
            title: "Employee development policy meeting minutes".to_string(),
            path: "docs/meetings/development_policy_mtg_minutes.md".to_string(),
            page: None,
            summary: "Minutes of the monthly meeting on the employee development \
                      and training policy, including agreed mentoring targets."
                .to_string(),
            keywords: vec![
                "育成方針".to_string(),
                "議事録".to_string(),
                "mtg".to_string(),
                "development policy".to_string(),
                "meeting minutes".to_string(),
                "training".to_string(),
            ],
        },
        KnowledgeDoc {
            title: "Employee roster".to_string(),
            path: "docs/hr/employee_roster.csv".to_string(),
            page: None,
            summary: "The company-wide employee roster with department, role, \
                      and contact columns."
                .to_string(),
            keywords: vec![
                "従業員".to_string(),
                "人事部".to_string(),
                "一覧".to_string(),
                "employee".to_string(),
                "roster".to_string(),
                "hr".to_string(),
            ],
        },
        KnowledgeDoc {
            title: "Expense reimbursement rules".to_string(),
            path: "docs/finance/expense_rules.pdf".to_string(),
            page: Some(3),
            summary: "Rules and monthly limits for expense reimbursement, \
                      including travel and equipment purchases."
                .to_string(),
            keywords: vec![
                "経費".to_string(),
                "精算".to_string(),
                "expense".to_string(),
                "reimbursement".to_string(),
                "travel".to_string(),
            ],
        },
        KnowledgeDoc {
            title: "Remote work guidelines".to_string(),
            path: "docs/hr/remote_work_guidelines.md".to_string(),
            page: None,
            summary: "Eligibility, core hours, and security requirements for \
                      working remotely."
                .to_string(),
            keywords: vec![
                "リモート".to_string(),
                "在宅勤務".to_string(),
                "remote".to_string(),
                "work from home".to_string(),
                "core hours".to_string(),
            ],
        },
        KnowledgeDoc {
            title: "Security incident response handbook".to_string(),
            path: "docs/security/incident_response.pdf".to_string(),
            page: Some(1),
            summary: "Who to contact and what to record when a security \
                      incident is suspected."
                .to_string(),
            keywords: vec![
                "セキュリティ".to_string(),
                "インシデント".to_string(),
                "security".to_string(),
                "incident".to_string(),
                "breach".to_string(),
            ],
        },
        KnowledgeDoc {
            title: "Onboarding checklist".to_string(),
            path: "docs/hr/onboarding_checklist.md".to_string(),
            page: None,
            summary: "Accounts, equipment, and first-week sessions for new \
                      hires."
                .to_string(),
            keywords: vec![
                "入社".to_string(),
                "オンボーディング".to_string(),
                "onboarding".to_string(),
                "new hire".to_string(),
                "checklist".to_string(),
            ],
        },
    ]
}

// =============================================================================
// FailingBackend
// =============================================================================

/// A backend that always fails. Used to exercise the containment path.
pub struct FailingBackend {
    pub message: String,
}

impl Default for FailingBackend {
    fn default() -> Self {
        Self {
            message: "backend connection refused".to_string(),
        }
    }
}

impl ResponseBackend for FailingBackend {
    fn respond(&self, _message: &str) -> Result<BackendResponse, BackendError> {
        Err(BackendError(self.message.clone()))
    }
}

// =============================================================================
// Tests
// =============================================================================
