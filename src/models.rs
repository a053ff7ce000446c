//! Core data models shared by the extractor and the responder.
//!
//! A [`KnowledgeChunk`] is the unit of retrievable knowledge. The serialized
//! collection is a flat JSON array of chunks in insertion order.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of a chunk. Serialized as the lowercase `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    Faq,
    Term,
    Rule,
}

impl ChunkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkKind::Faq => "faq",
            ChunkKind::Term => "term",
            ChunkKind::Rule => "rule",
        }
    }

    /// Builds the chunk id for the `seq`-th chunk of this kind, e.g. `faq_007`.
    pub fn chunk_id(&self, seq: usize) -> String {
        format!("{}_{:03}", self.as_str(), seq)
    }
}

impl fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One retrievable knowledge unit.
///
/// `content` is always present and is the only field used for matching.
/// The type-specific fields are omitted from JSON when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ChunkKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    pub content: String,
}

impl KnowledgeChunk {
    pub fn faq(seq: usize, question: &str, answer: &str) -> Self {
        Self {
            id: ChunkKind::Faq.chunk_id(seq),
            kind: ChunkKind::Faq,
            question: Some(question.to_string()),
            answer: Some(answer.to_string()),
            term: None,
            definition: None,
            content: format!("问：{}\n答：{}", question, answer),
        }
    }

    pub fn term(seq: usize, term: &str, definition: &str) -> Self {
        Self {
            id: ChunkKind::Term.chunk_id(seq),
            kind: ChunkKind::Term,
            question: None,
            answer: None,
            term: Some(term.to_string()),
            definition: Some(definition.to_string()),
            content: format!("术语：{}，定义：{}", term, definition),
        }
    }

    pub fn rule(seq: usize, text: &str) -> Self {
        Self {
            id: ChunkKind::Rule.chunk_id(seq),
            kind: ChunkKind::Rule,
            question: None,
            answer: None,
            term: None,
            definition: None,
            content: text.to_string(),
        }
    }
}
