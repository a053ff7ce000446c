//! Keyword matcher.
//!
//! Picks at most one chunk for a query in a single pass. There is no
//! scoring: the first chunk in collection order that qualifies wins. Each
//! chunk is tested, in order:
//!
//! 1. **Keyword**: at least one configured keyword occurs in both the
//!    case-folded query and the case-folded content.
//! 2. **Containment**: the content contains the whole query or, for queries
//!    longer than three characters, the query's first three characters.

use crate::config::MatcherConfig;
use crate::knowledge::KnowledgeBase;
use crate::models::KnowledgeChunk;

const PREFIX_CHARS: usize = 3;

const ECHO_PREFIX: &str = "【Mock】我收到了您的问题：";
const ECHO_SUFFIX: &str = "。";
const MISSING_FILE_WARNING: &str = "\n(警告：未找到知识库文件 knowledge_base.json)";

/// Why a chunk was selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchReason {
    /// Keywords shared by query and content, in keyword-list order.
    Keyword(Vec<String>),
    /// The whole query occurs in the content.
    Substring,
    /// The query's first three characters occur in the content.
    Prefix,
}

#[derive(Debug, Clone)]
pub struct ChunkMatch<'a> {
    pub chunk: &'a KnowledgeChunk,
    pub reason: MatchReason,
}

pub struct Matcher {
    keywords: Vec<String>,
    reply_prefix: String,
    fallback_reply: String,
}

impl Matcher {
    pub fn new(config: &MatcherConfig) -> Self {
        Self {
            keywords: config.keywords.iter().map(|k| k.to_lowercase()).collect(),
            reply_prefix: config.reply_prefix.clone(),
            fallback_reply: config.fallback_reply.clone(),
        }
    }

    pub fn find_match<'a>(
        &self,
        query: &str,
        chunks: &'a [KnowledgeChunk],
    ) -> Option<ChunkMatch<'a>> {
        let query = query.to_lowercase();
        let prefix: Option<String> = (query.chars().count() > PREFIX_CHARS)
            .then(|| query.chars().take(PREFIX_CHARS).collect());

        for chunk in chunks {
            let content = chunk.content.to_lowercase();
            let hits: Vec<String> = self
                .keywords
                .iter()
                .filter(|kw| query.contains(kw.as_str()) && content.contains(kw.as_str()))
                .cloned()
                .collect();

            let reason = if !hits.is_empty() {
                MatchReason::Keyword(hits)
            } else if content.contains(&query) {
                MatchReason::Substring
            } else if prefix.as_deref().is_some_and(|p| content.contains(p)) {
                MatchReason::Prefix
            } else {
                continue;
            };
            return Some(ChunkMatch { chunk, reason });
        }

        None
    }

    /// Builds the reply text for `query`.
    ///
    /// A missing knowledge file echoes the query with a warning instead of
    /// failing.
    pub fn reply(&self, query: &str, knowledge: &KnowledgeBase) -> String {
        let chunks = match knowledge {
            KnowledgeBase::Loaded(chunks) => chunks,
            KnowledgeBase::Missing(_) => {
                return format!("{ECHO_PREFIX}{query}{ECHO_SUFFIX}{MISSING_FILE_WARNING}");
            }
        };

        match self.find_match(query, chunks) {
            Some(m) => {
                tracing::debug!(chunk = %m.chunk.id, reason = ?m.reason, "matched chunk");
                format!("{}{}", self.reply_prefix, m.chunk.content)
            }
            None => self.fallback_reply.clone(),
        }
    }
}
