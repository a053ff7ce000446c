//! Knowledge-base extraction.
//!
//! Turns the raw knowledge-base text document into a flat list of
//! [`KnowledgeChunk`]s and writes it as a JSON array:
//!
//! 1. FAQ blocks: a `“question”` line followed by a `回答：` answer.
//! 2. Glossary rows: tab-separated `term\tdefinition` lines inside the
//!    configured glossary section.
//! 3. Rules: the configured rule strings, appended verbatim.
//!
//! Malformed glossary rows are skipped. The number skipped is reported in
//! [`Extraction::skipped_lines`] and logged, but never fails the run.

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::LazyLock;

use crate::config::{Config, ExtractConfig};
use crate::models::{ChunkKind, KnowledgeChunk};

/// Opening quote, question, closing quote and the answer marker.
static FAQ_OPENER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)“(.+?)”\n回答：").expect("valid FAQ opener regex"));
/// Where an answer stops: a blank line or the next quoted question.
static FAQ_TERMINATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\n|\n“").expect("valid FAQ terminator regex"));
/// Where the glossary body stops: a blank line or the next numbered heading.
static GLOSSARY_TERMINATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\n|\n\d").expect("valid glossary terminator regex"));

/// Result of parsing one document.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// FAQs first, then terms, then rules.
    pub chunks: Vec<KnowledgeChunk>,
    /// Glossary lines dropped for having fewer than two tab-separated fields.
    pub skipped_lines: usize,
}

impl Extraction {
    pub fn count(&self, kind: ChunkKind) -> usize {
        self.chunks.iter().filter(|c| c.kind == kind).count()
    }
}

/// Parses a knowledge-base document into chunks.
pub fn parse_document(text: &str, config: &ExtractConfig) -> Result<Extraction> {
    let mut chunks = Vec::new();

    for (seq, (question, answer)) in extract_faqs(text).into_iter().enumerate() {
        chunks.push(KnowledgeChunk::faq(seq, &question, &answer));
    }

    let mut skipped_lines = 0;
    if let Some(body) = glossary_body(text, config)? {
        let mut seq = 0;
        for line in body.split('\n') {
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 2 {
                skipped_lines += 1;
                continue;
            }
            chunks.push(KnowledgeChunk::term(seq, fields[0].trim(), fields[1].trim()));
            seq += 1;
        }
    }

    for (seq, rule) in config.rules.iter().enumerate() {
        chunks.push(KnowledgeChunk::rule(seq, rule));
    }

    Ok(Extraction {
        chunks,
        skipped_lines,
    })
}

/// Finds every question/answer pair, in document order.
///
/// An answer is at least one character long and ends at the first blank
/// line, the next line opening with `“`, or the end of the text (a single
/// trailing newline excluded). Scanning resumes after the answer.
fn extract_faqs(text: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut pos = 0;

    while let Some(caps) = FAQ_OPENER.captures_at(text, pos) {
        let (Some(whole), Some(question)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        let answer_start = whole.end();
        let Some(first) = text[answer_start..].chars().next() else {
            break;
        };
        let min_end = answer_start + first.len_utf8();

        let text_end = if text.ends_with('\n') && text.len() - 1 >= min_end {
            text.len() - 1
        } else {
            text.len()
        };
        let answer_end = FAQ_TERMINATOR
            .find_at(text, min_end)
            .map(|m| m.start())
            .unwrap_or(text_end)
            .min(text_end);

        pairs.push((
            question.as_str().trim().to_string(),
            text[answer_start..answer_end].trim().to_string(),
        ));
        pos = answer_end;
    }

    pairs
}

/// Returns the trimmed glossary rows, or `None` if the section is absent
/// or empty.
fn glossary_body<'a>(text: &'a str, config: &ExtractConfig) -> Result<Option<&'a str>> {
    let heading = Regex::new(&format!(
        "(?s){}.*?{}\n",
        regex::escape(&config.glossary_heading),
        regex::escape(&config.glossary_header_end)
    ))?;

    let Some(m) = heading.find(text) else {
        return Ok(None);
    };
    let rest = &text[m.end()..];

    let end = GLOSSARY_TERMINATOR
        .find(rest)
        .map(|t| t.start())
        .unwrap_or(rest.len())
        .min(rest.trim_end().len());

    let body = rest[..end].trim();
    Ok((!body.is_empty()).then_some(body))
}

/// Serializes chunks as a pretty-printed JSON array (4-space indent,
/// non-ASCII kept literal).
pub fn render_chunks(chunks: &[KnowledgeChunk]) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    chunks.serialize(&mut ser)?;

    let mut out = String::from_utf8(buf)?;
    out.push('\n');
    Ok(out)
}

/// Summary of a completed extraction run.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub output: PathBuf,
    pub total: usize,
    pub faqs: usize,
    pub terms: usize,
    pub rules: usize,
    pub skipped_lines: usize,
}

#[derive(Debug, Clone)]
pub enum IngestOutcome {
    Written(IngestReport),
    /// The source document does not exist. Nothing was written.
    SourceMissing(PathBuf),
}

/// Reads the configured document and writes the chunk collection.
pub fn ingest_document(config: &Config) -> Result<IngestOutcome> {
    let source = &config.paths.document;
    if !source.exists() {
        tracing::warn!(path = %source.display(), "source document not found");
        return Ok(IngestOutcome::SourceMissing(source.clone()));
    }

    let text = std::fs::read_to_string(source)
        .with_context(|| format!("Failed to read source document: {}", source.display()))?;
    let extraction = parse_document(&text, &config.extract)?;

    let report = IngestReport {
        output: config.paths.knowledge.clone(),
        total: extraction.chunks.len(),
        faqs: extraction.count(ChunkKind::Faq),
        terms: extraction.count(ChunkKind::Term),
        rules: extraction.count(ChunkKind::Rule),
        skipped_lines: extraction.skipped_lines,
    };
    tracing::info!(
        faq = report.faqs,
        terms = report.terms,
        rules = report.rules,
        skipped_lines = report.skipped_lines,
        "extracted knowledge chunks"
    );

    let output = &config.paths.knowledge;
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, render_chunks(&extraction.chunks)?)
        .with_context(|| format!("Failed to write knowledge file: {}", output.display()))?;

    Ok(IngestOutcome::Written(report))
}

/// `kbh ingest`: extract and print a summary.
pub fn run_ingest(config: &Config) -> Result<()> {
    match ingest_document(config)? {
        IngestOutcome::Written(report) => {
            println!(
                "Knowledge base extracted: {} chunks written to {}",
                report.total,
                report.output.display()
            );
            println!("  faq: {}", report.faqs);
            println!("  term: {}", report.terms);
            println!("  rule: {}", report.rules);
            println!("  skipped glossary lines: {}", report.skipped_lines);
        }
        IngestOutcome::SourceMissing(path) => {
            println!("Source document not found: {}", path.display());
        }
    }
    Ok(())
}
