//! TOML configuration.
//!
//! Every setting has a default that reproduces the stock rental-service
//! knowledge base, so `kbh ingest` and `kbh serve` run without a config
//! file. A file at the `--config` path overrides individual fields.
//!
//! ```toml
//! [paths]
//! document = "./data/knowledge.txt"
//! knowledge = "./data/knowledge_base.json"
//!
//! [matcher]
//! keywords = ["押金", "退款"]
//!
//! [server]
//! bind = "127.0.0.1:8000"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub matcher: MatcherConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    /// Raw knowledge-base text document read by `kbh ingest`.
    #[serde(default = "default_document")]
    pub document: PathBuf,
    /// JSON chunk collection written by the extractor and read by the responder.
    #[serde(default = "default_knowledge")]
    pub knowledge: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            document: default_document(),
            knowledge: default_knowledge(),
        }
    }
}

fn default_document() -> PathBuf {
    PathBuf::from("./data/knowledge.txt")
}
fn default_knowledge() -> PathBuf {
    PathBuf::from("./data/knowledge_base.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractConfig {
    /// Heading text that opens the glossary section.
    #[serde(default = "default_glossary_heading")]
    pub glossary_heading: String,
    /// Text ending the glossary's column-header line. Term rows start on the
    /// line after it.
    #[serde(default = "default_glossary_header_end")]
    pub glossary_header_end: String,
    /// Rule chunks appended after FAQs and terms, in order. These are not
    /// read from the document.
    #[serde(default = "default_rules")]
    pub rules: Vec<String>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            glossary_heading: default_glossary_heading(),
            glossary_header_end: default_glossary_header_end(),
            rules: default_rules(),
        }
    }
}

fn default_glossary_heading() -> String {
    "8) 业务术语词汇表".to_string()
}
fn default_glossary_header_end() -> String {
    "意义".to_string()
}
fn default_rules() -> Vec<String> {
    vec![
        "事故/故障处理流程：涉及第三方事故应报警留证，联系租车公司，留存事故报告与警局签字凭证。"
            .to_string(),
        "费用构成：基础租金、异地还车费、超时费、附加驾驶员费、燃油差价费、门店非营业时间服务费、送取车服务费。"
            .to_string(),
        "取车检查：检查车身划痕、凹陷并拍照，确认油量、里程，签署租赁合同。".to_string(),
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct MatcherConfig {
    /// Domain keywords, checked in order against both query and chunk.
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
    /// Label placed in front of a matched chunk's content.
    #[serde(default = "default_reply_prefix")]
    pub reply_prefix: String,
    /// Reply used when no chunk matches.
    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: String,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            keywords: default_keywords(),
            reply_prefix: default_reply_prefix(),
            fallback_reply: default_fallback_reply(),
        }
    }
}

fn default_keywords() -> Vec<String> {
    [
        "取消", "退款", "预订", "流程", "押金", "还车", "事故", "保险", "故障", "怎么办", "异地",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_reply_prefix() -> String {
    "【AI 助手】根据知识库：\n".to_string()
}
fn default_fallback_reply() -> String {
    "【AI 助手】抱歉，我没能从知识库中找到相关信息。您可以尝试咨询：租车流程、事故处理或押金规则。"
        .to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Model name echoed back when the request does not carry one.
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Re-read the knowledge file on every request instead of serving the
    /// snapshot taken at startup.
    #[serde(default)]
    pub reload_per_request: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            default_model: default_model(),
            reload_per_request: false,
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}
fn default_model() -> String {
    "mock-model".to_string()
}

/// Loads and validates a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Like [`load_config`], but a missing file yields the defaults.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::default())
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.matcher.keywords.iter().any(|k| k.trim().is_empty()) {
        bail!("matcher.keywords must not contain empty entries");
    }

    if config.extract.rules.iter().any(|r| r.trim().is_empty()) {
        bail!("extract.rules must not contain empty entries");
    }

    if config.extract.glossary_heading.trim().is_empty() {
        bail!("extract.glossary_heading must not be empty");
    }

    if config.server.bind.trim().is_empty() {
        bail!("server.bind must not be empty");
    }

    Ok(())
}
