//! `kbh ask`: answer one query from the command line.

use anyhow::Result;

use crate::config::Config;
use crate::knowledge::KnowledgeBase;
use crate::matcher::{MatchReason, Matcher};

pub fn run_ask(config: &Config, query: &str, explain: bool) -> Result<()> {
    let knowledge = KnowledgeBase::load(&config.paths.knowledge)?;
    let matcher = Matcher::new(&config.matcher);

    if explain {
        if let KnowledgeBase::Loaded(chunks) = &knowledge {
            match matcher.find_match(query, chunks) {
                Some(m) => {
                    let reason = match &m.reason {
                        MatchReason::Keyword(hits) => format!("keyword ({})", hits.join(", ")),
                        MatchReason::Substring => "substring".to_string(),
                        MatchReason::Prefix => "prefix".to_string(),
                    };
                    println!("match: {} [{}] via {}", m.chunk.id, m.chunk.kind, reason);
                }
                None => println!("match: none"),
            }
        }
    }

    println!("{}", matcher.reply(query, &knowledge));
    Ok(())
}
