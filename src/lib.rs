//! # KB Harness
//!
//! Turns a semi-structured knowledge-base document into JSON chunks and
//! answers chat-style queries against them through a mock responses API.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────┐   ┌─────────────────────┐
//! │ knowledge.txt│──▶│  ingest   │──▶│ knowledge_base.json │
//! └──────────────┘   └───────────┘   └──────────┬──────────┘
//!                                               │ snapshot
//!                          ┌────────────────────┤
//!                          ▼                    ▼
//!                     ┌──────────┐        ┌──────────┐
//!                     │ kbh ask  │        │  HTTP    │
//!                     │          │        │ /v1/...  │
//!                     └──────────┘        └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration |
//! | [`models`] | Chunk types |
//! | [`ingest`] | Document → chunk extraction |
//! | [`knowledge`] | Knowledge file snapshot |
//! | [`matcher`] | Keyword / containment matching |
//! | [`responses`] | Request parsing and response schema |
//! | [`server`] | Mock responses HTTP server |

pub mod ask;
pub mod config;
pub mod ingest;
pub mod knowledge;
pub mod matcher;
pub mod models;
pub mod responses;
pub mod server;
