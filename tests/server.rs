//! End-to-end tests for the mock responses server.
//!
//! Each test writes a small knowledge file, starts `run_server` on a free
//! port and talks to it over HTTP.

use kb_harness::config::Config;
use kb_harness::ingest::render_chunks;
use kb_harness::models::KnowledgeChunk;
use kb_harness::server::run_server;
use serde_json::{json, Value};
use tempfile::TempDir;

const FALLBACK: &str =
    "【AI 助手】抱歉，我没能从知识库中找到相关信息。您可以尝试咨询：租车流程、事故处理或押金规则。";

// ─── Helpers ────────────────────────────────────────────────────────

fn sample_chunks() -> Vec<KnowledgeChunk> {
    vec![
        KnowledgeChunk::faq(0, "可以免费取消吗？", "取车前 24 小时可免费取消。"),
        KnowledgeChunk::faq(1, "押金怎么退？", "还车后 30 天内原路退还。"),
        KnowledgeChunk::term(0, "Deposit Hold", "信用卡预授权"),
        KnowledgeChunk::rule(0, "取车检查：检查车身划痕、凹陷并拍照。"),
    ]
}

fn test_config(tmp: &TempDir, port: u16, write_knowledge: bool) -> Config {
    let knowledge = tmp.path().join("knowledge_base.json");
    if write_knowledge {
        std::fs::write(&knowledge, render_chunks(&sample_chunks()).unwrap()).unwrap();
    }

    let mut cfg = Config::default();
    cfg.paths.knowledge = knowledge;
    cfg.server.bind = format!("127.0.0.1:{}", port);
    cfg
}

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

async fn start_server(write_knowledge: bool) -> (TempDir, u16, tokio::task::JoinHandle<()>) {
    let port = find_free_port();
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp, port, write_knowledge);

    let handle = tokio::spawn(async move {
        run_server(&cfg).await.ok();
    });
    wait_for_server(port).await;
    (tmp, port, handle)
}

/// Splits an event-stream body into its JSON payloads.
fn parse_event_stream(body: &str) -> Vec<Value> {
    body.split("\n\n")
        .filter(|record| !record.trim().is_empty())
        .map(|record| {
            let data = record
                .lines()
                .find_map(|line| line.strip_prefix("data: "))
                .unwrap_or_else(|| panic!("record without data line: {:?}", record));
            serde_json::from_str(data).unwrap()
        })
        .collect()
}

// ─── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_responses_endpoint_answers_from_knowledge() {
    let (_tmp, port, handle) = start_server(true).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("http://127.0.0.1:{}/v1/responses", port))
        .json(&json!({
            "model": "gpt-test",
            "input": [{"role": "user", "content": [{"type": "input_text", "text": "押金多久退"}]}]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["object"], "response");
    assert_eq!(body["status"], "completed");
    assert_eq!(body["model"], "gpt-test");
    assert!(body["id"].as_str().unwrap().starts_with("resp_"));
    assert_eq!(body["usage"]["total_tokens"], 20);
    assert_eq!(
        body["output"][0]["content"][0]["text"],
        "【AI 助手】根据知识库：\n问：押金怎么退？\n答：还车后 30 天内原路退还。"
    );

    handle.abort();
}

#[tokio::test]
async fn test_chat_completions_matches_by_substring() {
    let (_tmp, port, handle) = start_server(true).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("http://127.0.0.1:{}/v1/chat/completions", port))
        .json(&json!({"messages": [{"role": "user", "content": "deposit hold"}]}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["model"], "mock-model");
    assert_eq!(
        body["output"][0]["content"][0]["text"],
        "【AI 助手】根据知识库：\n术语：Deposit Hold，定义：信用卡预授权"
    );

    handle.abort();
}

#[tokio::test]
async fn test_unmatched_and_unrecognised_bodies_get_fallback() {
    let (_tmp, port, handle) = start_server(true).await;
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/v1/responses", port);

    let resp = client
        .post(&url)
        .json(&json!({"prompt": "今天天气怎么样"}))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["output"][0]["content"][0]["text"], FALLBACK);

    // Not JSON at all: answered as the placeholder query.
    let resp = client.post(&url).body("hello?").send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["output"][0]["content"][0]["text"], FALLBACK);

    handle.abort();
}

#[tokio::test]
async fn test_missing_knowledge_file_still_answers() {
    let (_tmp, port, handle) = start_server(false).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("http://127.0.0.1:{}/v1/responses", port))
        .json(&json!({"prompt": "你好"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["output"][0]["content"][0]["text"],
        "【Mock】我收到了您的问题：你好。\n(警告：未找到知识库文件 knowledge_base.json)"
    );

    handle.abort();
}

#[tokio::test]
async fn test_stream_emits_five_events_in_order() {
    let (_tmp, port, handle) = start_server(true).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("http://127.0.0.1:{}/v1/responses", port))
        .json(&json!({"stream": true, "input": [{"role": "user", "content": "怎么取消订单"}]}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let content_type = resp.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/event-stream"), "got {}", content_type);

    let events = parse_event_stream(&resp.text().await.unwrap());
    let types: Vec<&str> = events.iter().map(|e| e["type"].as_str().unwrap()).collect();
    assert_eq!(
        types,
        vec![
            "response.created",
            "response.output_item.added",
            "response.output_text.delta",
            "response.output_item.done",
            "response.completed",
        ]
    );

    let expected = "【AI 助手】根据知识库：\n问：可以免费取消吗？\n答：取车前 24 小时可免费取消。";
    assert_eq!(events[2]["delta"], expected);
    assert_eq!(events[3]["item"]["content"][0]["text"], expected);
    assert_eq!(events[0]["response"]["status"], "in_progress");
    assert_eq!(events[4]["response"]["status"], "completed");
    assert_eq!(events[1]["item"]["id"], events[2]["item_id"]);

    handle.abort();
}
