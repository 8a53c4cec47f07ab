// Streaming tests - chunk flushing, tool-call draining, duplicate suppression
// and termination of the streamed tool loop.

#[path = "../support/mod.rs"]
mod support;

use astrolabe_core::constants::{DEPTH_EXHAUSTED_NOTICE, START_TOOL_CALLS};
use astrolabe_core::{Agent, AgentConfig, ChatOptions, DedupPolicy, StreamChunk};
use futures::StreamExt;
use serde_json::json;
use support::{ScriptedModel, agent_with, silent_agent, tagged_call};

async fn collect(agent: &Agent, prompt: &str) -> Vec<StreamChunk> {
    agent
        .chat_stream(prompt, ChatOptions::new())
        .map(|item| item.expect("stream item"))
        .collect()
        .await
}

fn joined(chunks: &[StreamChunk]) -> String {
    chunks.iter().map(StreamChunk::content_text).collect()
}

#[tokio::test]
async fn chunks_are_grouped_by_flush_threshold() {
    let model = ScriptedModel::streaming(&[&["abc", "def", "ghi", "jk"]]);
    let agent = silent_agent(&model)
        .with_config(AgentConfig::default().with_stream_flush_threshold(5));

    let chunks = collect(&agent, "letters").await;

    let contents: Vec<_> = chunks.iter().map(StreamChunk::content_text).collect();
    assert_eq!(contents, vec!["abcdef", "ghijk", ""]);
    assert!(chunks[2].is_last);
}

#[tokio::test]
async fn tagged_calls_are_cut_from_the_stream() {
    let call = tagged_call("getWeather", json!({"city": "Beijing"}));
    let pieces: Vec<&str> = call
        .as_bytes()
        .chunks(7)
        .map(|bytes| std::str::from_utf8(bytes).expect("ascii"))
        .collect();
    let model = ScriptedModel::streaming(&[pieces.as_slice(), &["Beijing is sunny."]]);
    let (agent, recorder) = agent_with(&model);
    let agent = agent.with_config(AgentConfig::default().with_stream_flush_threshold(4));

    let chunks = collect(&agent, "Weather in Beijing?").await;

    let text = joined(&chunks);
    assert!(text.starts_with("Let me look that up."));
    assert!(text.ends_with("Beijing is sunny."));
    assert!(!text.contains(START_TOOL_CALLS));

    let last = chunks.last().expect("final chunk");
    assert!(last.is_last);
    assert_eq!(
        last.function_calls[0].result,
        Some(json!({"city": "Beijing", "forecast": "sunny"}))
    );

    let kinds = recorder.kinds();
    assert_eq!(kinds.first(), Some(&"response_start"));
    assert_eq!(kinds.last(), Some(&"response_end"));
    assert!(kinds.contains(&"function_call_end"));
    assert!(kinds.contains(&"recursion_end"));
}

#[tokio::test]
async fn re_sent_paragraphs_are_suppressed() {
    let call = tagged_call("getWeather", json!({"city": "Oslo"}));
    let span = &call[call.find(START_TOOL_CALLS).expect("marker")..];
    let model = ScriptedModel::streaming(&[
        &["Paragraph A.\n\nParagraph B.", span],
        &["Paragraph A.\n\nParagraph B.\n\nParagraph C."],
    ]);
    let agent = silent_agent(&model);

    let chunks = collect(&agent, "Tell me three things").await;

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].as_str(), Some("Paragraph A.\n\nParagraph B."));
    assert_eq!(chunks[1].content_text().trim(), "Paragraph C.");
    assert!(chunks[1].is_last);
}

#[tokio::test]
async fn echo_re_chunked_at_other_offsets_is_suppressed() {
    let first = "The capital of Norway is Oslo, which sits at the head of a fjord.\n\n\
                 Today the forecast for Oslo is light rain during the morning hours.";
    let replay = format!("{first}\n\nBring an umbrella.");
    let call = tagged_call("getWeather", json!({"city": "Oslo"}));
    let span = &call[call.find(START_TOOL_CALLS).expect("marker")..];

    let pieces = |text: &str, size: usize| -> Vec<String> {
        text.as_bytes()
            .chunks(size)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .collect()
    };
    let mut level_one = pieces(first, 7);
    level_one.push(span.to_string());
    let level_two = pieces(&replay, 5);
    let level_one: Vec<&str> = level_one.iter().map(String::as_str).collect();
    let level_two: Vec<&str> = level_two.iter().map(String::as_str).collect();

    let model = ScriptedModel::streaming(&[level_one.as_slice(), level_two.as_slice()]);
    let agent = silent_agent(&model);

    let chunks = collect(&agent, "Tell me about Oslo").await;

    let text = joined(&chunks);
    assert_eq!(text, format!("{first}\n\nBring an umbrella."));
    assert_eq!(text.matches("Today the forecast").count(), 1);
    assert!(chunks.last().is_some_and(|chunk| chunk.is_last));
}

#[tokio::test]
async fn disabled_dedup_forwards_repeats() {
    let call = tagged_call("getWeather", json!({"city": "Oslo"}));
    let span = &call[call.find(START_TOOL_CALLS).expect("marker")..];
    let model = ScriptedModel::streaming(&[
        &["Paragraph A.", span],
        &["Paragraph A.\n\nParagraph B."],
    ]);
    let agent = silent_agent(&model).with_config(AgentConfig::default().with_dedup(DedupPolicy {
        enabled: false,
        ..DedupPolicy::default()
    }));

    let chunks = collect(&agent, "Repeat yourself").await;

    assert_eq!(joined(&chunks), "Paragraph A.Paragraph A.\n\nParagraph B.");
}

#[tokio::test]
async fn exhausted_depth_yields_one_final_chunk_with_notice() {
    let call = tagged_call("getWeather", json!({"city": "Oslo"}));
    let model = ScriptedModel::streaming(&[&[call.as_str()]]);
    let agent = silent_agent(&model)
        .with_config(AgentConfig::default().with_max_recursion_depth(1));

    let chunks = collect(&agent, "Loop").await;

    assert_eq!(model.prompts().await.len(), 2);
    let finals: Vec<_> = chunks.iter().filter(|chunk| chunk.is_last).collect();
    assert_eq!(finals.len(), 1);
    assert!(finals[0].content_text().starts_with(DEPTH_EXHAUSTED_NOTICE));
    assert_eq!(finals[0].function_calls.len(), 1);
}

#[tokio::test]
async fn dropping_the_stream_stops_the_request() {
    let model = ScriptedModel::streaming(&[&["First chunk long enough to flush. ", "Second."]]);
    let agent = silent_agent(&model)
        .with_config(AgentConfig::default().with_stream_flush_threshold(1));

    let mut stream = agent.chat_stream("Go", ChatOptions::new());
    let first = stream.next().await.expect("one item").expect("ok");
    drop(stream);

    assert_eq!(first.as_str(), Some("First chunk long enough to flush. "));
    assert_eq!(model.prompts().await.len(), 1);
}
