//! Streaming variant of the tool loop.
//!
//! Text is forwarded as it arrives, except for tagged tool-call spans, which
//! are cut out of the rolling buffer and collected. When a level's upstream
//! finishes, the collected calls run and the next level streams a fresh
//! upstream. Anything a later level repeats is filtered through the request's
//! [`SentHistory`].

use super::dedup::SentHistory;
use super::errors::AgentError;
use super::events::AgentEvent;
use super::models::{AdditionalInfo, ChatResponse, StreamChunk};
use super::recursion::{RecursionTrail, exhausted_content, final_response};
use super::runner::Agent;
use super::runtime::instructions::{adapt_request, build_follow_up_prompt};
use super::runtime::parser::{
    calls_from_span_body, find_span, has_complete_function_call_tags, parse_function_calls,
    remove_tagged_function_calls,
};
use super::runtime::repair::repair_json;
use crate::constants::START_TOOL_CALLS;
use crate::domain::types::FunctionCall;
use crate::model::ChatOptions;
use futures::StreamExt;
use futures::stream::{BoxStream, Stream};
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::{Span, debug, info, info_span, warn};
use uuid::Uuid;

impl Agent {
    /// Stream the answer to `prompt` chunk by chunk. The last item carries
    /// `is_last = true`; dropping the stream cancels the request.
    pub fn chat_stream<'a>(
        &'a self,
        prompt: &'a str,
        options: ChatOptions,
    ) -> BoxStream<'a, Result<StreamChunk, AgentError>> {
        let request_id = Uuid::new_v4();
        let span = info_span!("agent_stream", %request_id);

        let stream = async_stream::try_stream! {
            self.validate(prompt, &options)?;
            info!(model = options.model_name(), "Agent stream started");
            self.events.emit(AgentEvent::ResponseStart {
                prompt: prompt.to_string(),
                options: options.clone(),
            });

            let tools = self.runtime.tool_catalogue(&options.tools).await;
            let additional_info = AdditionalInfo {
                user_prompt: prompt.to_string(),
                system_message: options.system_message.clone(),
            };
            let model = options.model_name().to_string();
            let max_depth = self.config.max_recursion_depth;
            let threshold = self.config.stream_flush_threshold;
            let wants_json = options.wants_json();
            let mut history = SentHistory::new(self.config.dedup);
            let mut trail = RecursionTrail::default();
            let mut next_prompt = prompt.to_string();
            let mut depth = 0;

            loop {
                history.begin_level();
                let exhausted = depth >= max_depth;
                // JSON answers and the last allowed level are delivered whole.
                let hold_back = exhausted || wants_json;

                let request = adapt_request(self.model.as_ref(), &next_prompt, &options, &tools);
                let mut upstream = self
                    .model
                    .unified_chat_stream(&request.prompt, &request.options)
                    .await
                    .map_err(|err| self.model_failure(&request.prompt, &request.options, err))?;

                let mut buffer = LevelBuffer::default();
                while let Some(item) = upstream.next().await {
                    let chunk = item
                        .map_err(|err| self.model_failure(&request.prompt, &request.options, err))?;
                    buffer.push(&chunk.content);
                    if !hold_back {
                        if let Some(ready) = buffer.take_ready(threshold) {
                            if let Some(text) = history.admit(&ready) {
                                yield self.publish(ChatResponse::text(
                                    text,
                                    model.as_str(),
                                    additional_info.clone(),
                                ));
                            }
                        }
                    }
                    if chunk.is_last {
                        break;
                    }
                }
                drop(upstream);

                let accumulated = buffer.accumulated().to_string();
                let cleaned = remove_tagged_function_calls(&accumulated);

                if exhausted {
                    let with_notice = depth > 0 || has_complete_function_call_tags(&accumulated);
                    if with_notice {
                        warn!(depth, max_depth, "Maximum recursion depth reached");
                    }
                    let text = if wants_json && repair_json(&cleaned).is_some() {
                        cleaned
                    } else {
                        let novel = history.admit(&cleaned).unwrap_or_default();
                        exhausted_content(&novel, with_notice)
                    };
                    yield self.finish_stream(
                        text,
                        wants_json,
                        model.clone(),
                        &trail,
                        additional_info.clone(),
                    );
                    break;
                }

                let calls = trail.fresh(buffer.take_calls(&accumulated));
                let tail = buffer.take_rest();

                if calls.is_empty() {
                    debug!(depth, "Upstream finished without requesting tools");
                    let text = if wants_json {
                        cleaned
                    } else {
                        history.admit(&tail).unwrap_or_default()
                    };
                    yield self.finish_stream(
                        text,
                        wants_json,
                        model.clone(),
                        &trail,
                        additional_info.clone(),
                    );
                    break;
                }

                if !hold_back {
                    if let Some(text) = history.admit(&tail).filter(|text| !text.is_empty()) {
                        yield self.publish(ChatResponse::text(
                            text,
                            model.as_str(),
                            additional_info.clone(),
                        ));
                    }
                }

                info!(depth, count = calls.len(), "Stream requested tool calls");
                let executed = self.runtime.execute_calls(calls, &self.events).await;
                depth += 1;
                self.events.emit(AgentEvent::RecursionStart {
                    initial_content: cleaned.clone(),
                    function_calls: executed.clone(),
                    depth,
                });
                next_prompt = build_follow_up_prompt(prompt, &cleaned, &executed);
                trail.record(depth, &executed);
            }

            info!("Agent stream finished");
        };

        let inner: BoxStream<'a, Result<StreamChunk, AgentError>> = Box::pin(stream);
        Box::pin(InSpan { inner, span })
    }

    fn publish(&self, chunk: StreamChunk) -> StreamChunk {
        self.events.emit(AgentEvent::ResponseChunk {
            chunk: chunk.clone(),
        });
        chunk
    }

    /// Final chunk of the stream. `response_end` is emitted before the chunk
    /// is handed out, since consumers may stop polling once they see it.
    fn finish_stream(
        &self,
        text: String,
        wants_json: bool,
        model: String,
        trail: &RecursionTrail,
        additional_info: AdditionalInfo,
    ) -> StreamChunk {
        trail.unwind(&text, &self.events);
        let chunk = self.publish(final_response(
            text,
            wants_json,
            model,
            trail.completed().to_vec(),
            additional_info,
        ));
        self.events.emit(AgentEvent::ResponseEnd {
            response: chunk.clone(),
        });
        chunk
    }
}

/// Polls the wrapped stream inside `span`, so everything logged while an item
/// is produced carries the request id.
struct InSpan<S> {
    inner: S,
    span: Span,
}

impl<S: Stream + Unpin> Stream for InSpan<S> {
    type Item = S::Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        let _entered = this.span.enter();
        Pin::new(&mut this.inner).poll_next(cx)
    }
}

/// Rolling buffer for one recursion level.
#[derive(Debug, Default)]
struct LevelBuffer {
    /// Everything the upstream produced on this level.
    accumulated: String,
    /// Text not yet emitted, with complete tagged spans removed.
    pending: String,
    drained: Vec<FunctionCall>,
}

impl LevelBuffer {
    fn push(&mut self, text: &str) {
        self.accumulated.push_str(text);
        self.pending.push_str(text);
        while let Some(span) = find_span(&self.pending, 0) {
            let calls = calls_from_span_body(&self.pending[span.body.clone()]);
            debug!(
                count = calls.len(),
                "Drained tagged span from stream buffer"
            );
            self.drained.extend(calls);
            self.pending.replace_range(span.outer, "");
        }
    }

    fn accumulated(&self) -> &str {
        &self.accumulated
    }

    /// Bytes of `pending` that cannot belong to a tool-call span.
    fn flushable_len(&self) -> usize {
        if let Some(start) = self.pending.find(START_TOOL_CALLS) {
            return start;
        }
        let partial = (1..START_TOOL_CALLS.len())
            .rev()
            .find(|&len| self.pending.ends_with(&START_TOOL_CALLS[..len]))
            .unwrap_or(0);
        self.pending.len() - partial
    }

    /// Take the flushable prefix once it reaches `threshold` bytes. The cut
    /// always falls on a char boundary.
    fn take_ready(&mut self, threshold: usize) -> Option<String> {
        let ready = self.flushable_len();
        if ready == 0 || ready < threshold {
            return None;
        }
        let rest = self.pending.split_off(ready);
        Some(std::mem::replace(&mut self.pending, rest))
    }

    /// Everything still pending once the upstream is done. An unterminated
    /// tool-call span is discarded.
    fn take_rest(&mut self) -> String {
        if let Some(start) = self.pending.find(START_TOOL_CALLS) {
            warn!(
                discarded = self.pending.len() - start,
                "Stream ended inside an unterminated tool-call span"
            );
            self.pending.truncate(start);
        }
        std::mem::take(&mut self.pending)
    }

    /// Calls drained from tagged spans, or whatever the fallback encodings
    /// yield for the whole level when no span was seen.
    fn take_calls(&mut self, accumulated: &str) -> Vec<FunctionCall> {
        if self.drained.is_empty() {
            parse_function_calls(accumulated)
        } else {
            std::mem::take(&mut self.drained)
        }
    }
}
