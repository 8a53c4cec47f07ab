//! Suppression of text a stream has already shown.
//!
//! Models asked to continue after tool results often repeat what they said
//! on the previous level, usually cut into chunks at different offsets. All
//! checks therefore run against the transcript of everything emitted so far
//! for the request, never against single fragments:
//!
//! 1. while a follow-up level is still repeating the transcript, nothing is
//!    emitted; once it diverges, emission resumes at the start of the
//!    paragraph where the divergence happened,
//! 2. a fragment already contained in the transcript is dropped,
//! 3. paragraphs (blank-line separated) already in the transcript are
//!    removed, and the fragment is dropped when nothing new is left.
//!
//! This is a heuristic. Text shorter than `min_paragraph_chars` is never
//! treated as a repeat by rules 2 and 3 so that short legitimate repetitions
//! survive.

use crate::config::DedupPolicy;
use tracing::debug;

const PARAGRAPH_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone)]
pub(crate) struct SentHistory {
    policy: DedupPolicy,
    /// Everything emitted so far, in order.
    transcript: String,
    /// Text of the current level while it repeats the transcript, give or
    /// take trailing whitespace.
    echo: Option<String>,
}

impl SentHistory {
    pub(crate) fn new(policy: DedupPolicy) -> Self {
        Self {
            policy,
            transcript: String::new(),
            echo: None,
        }
    }

    /// Start a new recursion level. A level that follows emitted text is
    /// watched for a replay of that text.
    pub(crate) fn begin_level(&mut self) {
        self.echo = (self.policy.enabled && !self.transcript.trim().is_empty())
            .then(String::new);
    }

    /// The part of `fragment` that should be emitted, or `None` when all of
    /// it was already shown. Whatever is returned is remembered.
    pub(crate) fn admit(&mut self, fragment: &str) -> Option<String> {
        if !self.policy.enabled {
            return Some(fragment.to_string());
        }

        let admitted = match self.echo.take() {
            Some(mut level) => {
                level.push_str(fragment);
                let echoed = self.echoed_len(&level);
                if level[echoed..].trim().is_empty() {
                    self.echo = Some(level);
                    None
                } else {
                    debug!(echoed, "Follow-up level diverged from emitted text");
                    self.without_sent_paragraphs(&level[paragraph_start(&level, echoed)..])
                }
            }
            None => self.novel_part(fragment),
        };

        match &admitted {
            Some(text) => self.transcript.push_str(text),
            None => debug!(
                length = fragment.len(),
                "Suppressed duplicate stream fragment"
            ),
        }
        admitted
    }

    fn novel_part(&self, fragment: &str) -> Option<String> {
        let candidate = fragment.trim();
        if candidate.is_empty() {
            return Some(fragment.to_string());
        }
        if self.is_significant(candidate) && self.transcript.contains(candidate) {
            return None;
        }
        self.without_sent_paragraphs(fragment)
    }

    fn without_sent_paragraphs(&self, text: &str) -> Option<String> {
        let paragraphs: Vec<&str> = text
            .split(PARAGRAPH_SEPARATOR)
            .map(str::trim)
            .filter(|paragraph| !paragraph.is_empty())
            .collect();
        let kept: Vec<&str> = paragraphs
            .iter()
            .copied()
            .filter(|paragraph| !self.already_sent(paragraph))
            .collect();

        if kept.len() == paragraphs.len() {
            return Some(text.to_string());
        }
        if kept.is_empty() {
            return None;
        }
        let body = kept.join(PARAGRAPH_SEPARATOR);
        if kept.first() == paragraphs.first() {
            Some(body)
        } else {
            Some(format!("{PARAGRAPH_SEPARATOR}{body}"))
        }
    }

    /// Length of the longest prefix of `level`, leading whitespace aside,
    /// that occurs somewhere in the transcript.
    fn echoed_len(&self, level: &str) -> usize {
        let body = level.trim_start();
        let offset = level.len() - body.len();
        let ends: Vec<usize> = body
            .char_indices()
            .map(|(index, _)| index)
            .skip(1)
            .chain(std::iter::once(body.len()))
            .collect();
        // Containment is monotone in the prefix length.
        let matched = ends.partition_point(|&end| self.transcript.contains(&body[..end]));
        offset + matched.checked_sub(1).map_or(0, |last| ends[last])
    }

    fn already_sent(&self, paragraph: &str) -> bool {
        self.is_significant(paragraph) && self.transcript.contains(paragraph)
    }

    fn is_significant(&self, text: &str) -> bool {
        !text.is_empty() && text.chars().count() >= self.policy.min_paragraph_chars
    }
}

/// Start of the paragraph containing byte `at`.
fn paragraph_start(text: &str, at: usize) -> usize {
    text[..at]
        .rfind(PARAGRAPH_SEPARATOR)
        .map_or(0, |found| found + PARAGRAPH_SEPARATOR.len())
}
