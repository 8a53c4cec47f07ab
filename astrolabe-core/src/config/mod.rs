mod error;

pub use error::ConfigError;

use crate::constants::{
    CONFIG_PATH, DEFAULT_FLUSH_THRESHOLD, DEFAULT_MAX_RECURSION_DEPTH, DEFAULT_MIN_PARAGRAPH_CHARS,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Upper bound accepted for `max_recursion_depth`.
const MAX_ALLOWED_DEPTH: usize = 1_000;

/// Orchestrator tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentConfig {
    /// Number of follow-up model calls allowed per top-level request.
    pub max_recursion_depth: usize,
    /// Minimum buffered bytes (UTF-8) before a streamed fragment is emitted.
    pub stream_flush_threshold: usize,
    pub dedup: DedupPolicy,
    /// Upper bound for a single tool invocation; unbounded when `None`.
    pub tool_timeout_secs: Option<u64>,
}

/// Duplicate-suppression policy for streamed fragments. The paragraph
/// heuristic is approximate: short paragraphs that legitimately repeat can be
/// swallowed, which is what `min_paragraph_chars` guards against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupPolicy {
    pub enabled: bool,
    /// Paragraphs shorter than this never count as already emitted.
    pub min_paragraph_chars: usize,
}

impl Default for DedupPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            min_paragraph_chars: DEFAULT_MIN_PARAGRAPH_CHARS,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
            stream_flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            dedup: DedupPolicy::default(),
            tool_timeout_secs: None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    max_recursion_depth: Option<usize>,
    stream_flush_threshold: Option<usize>,
    tool_timeout_secs: Option<u64>,
    #[serde(default)]
    dedup: RawDedup,
}

#[derive(Debug, Deserialize, Default)]
struct RawDedup {
    enabled: Option<bool>,
    min_paragraph_chars: Option<usize>,
}

impl AgentConfig {
    /// Load from `path`, or from the default location when `None`. A missing
    /// default file yields the defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return read_config(path);
        }
        let default_path = Path::new(CONFIG_PATH);
        match read_config(default_path) {
            Ok(config) => Ok(config),
            Err(ConfigError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                info!("Agent configuration file not found; using defaults");
                Ok(Self::default())
            }
            Err(other) => Err(other),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        parse_config(content, Path::new("<inline>"))
    }

    pub fn with_max_recursion_depth(mut self, depth: usize) -> Self {
        self.max_recursion_depth = depth;
        self
    }

    pub fn with_stream_flush_threshold(mut self, threshold: usize) -> Self {
        self.stream_flush_threshold = threshold;
        self
    }

    pub fn with_dedup(mut self, dedup: DedupPolicy) -> Self {
        self.dedup = dedup;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout_secs = Some(timeout.as_secs().max(1));
        self
    }

    pub fn tool_timeout(&self) -> Option<Duration> {
        self.tool_timeout_secs.map(Duration::from_secs)
    }
}

fn read_config(path: &Path) -> Result<AgentConfig, ConfigError> {
    debug!(path = %path.display(), "Reading agent configuration file");
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content, path)
}

fn parse_config(content: &str, path: &Path) -> Result<AgentConfig, ConfigError> {
    let parsed: RawConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
        path: PathBuf::from(path),
        source,
    })?;

    let defaults = AgentConfig::default();
    let max_recursion_depth = parsed
        .max_recursion_depth
        .unwrap_or(defaults.max_recursion_depth);
    if max_recursion_depth > MAX_ALLOWED_DEPTH {
        return Err(ConfigError::Invalid {
            field: "max_recursion_depth",
            reason: format!("must not exceed {MAX_ALLOWED_DEPTH}, got {max_recursion_depth}"),
        });
    }

    if parsed.tool_timeout_secs == Some(0) {
        return Err(ConfigError::Invalid {
            field: "tool_timeout_secs",
            reason: "must be at least 1 second".to_string(),
        });
    }

    Ok(AgentConfig {
        max_recursion_depth,
        tool_timeout_secs: parsed.tool_timeout_secs,
        stream_flush_threshold: parsed
            .stream_flush_threshold
            .unwrap_or(defaults.stream_flush_threshold),
        dedup: DedupPolicy {
            enabled: parsed.dedup.enabled.unwrap_or(defaults.dedup.enabled),
            min_paragraph_chars: parsed
                .dedup
                .min_paragraph_chars
                .unwrap_or(defaults.dedup.min_paragraph_chars),
        },
    })
}
