//! Configuration for the interception layer

use std::env;

/// Environment variable overriding [`FrameEvalConfig::receiver_name`]
pub const RECEIVER_ENV: &str = "FRAME_EVAL_RECEIVER";
/// Environment variable overriding [`FrameEvalConfig::lookup_span_name`]
pub const SPAN_NAME_ENV: &str = "FRAME_EVAL_SPAN_NAME";
/// Environment variable overriding [`FrameEvalConfig::instance_partitioning`]
pub const INSTANCE_CACHE_ENV: &str = "FRAME_EVAL_INSTANCE_CACHE";

/// Tunables for [`FrameEval`](crate::FrameEval)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameEvalConfig {
    /// Local name identifying the receiver of a method call
    pub receiver_name: String,
    /// Name passed to the span start hook around each cache lookup
    pub lookup_span_name: String,
    /// Keep a separate cache per stateful receiver
    pub instance_partitioning: bool,
}

impl Default for FrameEvalConfig {
    fn default() -> Self {
        Self {
            receiver_name: "self".to_string(),
            lookup_span_name: "cache lookup".to_string(),
            instance_partitioning: true,
        }
    }
}

impl FrameEvalConfig {
    /// Defaults overridden by `FRAME_EVAL_*` environment variables
    ///
    /// Empty values are ignored. The partitioning switch accepts
    /// `0`/`false`/`off` and `1`/`true`/`on`; anything else keeps the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(name) = lookup(RECEIVER_ENV).filter(|v| !v.is_empty()) {
            config.receiver_name = name;
        }
        if let Some(name) = lookup(SPAN_NAME_ENV).filter(|v| !v.is_empty()) {
            config.lookup_span_name = name;
        }
        if let Some(flag) = lookup(INSTANCE_CACHE_ENV).as_deref().and_then(parse_flag) {
            config.instance_partitioning = flag;
        }
        config
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}
