//! Two-stage parsing of collaborator output.
//!
//! The strict stage reads the whole reply against the exact schema. When that
//! fails the salvage stage collects every well-formed JSON fragment in the text
//! (fenced blocks included), tries them largest first against a lenient shape,
//! and tags whatever it recovers as [`ParseConfidence::Salvaged`].

use crate::types::{Finding, ParseConfidence};
use regex::Regex;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Failed or successful parse attempts per reply before the scan gives up.
const MAX_FRAGMENT_STARTS: usize = 256;

/// Both parse stages failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct ParseFailure {
    pub reason: String,
}

impl ParseFailure {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Exact structured output a worker is asked to produce.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FindingsPayload {
    pub findings: Vec<FindingRecord>,
    /// Short note on how the findings were selected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FindingRecord {
    pub headline: String,
    pub summary: String,
    /// Source URLs
    #[serde(default)]
    pub sources: Vec<String>,
    /// Topic tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Publication date, ISO 8601
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
}

impl FindingRecord {
    fn into_finding(self, confidence: ParseConfidence) -> Finding {
        let mut finding = Finding::new(self.headline, self.summary)
            .with_sources(self.sources)
            .with_tags(self.tags);
        finding.published = self.published;
        finding.confidence = confidence;
        finding
    }
}

/// JSON schema of [`FindingsPayload`], handed to the model when it concludes.
pub fn findings_schema() -> Value {
    serde_json::to_value(schemars::schema_for!(FindingsPayload)).unwrap_or(Value::Null)
}

// ============= Lenient shapes =============

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LenientPayload {
    Wrapped(LenientWrapper),
    Bare(Vec<LenientRecord>),
}

#[derive(Debug, Deserialize)]
struct LenientWrapper {
    #[serde(alias = "NewsStories", alias = "news_stories", alias = "stories")]
    findings: Vec<LenientRecord>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    #[default]
    None,
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::None => Vec::new(),
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LenientRecord {
    #[serde(alias = "title")]
    headline: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    sources: OneOrMany,
    #[serde(default)]
    url: Option<String>,
    #[serde(default, alias = "topic")]
    tags: OneOrMany,
    #[serde(default, alias = "timestamp")]
    published: Option<String>,
}

impl LenientRecord {
    fn into_record(self) -> FindingRecord {
        let mut sources = self.sources.into_vec();
        if let Some(url) = self.url {
            if !sources.contains(&url) {
                sources.push(url);
            }
        }
        FindingRecord {
            headline: self.headline,
            summary: self.summary,
            sources,
            tags: self.tags.into_vec(),
            published: self.published,
        }
    }
}

impl LenientPayload {
    fn into_records(self) -> Vec<FindingRecord> {
        let records = match self {
            LenientPayload::Wrapped(w) => w.findings,
            LenientPayload::Bare(v) => v,
        };
        records.into_iter().map(LenientRecord::into_record).collect()
    }
}

// ============= Parsing =============

/// Findings recovered from one reply.
#[derive(Debug, Clone)]
pub struct ParsedFindings {
    pub findings: Vec<Finding>,
    pub confidence: ParseConfidence,
}

/// Parse a worker's final reply into findings.
pub fn parse_findings(raw: &str) -> Result<ParsedFindings, ParseFailure> {
    let (records, confidence) = match serde_json::from_str::<FindingsPayload>(strip_outer_fence(raw)) {
        Ok(payload) => (payload.findings, ParseConfidence::Validated),
        Err(strict_err) => {
            let payload = salvage::<LenientPayload>(raw).ok_or_else(|| {
                ParseFailure::new(format!(
                    "strict parse failed ({}) and no usable JSON fragment was found",
                    strict_err
                ))
            })?;
            (payload.into_records(), ParseConfidence::Salvaged)
        }
    };

    Ok(ParsedFindings {
        findings: records
            .into_iter()
            .map(|r| r.into_finding(confidence))
            .collect(),
        confidence,
    })
}

/// Two-stage parse of any JSON reply. Strict and salvage stages share `T`.
pub fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<(T, ParseConfidence), ParseFailure> {
    match serde_json::from_str::<T>(strip_outer_fence(raw)) {
        Ok(value) => Ok((value, ParseConfidence::Validated)),
        Err(strict_err) => salvage::<T>(raw)
            .map(|value| (value, ParseConfidence::Salvaged))
            .ok_or_else(|| {
                ParseFailure::new(format!(
                    "strict parse failed ({}) and no usable JSON fragment was found",
                    strict_err
                ))
            }),
    }
}

/// The reply without one surrounding code fence, if the whole reply is fenced.
fn strip_outer_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    let body = body.strip_prefix("json").unwrap_or(body);
    body.trim()
}

fn salvage<T: DeserializeOwned>(raw: &str) -> Option<T> {
    candidate_fragments(raw)
        .into_iter()
        .find_map(|value| serde_json::from_value::<T>(value).ok())
}

/// Nested objects and arrays of `value`, with their compact sizes.
fn push_nested(value: &Value, out: &mut Vec<(usize, Value)>) {
    let children: Vec<&Value> = match value {
        Value::Object(map) => map.values().collect(),
        Value::Array(items) => items.iter().collect(),
        _ => return,
    };
    for child in children {
        if child.is_object() || child.is_array() {
            out.push((child.to_string().len(), child.clone()));
            push_nested(child, out);
        }
    }
}

/// Every well-formed JSON object or array in `raw`, largest first.
fn candidate_fragments(raw: &str) -> Vec<Value> {
    let mut fragments: Vec<(usize, Value)> = Vec::new();

    if let Ok(fence) = Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)```") {
        for cap in fence.captures_iter(raw) {
            if let Some(body) = cap.get(1) {
                let body = body.as_str().trim();
                if let Ok(value) = serde_json::from_str::<Value>(body) {
                    fragments.push((body.len(), value));
                }
            }
        }
    }

    // Text inside a parsed fragment is not scanned again; its nested values
    // are taken from the parsed tree instead.
    let mut scanned_to = 0;
    let mut attempts = 0;
    for (start, ch) in raw.char_indices() {
        if start < scanned_to || (ch != '{' && ch != '[') {
            continue;
        }
        if attempts >= MAX_FRAGMENT_STARTS {
            tracing::debug!(attempts, "fragment scan limit reached");
            break;
        }
        attempts += 1;
        let mut stream = serde_json::Deserializer::from_str(&raw[start..]).into_iter::<Value>();
        if let Some(Ok(value)) = stream.next() {
            let len = stream.byte_offset();
            scanned_to = start + len;
            push_nested(&value, &mut fragments);
            fragments.push((len, value));
        }
    }

    // Stable sort keeps earlier fragments first among equal sizes
    fragments.sort_by(|a, b| b.0.cmp(&a.0));
    fragments.into_iter().map(|(_, value)| value).collect()
}
