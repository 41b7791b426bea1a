//! Prompt templates for the model-backed collaborators.

use crate::agents::{Brief, StyleConfig};
use crate::types::{Finding, ParseConfidence, TaskUnit};
use crate::utils::toml_config::Frequency;

pub fn planner_system(brief: &Brief) -> String {
    format!(
        r#"You are the research strategist for a personal newsletter. Turn the reader's interests into focused research tasks for autonomous scouts.

Reader interests: {interests}
Reader background: {profile}
Current date: {date}

Rules:
- One task per interest, each focused on a single interest.
- You may add one task covering the overlap of two interests if a clear trend links them.
- "additional_info" steers the scout using the reader's background, in one or two sentences. Do not list sources or steps.
- Never create more than {max_tasks} tasks.

Reply with a single JSON object and nothing else:
{{"tasks": [{{"topic": "string", "additional_info": "string"}}]}}"#,
        interests = brief.interests.join(", "),
        profile = brief.user_profile,
        date = brief.style.date,
        max_tasks = brief.max_tasks,
    )
}

pub fn scout_system(task: &TaskUnit, max_rounds: usize) -> String {
    format!(
        r#"You are an autonomous research scout. Investigate the topic below with the tools you have, then report the most relevant recent stories.

Topic: {topic}
Guidance: {context}

You may call tools in at most {max_rounds} rounds. Prefer specific queries over broad ones. Keep only items from the last 7-10 days."#,
        topic = task.topic,
        context = task.context,
        max_rounds = max_rounds,
    )
}

pub fn scout_conclude(task: &TaskUnit, schema: &str) -> String {
    format!(
        r#"Stop calling tools. Using only the tool results above, report the 3-5 most relevant stories about "{topic}".

Each finding needs a headline, a 2-3 sentence neutral summary, the source URLs, topic tags and the publication date when known.

Reply with a single JSON object matching this schema and nothing else:
{schema}"#,
        topic = task.topic,
        schema = schema,
    )
}

pub fn scorer_system(profile: &str) -> String {
    format!(
        r#"You are the chief editor of a personal newsletter. Review the scouted stories for this reader and curate them.

Reader profile: {profile}

1. Drop stories that are superficial, irrelevant or low quality.
2. Rank the rest, most relevant first. Refer to each story by its index.
3. If one or two of the strongest stories lack depth, name a focused follow-up question for each. Otherwise name none.

Stories marked "salvaged" were recovered from messy output; check them with extra care.

Reply with a single JSON object and nothing else:
{{"ranked": [0, 2, 1], "gaps": [{{"topic": "string", "additional_info": "string"}}], "explanation": "string"}}"#,
        profile = profile,
    )
}

/// Numbered listing of findings for the scorer.
pub fn findings_listing(findings: &[Finding]) -> String {
    findings
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let confidence = match f.confidence {
                ParseConfidence::Validated => "",
                ParseConfidence::Salvaged => " (salvaged)",
            };
            format!(
                "[{}]{} {}\n{}\nTags: {}\nSources: {}",
                i,
                confidence,
                f.headline,
                f.summary,
                f.tags.iter().cloned().collect::<Vec<_>>().join(", "),
                f.sources.join(" ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn composer_system(style: &StyleConfig, profile: &str) -> String {
    let opinions = if style.include_opinions {
        "Add a short, clearly marked opinion where it helps the reader."
    } else {
        "Stay strictly factual. No opinions."
    };
    let sources = if style.include_sources {
        "End every story with *Source: [title](url)*."
    } else {
        "Do not list sources."
    };
    let frequency = match style.frequency {
        Frequency::Daily => "daily",
        Frequency::Weekly => "weekly",
    };
    format!(
        r#"You are the lead correspondent of a {frequency} newsletter. Turn the curated stories into one cohesive Markdown briefing.

Reader profile: {profile}
Tone: {tone}
Date: {date}

Structure: a thematic title, a 2-3 sentence introduction, one "{heading}" section per story with "**The Big Picture:**", "**What's Happening:**" and "**Why It Matters:**", then a short conclusion. Separate stories with ---.
{opinions}
{sources}

Reply with the Markdown document only."#,
        frequency = frequency,
        heading = "## ",
        profile = profile,
        tone = style.tone,
        date = style.date,
        opinions = opinions,
        sources = sources,
    )
}
