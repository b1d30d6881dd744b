use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::text::normalize;

static AGGRESSIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!{2,}|\b(?:ridiculous|unbelievable|shut up|answer me|listen to me)\b")
        .expect("aggressive tone regex must compile")
});
static ACCUSATORY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:you (?:should|must|knew|realise|realize)|why did you|against policy|breach\w*|violat\w*)\b")
        .expect("accusatory tone regex must compile")
});
static RUSHED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:asap|quick(?:ly)?|hurry|right now|urgent)\b")
        .expect("rushed tone regex must compile")
});
static LEGALISTIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:policy|section|clause|threshold|disclosure form|compliance)\b")
        .expect("legalistic tone regex must compile")
});
static PROBING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:help me understand|walk me|talk me through|could you explain|clarify|what happened)\b")
        .expect("probing tone regex must compile")
});
static SUPPORTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:thanks|thank you|appreciate|that helps|no worries|please)\b")
        .expect("supportive tone regex must compile")
});

/// Register of the trainee's message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Aggressive,
    Accusatory,
    Rushed,
    Legalistic,
    Probing,
    Supportive,
    Neutral,
}

/// How the witness leans in response to the trainee's tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    Defensive,
    Minimizing,
    Curious,
    Cooperative,
}

pub fn detect(utterance: &str) -> Tone {
    let text = normalize(utterance);
    if AGGRESSIVE_RE.is_match(&text) {
        Tone::Aggressive
    } else if ACCUSATORY_RE.is_match(&text) {
        Tone::Accusatory
    } else if RUSHED_RE.is_match(&text) {
        Tone::Rushed
    } else if LEGALISTIC_RE.is_match(&text) {
        Tone::Legalistic
    } else if PROBING_RE.is_match(&text) || text.matches('?').count() >= 2 {
        Tone::Probing
    } else if SUPPORTIVE_RE.is_match(&text) {
        Tone::Supportive
    } else {
        Tone::Neutral
    }
}

impl Tone {
    pub fn stance(self) -> Stance {
        match self {
            Tone::Aggressive | Tone::Accusatory => Stance::Defensive,
            Tone::Legalistic => Stance::Minimizing,
            Tone::Supportive => Stance::Cooperative,
            Tone::Rushed | Tone::Probing | Tone::Neutral => Stance::Curious,
        }
    }
}
