//! Conversation progress and the marker that carries it between requests.
//!
//! The marker is the only state that survives a round trip. It is appended to
//! every reply's `marker` field; callers that echo it into the transcript get
//! exact state reconstruction, others fall back to fingerprint inference.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::scenario::ScenarioId;

static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\[witness:v1 ([^\[\]]*)\]\]").expect("marker regex must compile")
});

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStage {
    #[default]
    NotStarted,
    DescribedArtifact,
    ExplainedOrigin,
    AskedIfWrong,
    AwaitingComplianceStatement,
    Closed,
}

impl ConversationStage {
    pub const ALL: [ConversationStage; 6] = [
        ConversationStage::NotStarted,
        ConversationStage::DescribedArtifact,
        ConversationStage::ExplainedOrigin,
        ConversationStage::AskedIfWrong,
        ConversationStage::AwaitingComplianceStatement,
        ConversationStage::Closed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConversationStage::NotStarted => "not_started",
            ConversationStage::DescribedArtifact => "described_artifact",
            ConversationStage::ExplainedOrigin => "explained_origin",
            ConversationStage::AskedIfWrong => "asked_if_wrong",
            ConversationStage::AwaitingComplianceStatement => "awaiting_compliance_statement",
            ConversationStage::Closed => "closed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|stage| stage.as_str() == raw)
    }
}

/// Which narrative facts the witness has already volunteered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfirmedFacts {
    pub artifact: bool,
    pub origin: bool,
}

impl ConfirmedFacts {
    pub fn all_told(self) -> bool {
        self.artifact && self.origin
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DialogueState {
    pub stage: ConversationStage,
    pub scenario: ScenarioId,
    pub facts: ConfirmedFacts,
    pub nudged: bool,
}

impl DialogueState {
    /// Start of an interview about `scenario`.
    pub fn fresh(scenario: ScenarioId) -> Self {
        Self {
            scenario,
            ..Self::default()
        }
    }

    pub fn is_closed(&self) -> bool {
        self.stage == ConversationStage::Closed
    }

    pub fn marker(&self) -> String {
        self.to_string()
    }

    /// Parse a single marker body (`stage=... scenario=... facts=... nudged=...`).
    /// Unknown keys are ignored; `stage` and `scenario` are required.
    fn from_fields(body: &str) -> Option<Self> {
        let mut stage = None;
        let mut scenario = None;
        let mut facts = ConfirmedFacts::default();
        let mut nudged = false;
        for pair in body.split_whitespace() {
            let (key, value) = pair.split_once('=')?;
            match key {
                "stage" => stage = Some(ConversationStage::parse(value)?),
                "scenario" => scenario = Some(ScenarioId::parse(value)?),
                "facts" => {
                    for fact in value.split(',') {
                        match fact {
                            "artifact" => facts.artifact = true,
                            "origin" => facts.origin = true,
                            "-" | "" => {}
                            _ => return None,
                        }
                    }
                }
                "nudged" => {
                    nudged = match value {
                        "1" => true,
                        "0" => false,
                        _ => return None,
                    }
                }
                _ => {}
            }
        }
        Some(Self {
            stage: stage?,
            scenario: scenario?,
            facts,
            nudged,
        })
    }

    /// Last well-formed marker in `line`, if any.
    pub fn parse_marker(line: &str) -> Option<Self> {
        MARKER_RE
            .captures_iter(line)
            .filter_map(|caps| Self::from_fields(caps.get(1)?.as_str()))
            .last()
    }
}

impl fmt::Display for DialogueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let facts = match (self.facts.artifact, self.facts.origin) {
            (true, true) => "artifact,origin",
            (true, false) => "artifact",
            (false, true) => "origin",
            (false, false) => "-",
        };
        write!(
            f,
            "[[witness:v1 stage={} scenario={} facts={} nudged={}]]",
            self.stage.as_str(),
            self.scenario.as_str(),
            facts,
            u8::from(self.nudged)
        )
    }
}

/// Remove every marker from `text` so it never feeds the repeat check.
pub fn strip_markers(text: &str) -> String {
    let stripped = MARKER_RE.replace_all(text, "");
    stripped.trim().to_string()
}
