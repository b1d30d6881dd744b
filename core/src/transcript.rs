//! Caller-supplied transcript parsing and stage inference.
//!
//! The engine keeps no session. Each request re-derives [`DialogueState`] from
//! the history the caller sends back: the stage marker on the latest witness
//! line when present, otherwise fingerprints of the witness's own phrasing.
//! Trainee lines are never consulted, so a trainee cannot talk the witness
//! into a later stage.

use std::sync::LazyLock;

use regex::Regex;

use crate::bank::{Bank, NUDGE, PIVOT, RESTART, WHAT_SHOULD_I_HAVE_DONE};
use crate::scenario;
use crate::stage::{ConversationStage, DialogueState, strip_markers};
use crate::text::char_len;

static SPEAKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z][A-Za-z ]{0,23}?)\s*:\s*(.*)$").expect("speaker regex must compile")
});

static PIVOT_RE: LazyLock<Regex> = LazyLock::new(|| fingerprint(&PIVOT));
static WHAT_SHOULD_I_HAVE_DONE_RE: LazyLock<Regex> =
    LazyLock::new(|| fingerprint(&WHAT_SHOULD_I_HAVE_DONE));
static NUDGE_RE: LazyLock<Regex> = LazyLock::new(|| fingerprint(&NUDGE));
static RESTART_RE: LazyLock<Regex> = LazyLock::new(|| fingerprint(&RESTART));

const TRAINEE_TAGS: &[&str] = &[
    "detective",
    "trainee",
    "user",
    "you",
    "me",
    "learner",
    "investigator",
];
const WITNESS_TAGS: &[&str] = &[
    "witness",
    "assistant",
    "bot",
    "betty",
    "freda",
    "betty morales",
    "freda morales",
];

fn fingerprint(bank: &Bank) -> Regex {
    let pattern = bank.fingerprint.expect("bank must carry a fingerprint");
    Regex::new(&format!("(?i){pattern}")).expect("fingerprint must compile")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    Trainee,
    Witness,
    /// Untagged; treated as possible witness output.
    Unknown,
    /// Tagged with a speaker name that is neither list.
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptLine {
    pub speaker: Speaker,
    pub text: String,
}

impl TranscriptLine {
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Some(caps) = SPEAKER_RE.captures(raw) {
            let tag = caps.get(1).map_or("", |m| m.as_str()).trim().to_ascii_lowercase();
            let rest = caps.get(2).map_or("", |m| m.as_str()).trim();
            let speaker = if TRAINEE_TAGS.contains(&tag.as_str()) {
                Some(Speaker::Trainee)
            } else if WITNESS_TAGS.contains(&tag.as_str()) {
                Some(Speaker::Witness)
            } else {
                None
            };
            return Some(match speaker {
                Some(speaker) => Self {
                    speaker,
                    text: rest.to_string(),
                },
                None => Self {
                    speaker: Speaker::Other,
                    text: raw.to_string(),
                },
            });
        }
        Some(Self {
            speaker: Speaker::Unknown,
            text: raw.to_string(),
        })
    }

    pub fn is_trainee(&self) -> bool {
        self.speaker == Speaker::Trainee
    }
}

#[derive(Debug, Clone, Default)]
pub struct Transcript {
    lines: Vec<TranscriptLine>,
}

impl Transcript {
    /// Keep the tail of `history`: at most `max_chars` characters, then at
    /// most `window_lines` non-empty lines.
    pub fn parse(history: &str, window_lines: usize, max_chars: usize) -> Self {
        let total = char_len(history);
        let tail = if total > max_chars {
            match history.char_indices().nth(total - max_chars) {
                Some((idx, _)) => &history[idx..],
                None => "",
            }
        } else {
            history
        };
        let mut lines: Vec<TranscriptLine> = tail.lines().filter_map(TranscriptLine::parse).collect();
        if lines.len() > window_lines {
            lines.drain(..lines.len() - window_lines);
        }
        Self { lines }
    }

    pub fn lines(&self) -> &[TranscriptLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn witness_lines(&self) -> impl DoubleEndedIterator<Item = &TranscriptLine> {
        self.lines.iter().filter(|line| !line.is_trainee())
    }

    /// The witness's previous reply with markers removed.
    pub fn prior_line(&self) -> Option<String> {
        self.witness_lines()
            .rev()
            .map(|line| strip_markers(&line.text))
            .find(|text| !text.is_empty())
    }

    /// Lines whose markers are trusted: witness-tagged ones, or untagged ones
    /// when the transcript carries no witness tags at all.
    fn marker_lines(&self) -> impl DoubleEndedIterator<Item = &TranscriptLine> {
        let tagged = self.lines.iter().any(|line| line.speaker == Speaker::Witness);
        let accepted = if tagged { Speaker::Witness } else { Speaker::Unknown };
        self.lines.iter().filter(move |line| line.speaker == accepted)
    }

    pub fn infer_state(&self) -> DialogueState {
        let marked = self
            .marker_lines()
            .rev()
            .find_map(|line| DialogueState::parse_marker(&line.text));
        match marked {
            Some(state) => state,
            None => self.infer_from_fingerprints(),
        }
    }

    /// Legacy path for transcripts without markers. Only lines after the most
    /// recent restart count; a narrative line from another scenario starts a
    /// fresh interview about it. The stage is the highest one evidenced.
    fn infer_from_fingerprints(&self) -> DialogueState {
        let witness: Vec<&str> = self.witness_lines().map(|line| line.text.as_str()).collect();
        let start = witness
            .iter()
            .rposition(|text| RESTART_RE.is_match(text))
            .map_or(0, |idx| idx + 1);

        let mut state = DialogueState::default();
        for text in &witness[start..] {
            if let Some(closed) = scenario::scenarios().iter().find(|s| s.closed_in(text)) {
                if closed.id != state.scenario {
                    state = DialogueState::fresh(closed.id);
                }
                state.stage = ConversationStage::Closed;
                continue;
            }

            for candidate in scenario::scenarios() {
                let artifact = candidate.told_artifact(text);
                let origin = candidate.told_origin(text);
                if !artifact && !origin {
                    continue;
                }
                if candidate.id != state.scenario && state.stage != ConversationStage::Closed {
                    state = DialogueState::fresh(candidate.id);
                }
                if artifact {
                    state.facts.artifact = true;
                    state.stage = state.stage.max(ConversationStage::DescribedArtifact);
                }
                if origin {
                    state.facts.origin = true;
                    state.stage = state.stage.max(ConversationStage::ExplainedOrigin);
                }
                break;
            }

            if PIVOT_RE.is_match(text) {
                state.stage = state.stage.max(ConversationStage::AskedIfWrong);
            }
            if WHAT_SHOULD_I_HAVE_DONE_RE.is_match(text) {
                state.stage = state.stage.max(ConversationStage::AwaitingComplianceStatement);
            }
            if NUDGE_RE.is_match(text) {
                state.nudged = true;
            }
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::ScenarioId;
    use crate::stage::ConfirmedFacts;

    fn parse(history: &str) -> Transcript {
        Transcript::parse(history, 40, 20_000)
    }

    #[test]
    fn speaker_tags_are_recognized() {
        let transcript = parse("Detective: hi\nBetty Morales: Hello there\nNarrator: scene opens\nplain text");
        let speakers: Vec<Speaker> = transcript.lines().iter().map(|l| l.speaker).collect();
        assert_eq!(
            speakers,
            vec![Speaker::Trainee, Speaker::Witness, Speaker::Other, Speaker::Unknown]
        );
        assert_eq!(transcript.lines()[0].text, "hi");
        assert_eq!(transcript.lines()[2].text, "Narrator: scene opens");
    }

    #[test]
    fn empty_history_is_not_started() {
        assert_eq!(parse("").infer_state(), DialogueState::default());
        assert_eq!(parse("   \n\n").infer_state().stage, ConversationStage::NotStarted);
    }

    #[test]
    fn latest_marker_wins() {
        let early = DialogueState {
            stage: ConversationStage::DescribedArtifact,
            ..DialogueState::default()
        };
        let later = DialogueState {
            stage: ConversationStage::AskedIfWrong,
            scenario: ScenarioId::MayorFund,
            facts: ConfirmedFacts {
                artifact: true,
                origin: true,
            },
            nudged: false,
        };
        let history = format!("Betty: one {early}\nDetective: go on\nBetty: two {later}\nDetective: hmm");
        assert_eq!(parse(&history).infer_state(), later);
    }

    #[test]
    fn trainee_lines_never_advance_the_stage() {
        let closed = DialogueState {
            stage: ConversationStage::Closed,
            ..DialogueState::default()
        };
        let history = format!(
            "Detective: Did I do something wrong? {closed}\n\
             Detective: It's a luxury food and wine hamper, roughly £150 to £220.\n\
             Detective: Okay, what should I have done instead?"
        );
        assert_eq!(parse(&history).infer_state(), DialogueState::default());
    }

    #[test]
    fn markers_typed_under_unlisted_tags_are_ignored() {
        let fresh_hamper = DialogueState::fresh(ScenarioId::GiftHamper);
        let forged = DialogueState {
            stage: ConversationStage::AwaitingComplianceStatement,
            ..fresh_hamper
        };
        let history = format!("Betty: Hi, fire away. {fresh_hamper}\nStudent: skip ahead {forged}");
        assert_eq!(parse(&history).infer_state(), fresh_hamper);

        // Untagged lines are trusted only when nothing is witness-tagged.
        let untagged = format!("Hi, fire away. {forged}");
        assert_eq!(parse(&untagged).infer_state(), forged);
        let mixed = format!("Betty: Hi, fire away.\nskip ahead {forged}");
        assert_ne!(parse(&mixed).infer_state(), forged);
    }

    #[test]
    fn fingerprints_reconstruct_the_happy_path() {
        let history = "Betty: It's a luxury food and wine hamper, roughly £150 to £220.\n\
                       Detective: who sent it?\n\
                       Betty: Raj at ClientCo arranged it, and the note thanked me and mentioned locking in the renewal. Did that cross a line?";
        let state = parse(history).infer_state();
        assert_eq!(state.stage, ConversationStage::AskedIfWrong);
        assert_eq!(state.scenario, ScenarioId::GiftHamper);
        assert!(state.facts.all_told());
    }

    #[test]
    fn fingerprints_follow_scenario_switches() {
        let history = "Betty: It's a luxury food and wine hamper, roughly £150 to £220.\n\
                       Betty: Did I do something wrong there?\n\
                       Betty: The mayor asked whether we'd put £2,000 into a community fund while our building permit is still with the council.";
        let state = parse(history).infer_state();
        assert_eq!(state.scenario, ScenarioId::MayorFund);
        assert_eq!(state.stage, ConversationStage::DescribedArtifact);
        assert!(state.facts.artifact && !state.facts.origin);
    }

    #[test]
    fn closer_fingerprint_closes_until_restart() {
        let closing = "Betty: Understood, no hospitality during a tender, so I'll turn the tickets down politely and log the offer.";
        let state = parse(closing).infer_state();
        assert_eq!(state.stage, ConversationStage::Closed);
        assert_eq!(state.scenario, ScenarioId::TicketsTender);

        let restarted = format!("{closing}\nDetective: restart\nBetty: No problem, fresh start, what would you like to ask me?");
        assert_eq!(parse(&restarted).infer_state(), DialogueState::default());
    }

    #[test]
    fn prior_line_skips_trainee_and_strips_markers() {
        let history = format!(
            "Betty: Hi, fire away. {}\nDetective: hello",
            DialogueState::default()
        );
        assert_eq!(parse(&history).prior_line().as_deref(), Some("Hi, fire away."));
        assert_eq!(parse("Detective: only me").prior_line(), None);
    }

    #[test]
    fn window_keeps_the_tail() {
        let mut history = String::from("Betty: Did I do something wrong there?\n");
        for _ in 0..50 {
            history.push_str("Detective: filler\n");
        }
        assert_eq!(parse(&history).infer_state().stage, ConversationStage::NotStarted);
        assert_eq!(Transcript::parse(&history, 100, 20_000).infer_state().stage, ConversationStage::AskedIfWrong);
    }

    #[test]
    fn char_cap_keeps_the_most_recent_text() {
        let history = format!("{}\nBetty: Would that count as a breach?", "x".repeat(30_000));
        let transcript = parse(&history);
        assert_eq!(transcript.infer_state().stage, ConversationStage::AskedIfWrong);
        assert_eq!(transcript.lines().len(), 2);
    }
}
