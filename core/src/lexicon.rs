//! Intent routing.
//!
//! One pass over an ordered rule table: greetings, scenario rules, glossary,
//! general topics, then a stage-aware fallback. The first rule that matches
//! decides the [`ResponseCategory`]. Termination and the closed/restart
//! policy are handled by the engine before this runs.

use std::sync::LazyLock;

use regex::Regex;

use crate::bank::{self, Bank, GLOSSARY};
use crate::config::PolicyLimits;
use crate::scenario::{self, ScenarioId};
use crate::slots::Slots;
use crate::stage::{ConversationStage, DialogueState};
use crate::text::normalize;

static GREETING_HI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:hi|hello|hey|hiya|howdy|good (?:morning|afternoon|evening))[,!.]?\s*(?:betty|freda|there|detective)?[!.]?\s*$",
    )
    .expect("greeting regex must compile")
});
static HOW_ARE_YOU_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?:hi|hello|hey|hiya)(?: betty| freda| there)?[,!.]?\s+)?(?:how (?:are|r) (?:you|u)(?: doing)?(?: today)?|how's it going|how are things|(?:are )?you ok(?:ay)?|you doing ok(?:ay)?)(?:,? (?:betty|freda))?\s*[?!.]*\s*$",
    )
    .expect("how-are-you regex must compile")
});
static THANKS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:thanks|thank you|cheers|much appreciated|appreciate (?:it|that))\b[^?]{0,30}$")
        .expect("thanks regex must compile")
});
static RESTART_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*/?(?:restart|reset|start (?:again|over)|new scenario|try again|begin again)\b")
        .expect("restart regex must compile")
});

static DESCRIBE_ASK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:tell me (?:about|what)|explain what|walk me through|talk me through|what happened|describe|what (?:was|is) it\b|what did (?:you|they) (?:get|receive|offer)|how much (?:was|is|did) (?:it|that|they)|what(?:'s| is| was) it worth|value of (?:it|the (?:gift|hamper|tickets?|offer)))",
    )
    .expect("describe ask regex must compile")
});
static ORIGIN_ASK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:who (?:sent|gave|provided|offered|arranged|asked|was it|is it from)|who\b.*\bfrom|why (?:did|would) (?:they|he|she|the)|what reason|the card|a card|the note|when did|when was|what day|what date|how long ago|arrived?|delivered)\b",
    )
    .expect("origin ask regex must compile")
});

static YES_NO_START_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:do|does|did|is|are|am|can|could|may|might|will|would|have|has|had|should)\b")
        .expect("yes/no regex must compile")
});
static AFFIRMATIVE_START_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:yes|yep|yeah|correct|right|it is|it was|afraid so|i'm afraid)\b")
        .expect("affirmative regex must compile")
});
static NEGATIVE_START_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:no|nope|nah|not really|doesn't|isn't|fine|ok|okay)\b")
        .expect("negative regex must compile")
});
static AFFIRMATIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:breach\w*|wrong|against (?:the )?(?:policy|rules)|not allowed|not acceptable|shouldn't have|cannot|can't|over the (?:threshold|limit)|linked to (?:a )?(?:decision|tender|renewal))\b",
    )
    .expect("affirmative content regex must compile")
});
static NEGATIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:within (?:policy|limits?|the limit)|seems fine|acceptable|that's fine)\b")
        .expect("negative content regex must compile")
});

static DEFINITION_ASK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:what(?:'s| is| are| does)|define|meaning of|mean by)\b")
        .expect("definition regex must compile")
});
static REGISTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:register|log(?:ged|ging)?|record(?:ed|ing)?|disclos\w*|declare)\b")
        .expect("register regex must compile")
});
static CASH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:cash|vouchers?|gift cards?)\b").expect("cash regex must compile")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GreetingKind {
    Hi,
    HowAreYou,
    Thanks,
}

/// Which narrative fact a scenario line conveys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Told {
    Artifact,
    Origin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicIntent {
    Gifts,
    Hospitality,
    PublicOfficials,
    Facilitation,
    ThirdParties,
    Register,
    Travel,
    Donations,
    Conflicts,
}

impl TopicIntent {
    /// Fixed evaluation order; at most one topic fires.
    pub const PRIORITY: [TopicIntent; 9] = [
        TopicIntent::Gifts,
        TopicIntent::Hospitality,
        TopicIntent::PublicOfficials,
        TopicIntent::Facilitation,
        TopicIntent::ThirdParties,
        TopicIntent::Register,
        TopicIntent::Travel,
        TopicIntent::Donations,
        TopicIntent::Conflicts,
    ];

    fn matches(self, normalized: &str, slots: &Slots) -> bool {
        match self {
            TopicIntent::Gifts => slots.topics.gift,
            TopicIntent::Hospitality => slots.topics.hospitality,
            TopicIntent::PublicOfficials => slots.involves_public_official,
            TopicIntent::Facilitation => slots.topics.facilitation,
            TopicIntent::ThirdParties => slots.topics.third_party,
            TopicIntent::Register => REGISTER_RE.is_match(normalized),
            TopicIntent::Travel => slots.topics.travel,
            TopicIntent::Donations => slots.topics.donation,
            TopicIntent::Conflicts => slots.topics.conflict,
        }
    }

    /// Slot-aware reply bank.
    pub fn bank(self, utterance: &str, slots: &Slots, limits: &PolicyLimits) -> Bank {
        let over = |limit: u32| slots.amount.is_some_and(|amount| amount > limit);
        match self {
            TopicIntent::Gifts => {
                if slots.involves_public_official {
                    bank::OFFICIAL_GIFT
                } else if slots.during_tender {
                    bank::TENDER_DECLINE
                } else if CASH_RE.is_match(&normalize(utterance)) {
                    bank::CASH_GIFT
                } else if over(limits.gift) {
                    bank::GIFT_OVER_LIMIT
                } else if over(limits.disclosure_threshold) {
                    bank::GIFT_DISCLOSE
                } else {
                    bank::GIFT_GENERAL
                }
            }
            TopicIntent::Hospitality => {
                if slots.during_tender {
                    bank::TENDER_DECLINE
                } else if slots.involves_public_official {
                    bank::OFFICIAL_HOSPITALITY
                } else if over(limits.hospitality) {
                    bank::HOSPITALITY_OVER_LIMIT
                } else {
                    bank::HOSPITALITY_GENERAL
                }
            }
            TopicIntent::PublicOfficials => bank::PUBLIC_OFFICIALS,
            TopicIntent::Facilitation => bank::FACILITATION,
            TopicIntent::ThirdParties => bank::THIRD_PARTIES,
            TopicIntent::Register => bank::REGISTER,
            TopicIntent::Travel => bank::TRAVEL,
            TopicIntent::Donations => {
                if slots.involves_public_official {
                    bank::OFFICIAL_DONATION
                } else {
                    bank::DONATIONS
                }
            }
            TopicIntent::Conflicts => bank::CONFLICTS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCategory {
    Opening,
    Greeting(GreetingKind),
    Narrative {
        scenario: ScenarioId,
        told: Told,
        /// Append the "did I do something wrong?" question.
        pivot: bool,
        /// The utterance moved the interview to a different scenario.
        switched: bool,
    },
    AskWhatShouldIHaveDone,
    AskWhatNowIfOk,
    AskForClarity,
    AwaitStatement,
    Definition {
        term: &'static str,
    },
    Topic(TopicIntent),
    Nudge,
    Closing {
        scenario: ScenarioId,
    },
    ClosedNotice,
    Restart,
}

impl ResponseCategory {
    pub fn name(&self) -> &'static str {
        match self {
            ResponseCategory::Opening => "opening",
            ResponseCategory::Greeting(_) => "greeting",
            ResponseCategory::Narrative { .. } => "narrative",
            ResponseCategory::AskWhatShouldIHaveDone => "ask_what_should_i_have_done",
            ResponseCategory::AskWhatNowIfOk => "ask_what_now_if_ok",
            ResponseCategory::AskForClarity => "ask_for_clarity",
            ResponseCategory::AwaitStatement => "await_statement",
            ResponseCategory::Definition { .. } => "definition",
            ResponseCategory::Topic(_) => "topic",
            ResponseCategory::Nudge => "nudge",
            ResponseCategory::Closing { .. } => "closing",
            ResponseCategory::ClosedNotice => "closed_notice",
            ResponseCategory::Restart => "restart",
        }
    }

    /// Closing lines must stay unambiguous, so they are never flavored.
    pub fn is_styled(&self) -> bool {
        !matches!(
            self,
            ResponseCategory::Closing { .. } | ResponseCategory::ClosedNotice
        )
    }

    /// State carried forward after the witness answers with this category.
    pub fn next_state(&self, state: &DialogueState) -> DialogueState {
        match *self {
            ResponseCategory::Opening
            | ResponseCategory::Greeting(_)
            | ResponseCategory::AskWhatNowIfOk
            | ResponseCategory::AskForClarity
            | ResponseCategory::AwaitStatement
            | ResponseCategory::Definition { .. }
            | ResponseCategory::Topic(_)
            | ResponseCategory::ClosedNotice => *state,
            ResponseCategory::Nudge => DialogueState {
                nudged: true,
                ..*state
            },
            ResponseCategory::Narrative {
                scenario,
                told,
                pivot,
                switched,
            } => {
                let mut next = if switched || scenario != state.scenario {
                    DialogueState::fresh(scenario)
                } else {
                    *state
                };
                let reached = match told {
                    Told::Artifact => {
                        next.facts.artifact = true;
                        ConversationStage::DescribedArtifact
                    }
                    Told::Origin => {
                        next.facts.origin = true;
                        ConversationStage::ExplainedOrigin
                    }
                };
                next.stage = if pivot {
                    ConversationStage::AskedIfWrong
                } else {
                    next.stage.max(reached)
                };
                next
            }
            ResponseCategory::AskWhatShouldIHaveDone => DialogueState {
                stage: ConversationStage::AwaitingComplianceStatement,
                ..*state
            },
            ResponseCategory::Closing { scenario } => {
                let base = if scenario == state.scenario {
                    *state
                } else {
                    DialogueState::fresh(scenario)
                };
                DialogueState {
                    stage: ConversationStage::Closed,
                    ..base
                }
            }
            ResponseCategory::Restart => DialogueState::default(),
        }
    }
}

pub fn is_restart_command(utterance: &str) -> bool {
    RESTART_RE.is_match(&normalize(utterance))
}

pub fn greeting(normalized: &str) -> Option<GreetingKind> {
    if GREETING_HI_RE.is_match(normalized) {
        Some(GreetingKind::Hi)
    } else if HOW_ARE_YOU_RE.is_match(normalized) {
        Some(GreetingKind::HowAreYou)
    } else if THANKS_RE.is_match(normalized) {
        Some(GreetingKind::Thanks)
    } else {
        None
    }
}

/// Longest glossary term mentioned in a definition question.
pub fn definition_term(normalized: &str) -> Option<&'static str> {
    if !DEFINITION_ASK_RE.is_match(normalized) {
        return None;
    }
    GLOSSARY
        .iter()
        .find(|entry| normalized.contains(entry.term))
        .map(|entry| entry.term)
}

/// Route one trainee utterance. `triggered` is the scenario whose trigger the
/// utterance matched, if any; the engine computes it once and shares it with
/// the termination check.
pub fn route(
    utterance: &str,
    slots: &Slots,
    state: &DialogueState,
    triggered: Option<ScenarioId>,
) -> ResponseCategory {
    let normalized = normalize(utterance);

    if let Some(kind) = greeting(&normalized) {
        return ResponseCategory::Greeting(kind);
    }
    if let Some(category) = scenario_rule(&normalized, state, triggered) {
        return category;
    }
    if let Some(term) = definition_term(&normalized) {
        return ResponseCategory::Definition { term };
    }
    if let Some(intent) = TopicIntent::PRIORITY
        .into_iter()
        .find(|intent| intent.matches(&normalized, slots))
    {
        return ResponseCategory::Topic(intent);
    }
    fallback(state)
}

fn scenario_rule(
    normalized: &str,
    state: &DialogueState,
    triggered: Option<ScenarioId>,
) -> Option<ResponseCategory> {
    if let Some(id) = triggered.filter(|id| *id != state.scenario) {
        return Some(ResponseCategory::Narrative {
            scenario: id,
            told: Told::Artifact,
            pivot: false,
            switched: true,
        });
    }

    if state.stage == ConversationStage::AskedIfWrong {
        if let Some(category) = pivot_answer(normalized) {
            return Some(category);
        }
    }

    let told = if ORIGIN_ASK_RE.is_match(normalized) {
        Told::Origin
    } else if DESCRIBE_ASK_RE.is_match(normalized) {
        Told::Artifact
    } else if triggered.is_some() {
        next_untold(state)
    } else {
        return None;
    };
    Some(narrative(state, told))
}

fn pivot_answer(normalized: &str) -> Option<ResponseCategory> {
    if AFFIRMATIVE_START_RE.is_match(normalized) {
        Some(ResponseCategory::AskWhatShouldIHaveDone)
    } else if NEGATIVE_START_RE.is_match(normalized) {
        Some(ResponseCategory::AskWhatNowIfOk)
    } else if AFFIRMATIVE_RE.is_match(normalized) {
        Some(ResponseCategory::AskWhatShouldIHaveDone)
    } else if NEGATIVE_RE.is_match(normalized) {
        Some(ResponseCategory::AskWhatNowIfOk)
    } else if YES_NO_START_RE.is_match(normalized) {
        Some(ResponseCategory::AskForClarity)
    } else {
        None
    }
}

fn next_untold(state: &DialogueState) -> Told {
    if state.facts.artifact && !state.facts.origin {
        Told::Origin
    } else {
        Told::Artifact
    }
}

/// A line from the active scenario; the pivot question rides along once both
/// facts are out and it has not been asked yet.
fn narrative(state: &DialogueState, told: Told) -> ResponseCategory {
    let mut facts = state.facts;
    match told {
        Told::Artifact => facts.artifact = true,
        Told::Origin => facts.origin = true,
    }
    ResponseCategory::Narrative {
        scenario: state.scenario,
        told,
        pivot: facts.all_told() && state.stage < ConversationStage::AskedIfWrong,
        switched: false,
    }
}

fn fallback(state: &DialogueState) -> ResponseCategory {
    match state.stage {
        ConversationStage::AskedIfWrong => ResponseCategory::AskForClarity,
        ConversationStage::AwaitingComplianceStatement => ResponseCategory::AwaitStatement,
        ConversationStage::Closed => ResponseCategory::ClosedNotice,
        ConversationStage::NotStarted
        | ConversationStage::DescribedArtifact
        | ConversationStage::ExplainedOrigin => {
            if state.nudged {
                narrative(state, next_untold(state))
            } else {
                ResponseCategory::Nudge
            }
        }
    }
}

/// Scenario whose trigger the utterance matches, in configured order.
pub fn triggered_scenario(utterance: &str) -> Option<ScenarioId> {
    scenario::detect(utterance).map(|s| s.id)
}
