//! Structured read-out of a turn for authoring tools: the trainee's tone, the
//! witness's stance, which policy points the exchange touched, the risks in
//! play and where the interview is heading.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::PolicyLimits;
use crate::lexicon::ResponseCategory;
use crate::persona::Persona;
use crate::scenario::ScenarioId;
use crate::slots::Slots;
use crate::stage::{ConversationStage, DialogueState};
use crate::text::normalize;
use crate::tone::{Stance, Tone};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PolicyPoint {
    GiftsOverThresholdRequireDisclosure,
    GiftsTiedToDecisionsProhibited,
    UseDisclosureForm,
    ReturnOrDonateWhenInDoubt,
    NotifyManager,
    FacilitationPaymentsProhibited,
    PublicOfficialsTokenOnly,
    ThirdPartyDueDiligence,
    DeclareConflicts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RiskFlag {
    HighValueGift,
    NearDecisionTiming,
    ExplicitIntentCard,
    NoDisclosureFiled,
    HospitalityDuringTender,
    FacilitationPayment,
    OffshoreCommission,
    PublicOfficial,
    DonationLinkedToPermit,
    PreferentialHiring,
    LavishTravel,
    OverLimitAmount,
    AppearanceOfInfluence,
    AcceptanceWithoutApproval,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StageTransition {
    Stay,
    Advance,
    EscalateToPolicyCoaching,
    CloseAndCommit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Analysis {
    pub persona: String,
    pub tone_detected: Tone,
    pub stance: Stance,
    pub policy_points_referenced: Vec<PolicyPoint>,
    pub risk_flags: Vec<RiskFlag>,
    /// At most one.
    pub next_questions_for_detective: Vec<String>,
    pub suggested_stage_transition: StageTransition,
}

/// Everything [`analyze`] reads from a finished turn.
pub struct TurnFacts<'a> {
    pub persona: Persona,
    pub utterance: &'a str,
    pub history: &'a str,
    pub reply: &'a str,
    pub tone: Tone,
    pub slots: &'a Slots,
    pub limits: &'a PolicyLimits,
    pub category: ResponseCategory,
    pub before: &'a DialogueState,
    pub after: &'a DialogueState,
}

static POLICY_POINT_RES: LazyLock<Vec<(PolicyPoint, Regex)>> = LazyLock::new(|| {
    [
        (
            PolicyPoint::GiftsOverThresholdRequireDisclosure,
            r"(?:£\s*25\b|\b25 (?:pounds|quid)\b|\btwenty[- ]?five\b|\bover (?:the )?(?:limit|threshold)\b)",
        ),
        (
            PolicyPoint::GiftsTiedToDecisionsProhibited,
            r"\b(?:renewal|decisions?|approval meeting|tenders?|rfps?|bids?)\b",
        ),
        (PolicyPoint::UseDisclosureForm, r"\b(?:disclos\w*|form|register|declare)\b"),
        (PolicyPoint::ReturnOrDonateWhenInDoubt, r"\b(?:return\w*|donat\w*)\b"),
        (PolicyPoint::NotifyManager, r"\b(?:notify|manager|line manager)\b"),
        (
            PolicyPoint::FacilitationPaymentsProhibited,
            r"\b(?:facilitation payments?|speed (?:up )?payments?|grease)\b",
        ),
        (
            PolicyPoint::PublicOfficialsTokenOnly,
            r"\b(?:public officials?|mayor|council|token)\b",
        ),
        (
            PolicyPoint::ThirdPartyDueDiligence,
            r"\b(?:due diligence|agents?|intermediar\w*|commissions?)\b",
        ),
        (PolicyPoint::DeclareConflicts, r"\bconflicts? of interest\b"),
    ]
    .into_iter()
    .map(|(point, pattern)| {
        let re = Regex::new(pattern).expect("policy point regex must compile");
        (point, re)
    })
    .collect()
});

static INFLUENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:influenc\w*|lock(?:ing)? in|win\w* .*renewal|secure .*deal)\b")
        .expect("influence regex must compile")
});
static KEEP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:keep|kept|accept\w*|take|took)\b").expect("keep regex must compile")
});
static COOPERATIVE_HISTORY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:disclos\w*|over\s*£?\s*25|return|donate|manager)\b")
        .expect("cooperative history regex must compile")
});
static QUESTION_START_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:what|why|how|who|where|when|can|may|should|could|do|does|did|is|are|am)\b")
        .expect("question start regex must compile")
});

/// Policy points named by `text`, in a fixed order.
pub fn policy_points(text: &str) -> Vec<PolicyPoint> {
    let text = normalize(text);
    POLICY_POINT_RES
        .iter()
        .filter(|(_, re)| re.is_match(&text))
        .map(|(point, _)| *point)
        .collect()
}

/// Stance for the read-out. Once the transcript shows the trainee steering
/// towards disclosure or return, only an accusatory tone keeps the witness
/// defensive.
pub fn stance(tone: Tone, history: &str) -> Stance {
    let stance = tone.stance();
    if stance != Stance::Defensive && COOPERATIVE_HISTORY_RE.is_match(&normalize(history)) {
        Stance::Cooperative
    } else {
        stance
    }
}

fn scenario_risks(id: ScenarioId) -> &'static [RiskFlag] {
    match id {
        ScenarioId::GiftHamper => &[
            RiskFlag::HighValueGift,
            RiskFlag::NearDecisionTiming,
            RiskFlag::ExplicitIntentCard,
            RiskFlag::NoDisclosureFiled,
        ],
        ScenarioId::TicketsTender => &[RiskFlag::HospitalityDuringTender, RiskFlag::NearDecisionTiming],
        ScenarioId::CustomsSpeedCash => &[RiskFlag::FacilitationPayment, RiskFlag::PublicOfficial],
        ScenarioId::AgentOffshore => &[RiskFlag::OffshoreCommission],
        ScenarioId::MayorFund => &[RiskFlag::PublicOfficial, RiskFlag::DonationLinkedToPermit],
        ScenarioId::HireCousin => &[RiskFlag::PreferentialHiring],
        ScenarioId::PromoOfficials => &[RiskFlag::PublicOfficial],
        ScenarioId::BusinessFlights => &[RiskFlag::LavishTravel],
    }
}

pub fn risk_flags(facts: &TurnFacts<'_>) -> Vec<RiskFlag> {
    let mut flags = Vec::new();
    if facts.after.stage > ConversationStage::NotStarted {
        flags.extend_from_slice(scenario_risks(facts.after.scenario));
    }

    let text = normalize(facts.utterance);
    let slots = facts.slots;
    let limit = if slots.involves_public_official {
        facts.limits.gift_public_official
    } else {
        facts.limits.gift
    };
    if slots.amount.is_some_and(|amount| amount > limit) {
        flags.push(RiskFlag::OverLimitAmount);
    }
    if slots.involves_public_official {
        flags.push(RiskFlag::PublicOfficial);
    }
    if slots.during_tender {
        flags.push(RiskFlag::NearDecisionTiming);
    }
    if INFLUENCE_RE.is_match(&text) {
        flags.push(RiskFlag::AppearanceOfInfluence);
    }
    if KEEP_RE.is_match(&text) && (slots.topics.gift || slots.topics.hospitality) {
        flags.push(RiskFlag::AcceptanceWithoutApproval);
    }

    flags.sort();
    flags.dedup();
    flags
}

fn next_question(facts: &TurnFacts<'_>) -> Option<&'static str> {
    let text = normalize(facts.utterance);
    let asked = text.trim_end().ends_with('?') || QUESTION_START_RE.is_match(&text);
    if !asked {
        return None;
    }
    match facts.after.stage {
        ConversationStage::DescribedArtifact if !facts.after.facts.origin => {
            Some("Do you want to know who it came from?")
        }
        ConversationStage::ExplainedOrigin => Some("Do you want to know whether I think I did anything wrong?"),
        ConversationStage::AwaitingComplianceStatement => Some("What should I do now to put this right?"),
        _ => None,
    }
}

fn transition(facts: &TurnFacts<'_>) -> StageTransition {
    match facts.category {
        ResponseCategory::Closing { .. } => StageTransition::CloseAndCommit,
        ResponseCategory::AskWhatShouldIHaveDone => StageTransition::EscalateToPolicyCoaching,
        ResponseCategory::Narrative { switched: true, .. } => StageTransition::Advance,
        _ if facts.after.stage > facts.before.stage => StageTransition::Advance,
        _ => StageTransition::Stay,
    }
}

pub fn analyze(facts: &TurnFacts<'_>) -> Analysis {
    let mut points = policy_points(facts.utterance);
    points.extend(policy_points(facts.reply));
    points.sort();
    points.dedup();

    Analysis {
        persona: facts.persona.full_name(),
        tone_detected: facts.tone,
        stance: stance(facts.tone, facts.history),
        policy_points_referenced: points,
        risk_flags: risk_flags(facts),
        next_questions_for_detective: next_question(facts).map(str::to_string).into_iter().collect(),
        suggested_stage_transition: transition(facts),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slots::extract;
    use crate::tone::detect;

    fn facts<'a>(
        utterance: &'a str,
        slots: &'a Slots,
        limits: &'a PolicyLimits,
        category: ResponseCategory,
        before: &'a DialogueState,
        after: &'a DialogueState,
    ) -> TurnFacts<'a> {
        TurnFacts {
            persona: Persona::Betty,
            utterance,
            history: "",
            reply: "",
            tone: detect(utterance),
            slots,
            limits,
            category,
            before,
            after,
        }
    }

    #[test]
    fn policy_points_follow_the_wording() {
        assert_eq!(
            policy_points("It was over £25 so file the disclosure form and tell your manager"),
            vec![
                PolicyPoint::GiftsOverThresholdRequireDisclosure,
                PolicyPoint::UseDisclosureForm,
                PolicyPoint::NotifyManager,
            ]
        );
        assert_eq!(
            policy_points("That's a facilitation payment, don't pay the customs officer"),
            vec![PolicyPoint::FacilitationPaymentsProhibited]
        );
        assert!(policy_points("hello there").is_empty());
    }

    #[test]
    fn stance_turns_cooperative_once_disclosure_is_on_the_table() {
        assert_eq!(stance(Tone::Neutral, ""), Stance::Curious);
        assert_eq!(stance(Tone::Neutral, "Detective: you should disclose it"), Stance::Cooperative);
        assert_eq!(stance(Tone::Accusatory, "Detective: disclose it"), Stance::Defensive);
    }

    #[test]
    fn risk_flags_combine_scenario_and_utterance() {
        let utterance = "Would you keep a £300 gift from the mayor?";
        let slots = extract(utterance);
        let limits = PolicyLimits::default();
        let before = DialogueState::fresh(ScenarioId::MayorFund);
        let after = DialogueState {
            stage: ConversationStage::DescribedArtifact,
            ..before
        };
        let flags = risk_flags(&facts(
            utterance,
            &slots,
            &limits,
            ResponseCategory::Nudge,
            &before,
            &after,
        ));
        assert!(flags.contains(&RiskFlag::DonationLinkedToPermit));
        assert!(flags.contains(&RiskFlag::OverLimitAmount));
        assert!(flags.contains(&RiskFlag::AcceptanceWithoutApproval));
        assert_eq!(flags.iter().filter(|f| **f == RiskFlag::PublicOfficial).count(), 1);
    }

    #[test]
    fn no_scenario_risks_before_the_interview_starts() {
        let slots = Slots::default();
        let limits = PolicyLimits::default();
        let state = DialogueState::default();
        let analysis = analyze(&facts(
            "hi",
            &slots,
            &limits,
            ResponseCategory::Opening,
            &state,
            &state,
        ));
        assert!(analysis.risk_flags.is_empty());
        assert_eq!(analysis.suggested_stage_transition, StageTransition::Stay);
        assert!(analysis.next_questions_for_detective.is_empty());
        assert_eq!(analysis.persona, "Betty Morales");
    }

    #[test]
    fn transitions_track_the_category_and_stage() {
        let slots = Slots::default();
        let limits = PolicyLimits::default();
        let before = DialogueState::default();
        let told = DialogueState {
            stage: ConversationStage::DescribedArtifact,
            ..before
        };
        let advancing = facts(
            "what happened?",
            &slots,
            &limits,
            ResponseCategory::Nudge,
            &before,
            &told,
        );
        assert_eq!(transition(&advancing), StageTransition::Advance);
        assert_eq!(
            next_question(&advancing),
            Some("Do you want to know who it came from?")
        );

        let closing = facts(
            "I'd disclose it",
            &slots,
            &limits,
            ResponseCategory::Closing {
                scenario: ScenarioId::GiftHamper,
            },
            &before,
            &before,
        );
        assert_eq!(transition(&closing), StageTransition::CloseAndCommit);
    }
}
