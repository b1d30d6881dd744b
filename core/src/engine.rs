//! Per-request pipeline and fault boundary.
//!
//! termination check → closed/restart policy → routing → selection →
//! budget → persona styling. Every step is pure; the only input besides the
//! request is the injected [`Draw`].

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::analysis::{self, Analysis, TurnFacts};
use crate::bank::{self, Bank};
use crate::chat::{ChatRequest, ChatResponse};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::lexicon::{self, GreetingKind, ResponseCategory, Told};
use crate::persona::{self, Persona, StyleConfig};
use crate::scenario;
use crate::select::{Draw, SelectionContext, apply_budget, select};
use crate::slots::{self, Slots};
use crate::stage::DialogueState;
use crate::text::clamp_chars;
use crate::tone;
use crate::transcript::Transcript;

/// Result of one successful turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub reply: String,
    pub category: ResponseCategory,
    /// State after this reply; serialized into the response marker.
    pub state: DialogueState,
    pub analysis: Analysis,
}

pub struct Engine {
    config: EngineConfig,
    draw: Box<dyn Draw>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let draw = config.selection.into_draw();
        Self { config, draw }
    }

    /// Engine with an explicit randomness source, mostly for tests.
    pub fn with_draw(config: EngineConfig, draw: Box<dyn Draw>) -> Self {
        Self { config, draw }
    }

    /// Never panics and never fails: internal faults become
    /// [`ChatResponse::failure`].
    pub fn respond(&self, request: &ChatRequest) -> ChatResponse {
        match catch_unwind(AssertUnwindSafe(|| self.try_respond(request))) {
            Ok(Ok(turn)) => {
                let mut response = ChatResponse::reply(turn.reply, turn.state.is_closed(), turn.state.marker());
                if request.structured {
                    response.analysis = Some(turn.analysis);
                }
                response
            }
            Ok(Err(err)) => {
                tracing::error!(error = %err, "witness turn failed");
                ChatResponse::failure()
            }
            Err(payload) => {
                tracing::error!(panic = panic_message(payload.as_ref()), "witness turn panicked");
                ChatResponse::failure()
            }
        }
    }

    pub fn try_respond(&self, request: &ChatRequest) -> Result<Turn, EngineError> {
        let message = clamp_chars(request.message.trim(), self.config.max_message_chars);
        let persona = Persona::from_request(request.persona.as_deref());
        let transcript = Transcript::parse(
            &request.history,
            self.config.history_window_lines,
            self.config.max_history_chars,
        );
        let state = transcript.infer_state();
        let prior = transcript.prior_line();
        let slots = slots::extract(message);
        let tone = tone::detect(message);

        let category = if message.is_empty() {
            ResponseCategory::Opening
        } else {
            self.classify(message, &slots, &state)
        };

        let ctx = SelectionContext {
            utterance: message,
            prior_line: prior.as_deref(),
            slots: &slots,
            persona,
            limits: &self.config.limits,
        };
        let (rendered, category) = match category {
            ResponseCategory::Narrative { pivot: true, .. } => {
                self.render_with_pivot(category, &state, &ctx)?
            }
            _ => (self.render(&category, &ctx)?, category),
        };
        // Derived from what is actually said, so the marker never records a
        // question the budget cut.
        let next = category.next_state(&state);
        let mut reply = apply_budget(&rendered, &self.config.budget);
        if reply.is_empty() {
            return Err(EngineError::EmptyReply(category.name()));
        }
        if category.is_styled() {
            let style = StyleConfig {
                flavor_probability: self.config.flavor_probability,
                defensive_probability: self.config.defensive_probability,
            };
            reply = persona::style(
                reply,
                tone,
                message,
                &style,
                &self.config.budget,
                self.draw.as_ref(),
            );
        }

        tracing::debug!(
            category = category.name(),
            stage = next.stage.as_str(),
            scenario = next.scenario.as_str(),
            persona = persona.first_name(),
            "witness turn"
        );
        let analysis = analysis::analyze(&TurnFacts {
            persona,
            utterance: message,
            history: &request.history,
            reply: &reply,
            tone,
            slots: &slots,
            limits: &self.config.limits,
            category,
            before: &state,
            after: &next,
        });
        Ok(Turn {
            reply,
            category,
            state: next,
            analysis,
        })
    }

    fn classify(&self, message: &str, slots: &Slots, state: &DialogueState) -> ResponseCategory {
        let triggered = lexicon::triggered_scenario(message);
        let active = triggered.unwrap_or(state.scenario);

        if let Some(resolved) = scenario::check_compliance(message, active) {
            return ResponseCategory::Closing {
                scenario: resolved.id,
            };
        }
        if state.is_closed() {
            return if lexicon::is_restart_command(message) {
                ResponseCategory::Restart
            } else {
                ResponseCategory::ClosedNotice
            };
        }
        if lexicon::is_restart_command(message) {
            return ResponseCategory::Restart;
        }
        lexicon::route(message, slots, state, triggered)
    }

    fn render(&self, category: &ResponseCategory, ctx: &SelectionContext<'_>) -> Result<String, EngineError> {
        let draw = self.draw.as_ref();
        let from = |bank: &Bank| select(bank, ctx, draw);
        match *category {
            ResponseCategory::Opening => from(&bank::OPENING),
            ResponseCategory::Greeting(GreetingKind::Hi) => from(&bank::GREETING_HI),
            ResponseCategory::Greeting(GreetingKind::HowAreYou) => from(&bank::GREETING_HOW_ARE_YOU),
            ResponseCategory::Greeting(GreetingKind::Thanks) => from(&bank::GREETING_THANKS),
            ResponseCategory::Narrative {
                scenario: id, told, ..
            } => {
                let vignette = scenario::get(id);
                match told {
                    Told::Artifact => from(&vignette.artifact),
                    Told::Origin => from(&vignette.origin),
                }
            }
            ResponseCategory::AskWhatShouldIHaveDone => from(&bank::WHAT_SHOULD_I_HAVE_DONE),
            ResponseCategory::AskWhatNowIfOk => from(&bank::WHAT_NOW_IF_OK),
            ResponseCategory::AskForClarity => from(&bank::CLARITY),
            ResponseCategory::AwaitStatement => from(&bank::AWAIT_STATEMENT),
            ResponseCategory::Definition { term } => bank::glossary_entry(term)
                .map(|entry| format!("As I understand it, {} means {}.", entry.term, entry.definition))
                .ok_or_else(|| EngineError::Internal(format!("no glossary entry for '{term}'"))),
            ResponseCategory::Topic(intent) => {
                from(&intent.bank(ctx.utterance, ctx.slots, &self.config.limits))
            }
            ResponseCategory::Nudge => from(&bank::NUDGE),
            ResponseCategory::Closing { scenario: id } => from(&scenario::get(id).closers),
            ResponseCategory::ClosedNotice => from(&bank::CLOSED_NOTICE),
            ResponseCategory::Restart => from(&bank::RESTART),
        }
    }

    /// Narrative line plus the pivot question when both fit the budget. When
    /// they don't, a retold fact gives way to the question alone; a new fact
    /// is told without it and the question waits for a later turn.
    fn render_with_pivot(
        &self,
        category: ResponseCategory,
        state: &DialogueState,
        ctx: &SelectionContext<'_>,
    ) -> Result<(String, ResponseCategory), EngineError> {
        let ResponseCategory::Narrative {
            scenario,
            told,
            switched,
            ..
        } = category
        else {
            return Ok((self.render(&category, ctx)?, category));
        };

        let line = self.render(&category, ctx)?;
        let question = select(&bank::PIVOT, ctx, self.draw.as_ref())?;
        let combined = format!("{line} {question}");
        if self.config.budget.fits(&combined) {
            return Ok((combined, category));
        }

        let retold = !switched
            && scenario == state.scenario
            && match told {
                Told::Artifact => state.facts.artifact,
                Told::Origin => state.facts.origin,
            };
        if retold {
            Ok((question, category))
        } else {
            tracing::debug!(scenario = scenario.as_str(), "pivot deferred by reply budget");
            Ok((
                line,
                ResponseCategory::Narrative {
                    scenario,
                    told,
                    pivot: false,
                    switched,
                },
            ))
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{PolicyPoint, RiskFlag, StageTransition};
    use crate::bank::{CLOSED_NOTICE, FAILURE_ERROR, GREETING_HI, RESTART};
    use crate::scenario::ScenarioId;
    use crate::select::{Budget, DrawKey};
    use crate::stage::ConversationStage;
    use crate::text::{char_len, sentences};

    fn seeded(seed: u64) -> Engine {
        Engine::new(EngineConfig::seeded(seed))
    }

    /// Seeded engine that never appends flavor, so replies are pure bank text.
    fn plain(seed: u64) -> Engine {
        Engine::new(EngineConfig {
            flavor_probability: 0.0,
            defensive_probability: 0.0,
            ..EngineConfig::seeded(seed)
        })
    }

    fn ask(engine: &Engine, message: &str, history: &str) -> ChatResponse {
        engine.respond(&ChatRequest::new(message, history))
    }

    fn state_of(response: &ChatResponse) -> DialogueState {
        DialogueState::parse_marker(response.marker.as_deref().unwrap_or_default())
            .expect("successful replies carry a marker")
    }

    /// Plays a conversation the way the CLI does, echoing markers back.
    struct Session<'a> {
        engine: &'a Engine,
        history: String,
    }

    impl<'a> Session<'a> {
        fn new(engine: &'a Engine) -> Self {
            Self {
                engine,
                history: String::new(),
            }
        }

        fn say(&mut self, message: &str) -> ChatResponse {
            let response = ask(self.engine, message, &self.history);
            self.history.push_str(&format!(
                "Detective: {message}\nBetty: {} {}\n",
                response.reply,
                response.marker.clone().unwrap_or_default()
            ));
            response
        }
    }

    fn assert_within_budget(response: &ChatResponse, budget: &Budget) {
        assert!(response.ok, "{response:?}");
        assert!(!response.reply.is_empty());
        assert!(char_len(&response.reply) <= budget.max_chars, "{}", response.reply);
        assert!(sentences(&response.reply).len() <= budget.max_sentences, "{}", response.reply);
    }

    #[test]
    fn tender_tickets_reply_mentions_declining_during_the_tender() {
        for seed in 0..20 {
            let response = ask(
                &seeded(seed),
                "The supplier offered £180 in football tickets while we're in a live tender",
                "",
            );
            let reply = response.reply.to_lowercase();
            assert!(reply.contains("tender") && reply.contains("decline"), "{reply}");
            assert_eq!(response.done, Some(false));
            let state = state_of(&response);
            assert_eq!(state.scenario, ScenarioId::TicketsTender);
            assert_eq!(state.stage, ConversationStage::DescribedArtifact);
        }
    }

    #[test]
    fn customs_cash_reply_mentions_refusing_and_reporting() {
        for seed in 0..20 {
            let response = ask(&seeded(seed), "customs wants £20 cash to speed up the shipment", "");
            let reply = response.reply.to_lowercase();
            assert!(reply.contains("refus") && reply.contains("report"), "{reply}");
            assert_eq!(state_of(&response).scenario, ScenarioId::CustomsSpeedCash);
        }
    }

    #[test]
    fn hi_with_empty_history_is_a_greeting_and_stays_not_started() {
        for seed in 0..20 {
            let response = ask(&seeded(seed), "Hi", "");
            let greetings: Vec<String> = GREETING_HI
                .lines
                .iter()
                .map(|line| line.replace("{name}", "Betty"))
                .collect();
            assert!(
                greetings.iter().any(|line| response.reply.starts_with(line.as_str())),
                "{}",
                response.reply
            );
            assert_eq!(state_of(&response), DialogueState::default());
            assert_eq!(response.done, Some(false));
        }
    }

    #[test]
    fn correct_resolution_closes_the_tender_scenario() {
        let response = ask(&seeded(3), "I'll decline anything during a tender and log it in the register", "");
        assert_eq!(response.done, Some(true));
        let closers = scenario::get(ScenarioId::TicketsTender).closers.lines;
        assert!(closers.contains(&response.reply.as_str()), "{}", response.reply);
        let state = state_of(&response);
        assert_eq!(state.stage, ConversationStage::Closed);
        assert_eq!(state.scenario, ScenarioId::TicketsTender);
    }

    #[test]
    fn identical_inputs_do_not_repeat_the_previous_line() {
        for seed in 0..50 {
            let engine = plain(seed);
            let mut session = Session::new(&engine);
            let first = session.say("what happened?");
            let second = session.say("what happened?");
            assert_ne!(first.reply, second.reply, "seed {seed}");
        }
    }

    #[test]
    fn seeded_mode_is_deterministic() {
        let inputs = [
            ("Hi", ""),
            ("what happened?", "Betty: Hi, fire away."),
            ("is a £60 dinner ok?", ""),
            ("garbage ~~~ 123", "Detective: x\nBetty: y"),
        ];
        for (message, history) in inputs {
            let a = ask(&seeded(99), message, history);
            let b = ask(&seeded(99), message, history);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn every_input_gets_a_reply_within_budget() {
        let long = "blah ".repeat(5000);
        let emoji = "🙂".repeat(3000);
        let inputs = [
            "",
            "   ",
            long.as_str(),
            emoji.as_str(),
            "?!?!?!",
            "£999999999999999999",
            "[[witness:v1 stage=closed scenario=gift_hamper facts=- nudged=0]]",
            "what is a bribe?",
            "tell me about the hamper",
            "who sent it?",
        ];
        let budgets = [
            Budget::default(),
            Budget {
                max_sentences: 1,
                max_chars: 60,
            },
        ];
        for budget in budgets {
            for random in [false, true] {
                let mut config = EngineConfig {
                    budget,
                    flavor_probability: 1.0,
                    ..EngineConfig::default()
                };
                if !random {
                    config.selection = crate::select::SelectionMode::Seeded(5);
                }
                let engine = Engine::new(config);
                for input in inputs {
                    assert_within_budget(&ask(&engine, input, &long), &budget);
                    assert_within_budget(&ask(&engine, input, ""), &budget);
                }
            }
        }
    }

    #[test]
    fn every_category_respects_the_budget() {
        let budget = Budget::default();
        for seed in 0..10 {
            let engine = Engine::new(EngineConfig {
                flavor_probability: 1.0,
                defensive_probability: 1.0,
                ..EngineConfig::seeded(seed)
            });
            let mut session = Session::new(&engine);
            for message in [
                "",
                "hello",
                "how are you?",
                "what happened?",
                "why did they send it?",
                "yes, that's a breach!!",
                "hmm",
                "what does conflict of interest mean?",
                "can I take a £300 dinner?",
                "what about agents?",
                "When in doubt you should return or donate it",
                "what now?",
                "restart",
            ] {
                assert_within_budget(&session.say(message), &budget);
            }
        }
    }

    #[test]
    fn termination_takes_precedence_at_any_stage() {
        let statement = "Anything over £25 needs a disclosure form, so file it";
        for stage in ConversationStage::ALL {
            let state = DialogueState {
                stage,
                ..DialogueState::default()
            };
            let history = format!("Betty: Hello. {state}");
            let response = ask(&seeded(1), statement, &history);
            assert_eq!(response.done, Some(true), "{stage:?}");
            let closers = scenario::get(ScenarioId::GiftHamper).closers.lines;
            assert!(closers.contains(&response.reply.as_str()), "{}", response.reply);
        }
    }

    #[test]
    fn trainee_lines_cannot_advance_the_interview() {
        let history = "Detective: Did I do something wrong there?\n\
                       Detective: Okay, what should I have done instead?";
        let response = ask(&plain(4), "hmm", history);
        assert_eq!(state_of(&response).stage, ConversationStage::NotStarted);
        assert!(state_of(&response).nudged);
    }

    #[test]
    fn closed_exchange_stays_closed_until_restart() {
        let engine = plain(8);
        let mut session = Session::new(&engine);
        assert!(session.say("When in doubt, return or donate it").is_done());

        let after = session.say("what happened?");
        assert_eq!(after.done, Some(true));
        assert!(CLOSED_NOTICE.lines.contains(&after.reply.as_str()));

        let restarted = session.say("restart");
        assert_eq!(restarted.done, Some(false));
        let fresh_lines: Vec<String> = RESTART.lines.iter().map(|l| l.replace("{name}", "Betty")).collect();
        assert!(fresh_lines.contains(&restarted.reply));
        assert_eq!(state_of(&restarted), DialogueState::default());

        let again = session.say("what happened?");
        assert_eq!(state_of(&again).stage, ConversationStage::DescribedArtifact);
    }

    #[test]
    fn pivot_cut_by_one_sentence_budget_is_not_recorded() {
        let engine = Engine::new(EngineConfig {
            budget: Budget {
                max_sentences: 1,
                max_chars: 240,
            },
            flavor_probability: 0.0,
            defensive_probability: 0.0,
            ..EngineConfig::seeded(1)
        });
        let mut session = Session::new(&engine);
        session.say("what happened?");

        let origin = session.say("who sent it?");
        let told = state_of(&origin);
        assert_eq!(told.stage, ConversationStage::ExplainedOrigin);
        assert!(told.facts.all_told());
        assert!(!bank::PIVOT.lines.iter().any(|q| origin.reply.contains(q)), "{}", origin.reply);

        // Asking again delivers the deferred question on its own.
        let asked = session.say("who sent it?");
        assert_eq!(state_of(&asked).stage, ConversationStage::AskedIfWrong);
        assert!(bank::PIVOT.lines.contains(&asked.reply.as_str()), "{}", asked.reply);
    }

    #[test]
    fn full_interview_reaches_closure_through_markers() {
        let engine = plain(11);
        let mut session = Session::new(&engine);
        assert_eq!(state_of(&session.say("Hi Betty")).stage, ConversationStage::NotStarted);
        assert_eq!(
            state_of(&session.say("Tell me about the hamper")).stage,
            ConversationStage::DescribedArtifact
        );
        let asked = session.say("Who sent it?");
        assert_eq!(state_of(&asked).stage, ConversationStage::AskedIfWrong);
        assert_eq!(
            state_of(&session.say("Yes, I'm afraid it was")).stage,
            ConversationStage::AwaitingComplianceStatement
        );
        let closing = session.say("It was over £25 so you needed to declare it on the disclosure form");
        assert!(closing.is_done());
        assert_eq!(state_of(&closing).stage, ConversationStage::Closed);
    }

    #[test]
    fn empty_message_returns_opening_without_advancing() {
        let closed = DialogueState {
            stage: ConversationStage::Closed,
            ..DialogueState::default()
        };
        let response = ask(&plain(2), "", &format!("Betty: bye {closed}"));
        assert_eq!(response.done, Some(true));
        assert_eq!(state_of(&response), closed);
        assert!(response.reply.starts_with("Hi"));
    }

    #[test]
    fn analysis_is_attached_only_when_requested() {
        let engine = plain(3);
        assert!(ask(&engine, "Tell me about the hamper", "").analysis.is_none());

        let request = ChatRequest {
            structured: true,
            ..ChatRequest::new("Tell me about the hamper", "")
        };
        let response = engine.respond(&request);
        let analysis = response.analysis.expect("structured turns carry an analysis");
        assert_eq!(analysis.persona, "Betty Morales");
        assert_eq!(analysis.suggested_stage_transition, StageTransition::Advance);
        assert!(analysis.risk_flags.contains(&RiskFlag::HighValueGift));
        assert!(analysis.next_questions_for_detective.len() <= 1);
    }

    #[test]
    fn closing_turn_analysis_commits_and_cites_policy() {
        let request = ChatRequest {
            structured: true,
            ..ChatRequest::new("It was over £25 so you needed to declare it on the disclosure form", "")
        };
        let response = plain(5).respond(&request);
        assert!(response.is_done());
        let analysis = response.analysis.expect("structured turns carry an analysis");
        assert_eq!(analysis.suggested_stage_transition, StageTransition::CloseAndCommit);
        assert!(
            analysis
                .policy_points_referenced
                .contains(&PolicyPoint::GiftsOverThresholdRequireDisclosure)
        );
        assert!(analysis.policy_points_referenced.contains(&PolicyPoint::UseDisclosureForm));
    }

    #[test]
    fn freda_persona_introduces_herself() {
        let request = ChatRequest {
            persona: Some("freda".to_string()),
            ..ChatRequest::default()
        };
        for seed in 0..4 {
            let reply = plain(seed).respond(&request).reply;
            assert!(!reply.contains("Betty"), "{reply}");
        }
    }

    struct PanickingDraw;

    impl Draw for PanickingDraw {
        fn pick(&self, _key: &DrawKey<'_>, _len: usize) -> usize {
            panic!("draw exploded")
        }
        fn chance(&self, _key: &DrawKey<'_>, _probability: f64) -> bool {
            panic!("draw exploded")
        }
    }

    #[test]
    fn internal_faults_become_failure_responses() {
        let engine = Engine::with_draw(EngineConfig::default(), Box::new(PanickingDraw));
        let response = ask(&engine, "hello", "");
        assert!(!response.ok);
        assert_eq!(response.error.as_deref(), Some(FAILURE_ERROR));
        assert!(!response.reply.is_empty());
    }
}
