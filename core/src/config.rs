//! Engine tuning, read once at startup.

use crate::select::{Budget, SelectionMode};

const MAX_SENTENCES_ENV: &str = "WITNESS_MAX_SENTENCES";
const MAX_REPLY_CHARS_ENV: &str = "WITNESS_MAX_REPLY_CHARS";
const HISTORY_WINDOW_ENV: &str = "WITNESS_HISTORY_WINDOW";
const SEED_ENV: &str = "WITNESS_SEED";
const FLAVOR_PROBABILITY_ENV: &str = "WITNESS_FLAVOR_PROBABILITY";
const DEFENSIVE_PROBABILITY_ENV: &str = "WITNESS_DEFENSIVE_PROBABILITY";

const MAX_SENTENCES_MIN: usize = 1;
const MAX_SENTENCES_MAX: usize = 8;
const MAX_REPLY_CHARS_MIN: usize = 40;
const MAX_REPLY_CHARS_MAX: usize = 2000;
const HISTORY_WINDOW_MIN: usize = 1;
const HISTORY_WINDOW_MAX: usize = 500;

/// Pound thresholds quoted by the topic replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyLimits {
    pub gift: u32,
    pub gift_public_official: u32,
    pub hospitality: u32,
    pub disclosure_threshold: u32,
}

impl Default for PolicyLimits {
    fn default() -> Self {
        Self {
            gift: 50,
            gift_public_official: 25,
            hospitality: 200,
            disclosure_threshold: 25,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub budget: Budget,
    pub max_message_chars: usize,
    pub max_history_chars: usize,
    pub history_window_lines: usize,
    pub flavor_probability: f64,
    pub defensive_probability: f64,
    pub selection: SelectionMode,
    pub limits: PolicyLimits,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            budget: Budget::default(),
            max_message_chars: 2000,
            max_history_chars: 20_000,
            history_window_lines: 40,
            flavor_probability: 0.15,
            defensive_probability: 0.5,
            selection: SelectionMode::Random,
            limits: PolicyLimits::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_raw(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    /// Unparseable values keep the default; numeric values are clamped.
    pub fn from_raw(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let seed = lookup(SEED_ENV).and_then(|raw| raw.trim().parse::<u64>().ok());
        Self {
            budget: Budget {
                max_sentences: parse_usize_with_bounds(
                    lookup(MAX_SENTENCES_ENV),
                    MAX_SENTENCES_MIN,
                    MAX_SENTENCES_MAX,
                    defaults.budget.max_sentences,
                ),
                max_chars: parse_usize_with_bounds(
                    lookup(MAX_REPLY_CHARS_ENV),
                    MAX_REPLY_CHARS_MIN,
                    MAX_REPLY_CHARS_MAX,
                    defaults.budget.max_chars,
                ),
            },
            history_window_lines: parse_usize_with_bounds(
                lookup(HISTORY_WINDOW_ENV),
                HISTORY_WINDOW_MIN,
                HISTORY_WINDOW_MAX,
                defaults.history_window_lines,
            ),
            flavor_probability: parse_probability(
                lookup(FLAVOR_PROBABILITY_ENV),
                defaults.flavor_probability,
            ),
            defensive_probability: parse_probability(
                lookup(DEFENSIVE_PROBABILITY_ENV),
                defaults.defensive_probability,
            ),
            selection: seed.map_or(SelectionMode::Random, SelectionMode::Seeded),
            ..defaults
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            selection: SelectionMode::Seeded(seed),
            ..Self::default()
        }
    }
}

fn parse_usize_with_bounds(raw: Option<String>, min: usize, max: usize, default: usize) -> usize {
    match raw.and_then(|value| value.trim().parse::<usize>().ok()) {
        Some(parsed) => parsed.clamp(min, max),
        None => default,
    }
}

fn parse_probability(raw: Option<String>, default: f64) -> f64 {
    match raw.and_then(|value| value.trim().parse::<f64>().ok()) {
        Some(parsed) if parsed.is_finite() => parsed.clamp(0.0, 1.0),
        _ => default,
    }
}
