use crate::bank::{Bank, FLAVOR, FLAVOR_DEFENSIVE, FLAVOR_MINIMIZING};
use crate::select::{Budget, Draw, DrawKey};
use crate::text::{char_len, sentences};
use crate::tone::{Stance, Tone};

/// The in-character witness. Both personas share the same scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Persona {
    #[default]
    Betty,
    Freda,
}

impl Persona {
    /// `"Freda"` (any case) selects Freda; anything else is Betty.
    pub fn from_request(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(name) if name.eq_ignore_ascii_case("freda") => Persona::Freda,
            _ => Persona::Betty,
        }
    }

    pub fn first_name(self) -> &'static str {
        match self {
            Persona::Betty => "Betty",
            Persona::Freda => "Freda",
        }
    }

    pub fn full_name(self) -> String {
        format!("{} Morales", self.first_name())
    }

    pub fn role(self) -> &'static str {
        "Sales Executive at Acme Things Ltd."
    }
}

/// Probabilities for the optional flavor fragment.
#[derive(Debug, Clone, Copy)]
pub struct StyleConfig {
    pub flavor_probability: f64,
    pub defensive_probability: f64,
}

/// Append at most one flavor fragment, chosen by the stance the trainee's
/// tone provokes. The fragment is skipped whenever it would break `budget`.
pub fn style(
    text: String,
    tone: Tone,
    utterance: &str,
    config: &StyleConfig,
    budget: &Budget,
    draw: &dyn Draw,
) -> String {
    let (bank, probability): (Bank, f64) = match tone.stance() {
        Stance::Defensive => (FLAVOR_DEFENSIVE, config.defensive_probability),
        Stance::Minimizing => (FLAVOR_MINIMIZING, config.flavor_probability),
        Stance::Curious | Stance::Cooperative => (FLAVOR, config.flavor_probability),
    };
    if bank.is_empty() {
        return text;
    }
    let key = DrawKey {
        bank: bank.name,
        utterance,
        prior_line: &text,
        attempt: 0,
    };
    if !draw.chance(&key, probability) {
        return text;
    }
    let fragment = bank.lines[draw.pick(&key, bank.len()) % bank.len()];

    let fits_sentences = sentences(&text).len() + sentences(fragment).len() <= budget.max_sentences;
    let fits_chars = char_len(&text) + 1 + char_len(fragment) <= budget.max_chars;
    if fits_sentences && fits_chars {
        format!("{text} {fragment}")
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Always;

    impl Draw for Always {
        fn pick(&self, _key: &DrawKey<'_>, _len: usize) -> usize {
            0
        }
        fn chance(&self, _key: &DrawKey<'_>, _probability: f64) -> bool {
            true
        }
    }

    const CONFIG: StyleConfig = StyleConfig {
        flavor_probability: 0.15,
        defensive_probability: 0.5,
    };

    #[test]
    fn persona_selection_is_case_insensitive() {
        assert_eq!(Persona::from_request(Some("FREDA")), Persona::Freda);
        assert_eq!(Persona::from_request(Some("someone")), Persona::Betty);
        assert_eq!(Persona::from_request(None), Persona::Betty);
        assert_eq!(Persona::Freda.full_name(), "Freda Morales");
    }

    #[test]
    fn accusatory_tone_appends_defensive_fragment() {
        let out = style(
            "It arrived Monday.".to_string(),
            Tone::Accusatory,
            "you knew",
            &CONFIG,
            &Budget::default(),
            &Always,
        );
        assert_eq!(out, format!("It arrived Monday. {}", FLAVOR_DEFENSIVE.lines[0]));
    }

    #[test]
    fn fragment_never_breaks_the_budget() {
        let text = "First sentence. Second sentence.".to_string();
        let out = style(text.clone(), Tone::Neutral, "x", &CONFIG, &Budget::default(), &Always);
        assert_eq!(out, text);

        let tight = Budget {
            max_sentences: 3,
            max_chars: 20,
        };
        let out = style("Short line.".to_string(), Tone::Neutral, "x", &CONFIG, &tight, &Always);
        assert_eq!(out, "Short line.");
    }
}
