//! Typed signals pulled out of the trainee's raw utterance.
//!
//! Extraction is total: every field defaults to absent/false and nothing in
//! here can fail. Parsing stays in this module; reply generators only ever
//! see the resulting [`Slots`].

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::text::normalize;

static CURRENCY_AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"£\s?(\d{1,3}(?:,\d{3})+|\d{1,6})(?:\.(\d{1,2}))?")
        .expect("currency amount regex must compile")
});
static UNIT_AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,6})\s*(?:quid|pounds?|gbp)\b").expect("unit amount regex must compile")
});
static HEDGED_AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:about|around|roughly)\s*£?\s?(\d{1,6})\b")
        .expect("hedged amount regex must compile")
});

static TENDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:tenders?|rfps?|bids?|bidding|decision meeting|renewal)\b")
        .expect("tender regex must compile")
});
static PUBLIC_OFFICIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:public officials?|officials?|mayors?|council(?:lors?)?|mps?|soes?|state[- ]?owned|government|ministers?|customs)\b",
    )
    .expect("public official regex must compile")
});
static GIFT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:gifts?|presents?|hampers?|vouchers?|gift cards?|bottles?)\b")
        .expect("gift regex must compile")
});
static HOSPITALITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:hospitality|dinners?|lunch(?:es)?|meals?|tickets?|events?|entertain\w*|drinks)\b",
    )
    .expect("hospitality regex must compile")
});
static TRAVEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:travel\w*|flights?|hotels?|trips?|business[- ]class)\b")
        .expect("travel regex must compile")
});
static THIRD_PARTY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:agents?|intermediar(?:y|ies)|consultants?|distributors?|resellers?|third[- ]part(?:y|ies))\b",
    )
    .expect("third party regex must compile")
});
static FACILITATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:facilitation|speed(?:ing)? (?:up|payments?)|grease payments?|kickbacks?)\b")
        .expect("facilitation regex must compile")
});
static DONATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:donations?|donate|charit\w*|sponsor\w*|community fund|csr)\b")
        .expect("donation regex must compile")
});
static CONFLICT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:conflicts?(?: of interest)?|cousins?|relatives?|family|friends?|personal interest)\b",
    )
    .expect("conflict regex must compile")
});

/// Topic keyword flags; several can be set at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopicFlags {
    pub gift: bool,
    pub hospitality: bool,
    pub travel: bool,
    pub third_party: bool,
    pub facilitation: bool,
    pub donation: bool,
    pub conflict: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Slots {
    /// Whole pounds, rounded.
    pub amount: Option<u32>,
    pub during_tender: bool,
    pub involves_public_official: bool,
    pub topics: TopicFlags,
}

pub fn extract(utterance: &str) -> Slots {
    let text = normalize(utterance);
    Slots {
        amount: extract_amount(&text),
        during_tender: TENDER_RE.is_match(&text),
        involves_public_official: PUBLIC_OFFICIAL_RE.is_match(&text),
        topics: TopicFlags {
            gift: GIFT_RE.is_match(&text),
            hospitality: HOSPITALITY_RE.is_match(&text),
            travel: TRAVEL_RE.is_match(&text),
            third_party: THIRD_PARTY_RE.is_match(&text),
            facilitation: FACILITATION_RE.is_match(&text),
            donation: DONATION_RE.is_match(&text),
            conflict: CONFLICT_RE.is_match(&text),
        },
    }
}

/// Currency symbol first, then "<n> quid/pounds", then hedges. A pattern
/// that matches but does not fit in a `u32` falls through to the next one.
pub fn extract_amount(text: &str) -> Option<u32> {
    CURRENCY_AMOUNT_RE
        .captures(text)
        .and_then(|caps| currency_value(&caps))
        .or_else(|| {
            UNIT_AMOUNT_RE
                .captures(text)
                .and_then(|caps| whole_value(caps.get(1)?.as_str()))
        })
        .or_else(|| {
            HEDGED_AMOUNT_RE
                .captures(text)
                .and_then(|caps| whole_value(caps.get(1)?.as_str()))
        })
}

fn currency_value(caps: &Captures<'_>) -> Option<u32> {
    let whole = caps.get(1)?.as_str().replace(',', "");
    let whole = whole.parse::<u64>().ok()?;
    let fraction = match caps.get(2) {
        Some(pence) => format!("0.{}", pence.as_str()).parse::<f64>().ok()?,
        None => 0.0,
    };
    let rounded = (whole as f64 + fraction).round();
    if rounded > u32::MAX as f64 {
        return None;
    }
    Some(rounded as u32)
}

fn whole_value(raw: &str) -> Option<u32> {
    raw.parse::<u32>().ok()
}
