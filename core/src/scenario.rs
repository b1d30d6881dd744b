//! Authored vignettes and the termination detector.
//!
//! Scenarios are evaluated in table order and the first trigger match wins.
//! Each one also declares the compound condition under which the trainee has
//! stated the correct resolution; [`check_compliance`] runs ahead of routing.

use std::sync::LazyLock;

use regex::Regex;

use crate::bank::Bank;
use crate::text::normalize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScenarioId {
    TicketsTender,
    CustomsSpeedCash,
    AgentOffshore,
    MayorFund,
    HireCousin,
    PromoOfficials,
    BusinessFlights,
    /// The primary interview; active when nothing else has been triggered.
    #[default]
    GiftHamper,
}

impl ScenarioId {
    pub const ALL: [ScenarioId; 8] = [
        ScenarioId::TicketsTender,
        ScenarioId::CustomsSpeedCash,
        ScenarioId::AgentOffshore,
        ScenarioId::MayorFund,
        ScenarioId::HireCousin,
        ScenarioId::PromoOfficials,
        ScenarioId::BusinessFlights,
        ScenarioId::GiftHamper,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ScenarioId::TicketsTender => "tickets_tender",
            ScenarioId::CustomsSpeedCash => "customs_speed_cash",
            ScenarioId::AgentOffshore => "agent_offshore",
            ScenarioId::MayorFund => "mayor_fund",
            ScenarioId::HireCousin => "hire_cousin",
            ScenarioId::PromoOfficials => "promo_officials",
            ScenarioId::BusinessFlights => "business_flights",
            ScenarioId::GiftHamper => "gift_hamper",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.as_str() == raw)
    }
}

// Shared building blocks for compliance clauses.
const REFUSAL: &str = r"\b(?:declin\w*|refus\w*|reject\w*|turn (?:it|them|that|the \w+) down|say no|said no|(?:not|wouldn't|won't|shouldn't|can't|cannot) accept)";
const TENDER_REF: &str = r"\b(?:tenders?|rfps?|bids?|bidding|procurement|award)\b";

struct ScenarioDef {
    id: ScenarioId,
    trigger: &'static str,
    confirm: Option<&'static str>,
    artifact: Bank,
    origin: Bank,
    closers: Bank,
    /// Any clause may fire; every pattern of a clause must match.
    compliance: &'static [&'static [&'static str]],
}

const DEFS: [ScenarioDef; 8] = [
    ScenarioDef {
        id: ScenarioId::TicketsTender,
        trigger: r"\b(?:tickets?|match|football|game|concert)\b",
        confirm: Some(r"\b(?:tenders?|rfps?|bids?|bidding)\b"),
        artifact: Bank::fingerprinted(
            "tickets_tender.artifact",
            &[
                "A supplier offered me two football tickets worth about £180 while we're in a live tender, and I wasn't sure whether to decline.",
                "They're £180 match tickets from a supplier in our current tender, and part of me thinks I'm meant to decline them.",
                "It's a pair of football tickets, roughly £180, offered mid-tender, and I've been wondering whether I should just decline.",
            ],
            r"(?:football|match) tickets",
        ),
        origin: Bank::fingerprinted(
            "tickets_tender.origin",
            &[
                "The account manager at Northgate Supplies offered them on a call, just after we'd asked for their revised bid.",
                "It came from Northgate's account manager, who called it a thank-you for the long relationship while the bid is still open.",
                "Northgate's account manager offered them at the end of a bid clarification meeting last Tuesday.",
            ],
            r"northgate",
        ),
        closers: Bank::fingerprinted(
            "tickets_tender.closing",
            &[
                "Thanks, Detective, that's clear: I'll decline the tickets while the tender is live and note the offer in the G&H Register.",
                "Understood, no hospitality during a tender, so I'll turn the tickets down politely and log the offer.",
                "Got it, I'll decline and suggest a simple coffee after the award, and record the offer in the register.",
            ],
            r"decline the tickets while|turn the tickets down politely|decline and suggest a simple coffee",
        ),
        compliance: &[
            &[REFUSAL, TENDER_REF],
            &[
                r"\b(?:no|avoid|nothing|never)\b.*\b(?:gifts?|hospitality|tickets?)\b.*\b(?:during|while|in)\b.*\b(?:tenders?|rfps?|bids?)\b",
            ],
        ],
    },
    ScenarioDef {
        id: ScenarioId::CustomsSpeedCash,
        trigger: r"\b(?:customs|border|shipments?|port|clearance)\b",
        confirm: Some(r"\b(?:cash|speed|fast|faster|quick|quicker|hurry|tip)\b"),
        artifact: Bank::fingerprinted(
            "customs_speed_cash.artifact",
            &[
                "A customs officer told me £20 cash would speed up our shipment, and I know I'm supposed to refuse and report that, but the client was waiting.",
                "At the border they asked for £20 in cash to clear the shipment faster, and I wasn't sure whether to refuse and report it or just pay.",
                "The officer wanted £20 cash to move our shipment up the queue, and I'm torn between refusing and reporting it and keeping the client happy.",
            ],
            r"£20 (?:in )?cash",
        ),
        origin: Bank::fingerprinted(
            "customs_speed_cash.origin",
            &[
                "It was the duty officer at Felixstowe, and he said the official route could take a week.",
                "The request came from an officer at the Felixstowe customs desk, who said nobody would need a receipt.",
                "A Felixstowe duty officer raised it when I chased the clearance, saying cash was the quick way.",
            ],
            r"felixstowe",
        ),
        closers: Bank::fingerprinted(
            "customs_speed_cash.closing",
            &[
                "Thanks, Detective, I'll refuse any speed payment, ask for the official process and a receipt, and report the request.",
                "Understood, facilitation payments are off limits, so I'll refuse and report it to Compliance within 24 hours.",
                "Clear, I'll say no to the cash, use the official route and report the approach through the proper channel.",
            ],
            r"refuse any speed payment|refuse and report it to compliance|say no to the cash",
        ),
        compliance: &[
            &[
                REFUSAL,
                r"\b(?:report\w*|official (?:process|channel|receipt|route)|receipt|escalat\w*|compliance|speak up|hotline)\b",
            ],
            &[
                r"\bfacilitation payments?\b",
                r"\b(?:prohibited|banned|not allowed|illegal|never pay|don't pay|must not|can't pay|off limits)\b",
            ],
        ],
    },
    ScenarioDef {
        id: ScenarioId::AgentOffshore,
        trigger: r"\b(?:agents?|intermediar(?:y|ies)|consultants?|distributors?)\b",
        confirm: Some(r"(?:\boffshore\b|\bcommissions?\b|\bpercent\b|%)"),
        artifact: Bank::fingerprinted(
            "agent_offshore.artifact",
            &[
                "Our agent in the region wants his 15% commission paid to an offshore company rather than his local business account.",
                "The consultant helping with the licence asked for a 15% commission wired to an offshore entity.",
                "An intermediary on the distribution deal wants 15% commission sent offshore, and he says it's normal there.",
            ],
            r"15% commission",
        ),
        origin: Bank::fingerprinted(
            "agent_offshore.origin",
            &[
                "He goes by Marco and was introduced by the regional director, and he said the offshore route keeps things simple.",
                "Marco, the agent the regional director brought in, asked on a video call and said the paperwork could come later.",
                "It was Marco who raised it, right after the regional director told him the deal was close.",
            ],
            r"\bmarco\b",
        ),
        closers: Bank::fingerprinted(
            "agent_offshore.closing",
            &[
                "Thanks, Detective, I'll pause payments and escalate to Compliance for due diligence before anything moves.",
                "Understood, no offshore payments, so I'll hold off and ask Compliance for due diligence and a transparent contract.",
                "Clear, I'll stop, escalate it and only proceed with proper paperwork, invoices and a compliant contract.",
            ],
            r"pause payments and escalate|hold off and ask compliance|stop, escalate it",
        ),
        compliance: &[
            &[
                r"\b(?:pause|stop|hold off|halt|escalat\w*|refer|flag)\b",
                r"\b(?:due diligence|compliance|transparent contract|proper contract|invoices?)\b",
            ],
            &[r"\b(?:refuse|decline|won't pay|not pay)\b", r"\boffshore\b"],
        ],
    },
    ScenarioDef {
        id: ScenarioId::MayorFund,
        trigger: r"\b(?:mayors?|permits?|council|officials?)\b",
        confirm: Some(
            r"\b(?:community fund|fund|donations?|donate|contributions?|sponsor\w*|2,?000)\b",
        ),
        artifact: Bank::fingerprinted(
            "mayor_fund.artifact",
            &[
                "The mayor asked whether we'd put £2,000 into a community fund while our building permit is still with the council.",
                "While our permit sits with the council, the mayor suggested a £2,000 donation to his community fund.",
                "The mayor's office floated a £2,000 contribution to a community fund just as our permit came up for review.",
            ],
            r"£2,000",
        ),
        origin: Bank::fingerprinted(
            "mayor_fund.origin",
            &[
                "It came from Mayor Hollis directly at the site opening, with his chief of staff standing next to him.",
                "Mayor Hollis raised it himself over lunch and said it would show we're good neighbours.",
                "Mayor Hollis mentioned it twice, once at the site opening and again in a follow-up email.",
            ],
            r"mayor hollis",
        ),
        closers: Bank::fingerprinted(
            "mayor_fund.closing",
            &[
                "Thanks, Detective, I'll decline the request from the mayor and escalate it, and any community support will go through a compliant CSR route.",
                "Understood, we don't fund officials' causes on request, so I'll politely refuse and pass it to Compliance.",
                "Clear, I'll decline, document the request and let Compliance decide whether a transparent CSR donation is possible.",
            ],
            r"decline the request from the mayor|politely refuse and pass it to compliance|decline, document the request",
        ),
        compliance: &[
            &[
                REFUSAL,
                r"\b(?:public officials?|mayor|council|permit|escalat\w*|compliance)\b",
            ],
            &[
                r"\b(?:csr|charitable|community programme|community program|transparent donation)\b",
                r"\b(?:compliance|approv\w*|transparen\w*|escalat\w*)\b",
            ],
        ],
    },
    ScenarioDef {
        id: ScenarioId::HireCousin,
        trigger: r"\b(?:hire|hiring|cousin|relative|nephew|niece|family member|internship|job for)\b",
        confirm: Some(r"\b(?:clients?|customers?)\b"),
        artifact: Bank::fingerprinted(
            "hire_cousin.artifact",
            &[
                "A client asked if we could find a job for his cousin, and hinted it would help with the contract extension.",
                "Our biggest client mentioned his cousin is looking for work and asked if I could get her an interview.",
                "The client suggested we hire his cousin for the summer, and said it would be a nice gesture.",
            ],
            r"\bhis cousin\b",
        ),
        origin: Bank::fingerprinted(
            "hire_cousin.origin",
            &[
                "It was Dev Patel, the procurement lead at Harbour Foods, and he raised it over drinks after the quarterly review.",
                "Dev Patel from Harbour Foods asked, right after we talked about extending the contract.",
                "Dev Patel at Harbour Foods brought it up on the phone and mentioned it again in an email.",
            ],
            r"dev patel",
        ),
        closers: Bank::fingerprinted(
            "hire_cousin.closing",
            &[
                "Thanks, Detective, I'll flag the conflict and route the cousin through normal HR with no preferential treatment.",
                "Understood, I'll declare it and let HR run the usual process, and I'll document the decision.",
                "Clear, there'll be no special treatment, I'll tell HR about the request and keep a record of how it was handled.",
            ],
            r"flag the conflict and route|declare it and let hr|no special treatment, i'll tell hr",
        ),
        compliance: &[
            &[
                r"\b(?:conflict(?: of interest)?|declare|disclose|flag)\b",
                r"\b(?:hr|human resources|normal (?:hiring|recruitment|process)|usual process|no preferential|on merit|fair process)\b",
            ],
            &[r"\bno (?:preferential|special) treatment\b"],
        ],
    },
    ScenarioDef {
        id: ScenarioId::PromoOfficials,
        trigger: r"\b(?:totes?|bags?|swag|promo\w*|souvenirs?|merch\w*|branded)\b",
        confirm: Some(r"\b(?:soes?|state|officials?|delegates?|delegation|public)\b"),
        artifact: Bank::fingerprinted(
            "promo_officials.artifact",
            &[
                "We're handing out branded tote bags to a delegation from a state-owned utility next week, and nobody has checked it.",
                "Marketing packed branded tote bags and souvenirs for the state-owned delegates visiting on Thursday.",
                "I've got a box of branded tote bags ready for the visiting officials from the state-owned energy firm.",
            ],
            r"branded tote bags",
        ),
        origin: Bank::fingerprinted(
            "promo_officials.origin",
            &[
                "Marketing ordered them from our usual supplier, at about £8 each, and the delegation lead is Ms Okafor.",
                "The bags came from marketing's event budget, roughly £8 each, for Ms Okafor's delegation.",
                "Marketing sorted them, about £8 a bag, after Ms Okafor confirmed the delegation's visit.",
            ],
            r"ms okafor",
        ),
        closers: Bank::fingerprinted(
            "promo_officials.closing",
            &[
                "Thanks, Detective, I'll get Compliance pre-approval and keep a simple distribution list for the bags.",
                "Understood, token items only, with pre-approval, and I'll record who receives them.",
                "Clear, I'll check with Compliance first and log the distribution in the register.",
            ],
            r"compliance pre-approval and keep|token items only, with pre-approval|check with compliance first and log",
        ),
        compliance: &[&[
            r"\b(?:pre-?approv\w*|compliance sign-?off|ask compliance|check with compliance)\b",
            r"\b(?:token|modest|distribution list|register|record|log)\b",
        ]],
    },
    ScenarioDef {
        id: ScenarioId::BusinessFlights,
        trigger: r"\b(?:flights?|fly|business[- ]class|first[- ]class|hotels?|travel)\b",
        confirm: Some(
            r"\b(?:business[- ]class|first[- ]class|upgrades?|five[- ]star|5[- ]star|luxury|spouses?|partners?|wife|husband)\b",
        ),
        artifact: Bank::fingerprinted(
            "business_flights.artifact",
            &[
                "The client wants us to fly their two engineers business class to the factory visit, with a five-star hotel on top.",
                "Sales proposed business-class flights and a luxury hotel for the client's team visiting our plant.",
                "We've been asked to book business-class flights for the client's engineers, plus their partners.",
            ],
            r"business-class flights|fly their two engineers business class",
        ),
        origin: Bank::fingerprinted(
            "business_flights.origin",
            &[
                "It was Laura in sales who pitched it, saying the client's CFO expects that level of comfort.",
                "Laura from the sales team put it in the travel request and said it would smooth the renewal.",
                "Laura in sales arranged it after the client's CFO hinted they usually travel that way.",
            ],
            r"\blaura\b",
        ),
        closers: Bank::fingerprinted(
            "business_flights.closing",
            &[
                "Thanks, Detective, I'll keep it to economy, with a real business agenda, company-to-company payment and accurate records.",
                "Understood, no business class, just economy with a bona fide agenda, and we pay the airline directly.",
                "Clear, I'll rebook in economy and get the trip approved with a proper agenda on file.",
            ],
            r"keep it to economy|no business class, just economy|rebook in economy",
        ),
        compliance: &[
            &[
                r"\beconomy\b",
                r"\b(?:business (?:agenda|purpose|reason)|bona fide|company[- ]to[- ]company|pay (?:the )?(?:airline|hotel) directly|accurate records?|approv\w*)\b",
            ],
            &[REFUSAL, r"\bbusiness[- ]class\b"],
        ],
    },
    ScenarioDef {
        id: ScenarioId::GiftHamper,
        trigger: r"\b(?:hampers?|rioja|wine)\b",
        confirm: None,
        artifact: Bank::fingerprinted(
            "gift_hamper.artifact",
            &[
                "It's a luxury food and wine hamper, roughly £150 to £220.",
                "A premium hamper with wine, about £150 to £220.",
                "A high-end hamper with wine, around £150 to £220.",
            ],
            r"luxury food and wine hamper|premium hamper|high-end hamper",
        ),
        origin: Bank::fingerprinted(
            "gift_hamper.origin",
            &[
                "ClientCo sent it via Raj, two weeks before the renewal meeting, and the card mentioned locking in the renewal.",
                "Raj at ClientCo arranged it, and the note thanked me and mentioned locking in the renewal.",
                "It came from ClientCo, Raj set it up, and it turned up a fortnight before the renewal meeting with a card about locking in the renewal.",
            ],
            r"locking in the renewal",
        ),
        closers: Bank::fingerprinted(
            "gift_hamper.closing",
            &[
                "Thanks, Detective, that's clear: I'll file the disclosure, donate the hamper and keep my manager in the loop.",
                "Appreciate the guidance, I'll disclose it today and arrange a donation so there's no perception of influence.",
                "Understood, I'll submit the form, log it properly and make sure my manager is notified.",
                "Thanks for setting that out plainly, I'll record it, donate the hamper and follow the ABC rules going forward.",
            ],
            r"file the disclosure, donate the hamper|disclose it today and arrange a donation|submit the form, log it properly|record it, donate the hamper",
        ),
        compliance: &[
            &[
                r"\b(?:over|above|greater than|more than|exceeds?)\s*£?\s*25\b",
                r"\b(?:disclos\w*|form|pre-?approv\w*|register|declare)\b",
            ],
            &[
                r"\b(?:gifts?|hampers?)\b.*\b(?:tenders?|rfps?|bids?|decisions?|renewal)\b",
                r"\b(?:not allowed|isn't allowed|not permitted|prohibited|can't keep|cannot keep|shouldn't keep|should not keep|not acceptable|not ok)\b",
            ],
            &[
                r"\b(?:return|donate|give (?:it )?to charity)\b",
                r"\b(?:when in doubt|if unsure|if in doubt|not sure|avoid (?:any )?(?:influence|perception|appearance)|appearance of influence)\b",
            ],
            &[
                r"\b(?:file|submit|complete|fill in)\b.*\b(?:disclosure|form)\b",
                r"\b(?:return|donate|charity)\b",
            ],
            &[
                r"\b(?:tell|notify|inform|let)\b.*\b(?:manager|line manager|boss)\b",
                r"\b(?:disclos\w*|return|donate|register|declare)\b",
            ],
        ],
    },
];

static NEGATED_RESOLUTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:don't|do not|didn't|did not|haven't|have not|hasn't|has not|never did|never|wouldn't|would not|won't|will not|shouldn't|should not|no need to|not)\s+(?:\w+\s+){0,2}(?:declin\w*|refus\w*|report\w*|disclos\w*|escalat\w*|return|donate|log|record|flag|declare|pause)\b",
    )
    .expect("negated resolution regex must compile")
});
static PURE_QUESTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:should|shouldn't|would|wouldn't|could|can|do|does|did|is|are|am|was|were|what|why|how|who|when|where|will|must)\b.*\?\s*$",
    )
    .expect("question regex must compile")
});

/// First-person or directive commitment; lets a statement with a trailing
/// tag question ("..., right?") still count.
static DECLARATIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:i'll|i will|i'd|i would|i'm going to|i am going to|we'll|we will|we'd|we would|you should|you must|you need to|you have to|you'd have to|you'd need to|the right (?:thing|move|answer) (?:is|was|would be))\b",
    )
    .expect("declarative regex must compile")
});

/// A question that does not also commit to a course of action.
fn is_question(normalized: &str) -> bool {
    PURE_QUESTION_RE.is_match(normalized)
        || (normalized.trim_end().ends_with('?') && !DECLARATIVE_RE.is_match(normalized))
}

/// A compiled scenario. Obtain them through [`scenarios`] or [`get`].
pub struct Scenario {
    pub id: ScenarioId,
    pub artifact: Bank,
    pub origin: Bank,
    pub closers: Bank,
    trigger: Regex,
    confirm: Option<Regex>,
    artifact_fingerprint: Regex,
    origin_fingerprint: Regex,
    closing_fingerprint: Regex,
    compliance: Vec<Vec<Regex>>,
}

impl Scenario {
    fn compile(def: &ScenarioDef) -> Self {
        Self {
            id: def.id,
            artifact: def.artifact,
            origin: def.origin,
            closers: def.closers,
            trigger: case_insensitive(def.trigger),
            confirm: def.confirm.map(case_insensitive),
            artifact_fingerprint: fingerprint_of(&def.artifact),
            origin_fingerprint: fingerprint_of(&def.origin),
            closing_fingerprint: fingerprint_of(&def.closers),
            compliance: def
                .compliance
                .iter()
                .map(|clause| clause.iter().copied().map(case_insensitive).collect())
                .collect(),
        }
    }

    /// Primary pattern AND, if declared, the confirming pattern.
    pub fn is_triggered_by(&self, normalized: &str) -> bool {
        self.trigger.is_match(normalized)
            && self
                .confirm
                .as_ref()
                .is_none_or(|confirm| confirm.is_match(normalized))
    }

    fn is_resolved_by(&self, normalized: &str) -> bool {
        self.compliance
            .iter()
            .any(|clause| clause.iter().all(|pattern| pattern.is_match(normalized)))
    }

    pub fn told_artifact(&self, line: &str) -> bool {
        self.artifact_fingerprint.is_match(line)
    }

    pub fn told_origin(&self, line: &str) -> bool {
        self.origin_fingerprint.is_match(line)
    }

    pub fn closed_in(&self, line: &str) -> bool {
        self.closing_fingerprint.is_match(line)
    }
}

fn case_insensitive(pattern: &str) -> Regex {
    Regex::new(&format!("(?i){pattern}")).expect("scenario pattern must compile")
}

fn fingerprint_of(bank: &Bank) -> Regex {
    case_insensitive(bank.fingerprint.expect("scenario banks carry fingerprints"))
}

static SCENARIOS: LazyLock<Vec<Scenario>> =
    LazyLock::new(|| DEFS.iter().map(Scenario::compile).collect());

/// All scenarios in trigger-evaluation order.
pub fn scenarios() -> &'static [Scenario] {
    &SCENARIOS
}

pub fn get(id: ScenarioId) -> &'static Scenario {
    // DEFS is laid out in `ScenarioId::ALL` order.
    &SCENARIOS[id as usize]
}

/// First scenario (in configured order) whose trigger matches.
pub fn detect(utterance: &str) -> Option<&'static Scenario> {
    let normalized = normalize(utterance);
    scenarios()
        .iter()
        .find(|scenario| scenario.is_triggered_by(&normalized))
}

/// Termination detector. The active scenario is checked first, then the rest
/// in configured order. Negated statements and pure questions never close.
pub fn check_compliance(utterance: &str, active: ScenarioId) -> Option<&'static Scenario> {
    let normalized = normalize(utterance);
    if normalized.is_empty()
        || NEGATED_RESOLUTION_RE.is_match(&normalized)
        || is_question(&normalized)
    {
        return None;
    }

    let first = get(active);
    if first.is_resolved_by(&normalized) {
        return Some(first);
    }
    scenarios()
        .iter()
        .filter(|scenario| scenario.id != active)
        .find(|scenario| scenario.is_resolved_by(&normalized))
}
