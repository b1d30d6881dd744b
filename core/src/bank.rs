//! Authored phrase banks.
//!
//! Wording here is configuration data. Each bank that the transcript
//! inferencer relies on carries a fingerprint: a case-insensitive pattern
//! that every line of the bank matches, so the engine can recognize its own
//! earlier output in a transcript that has no stage marker.

/// A named set of interchangeable lines for one response category.
#[derive(Debug, Clone, Copy)]
pub struct Bank {
    pub name: &'static str,
    pub lines: &'static [&'static str],
    pub fingerprint: Option<&'static str>,
}

impl Bank {
    pub const fn new(name: &'static str, lines: &'static [&'static str]) -> Self {
        Self {
            name,
            lines,
            fingerprint: None,
        }
    }

    pub const fn fingerprinted(
        name: &'static str,
        lines: &'static [&'static str],
        fingerprint: &'static str,
    ) -> Self {
        Self {
            name,
            lines,
            fingerprint: Some(fingerprint),
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

// Placeholders: {name}, {amount}, {gift_limit}, {gift_official_limit},
// {hospitality_limit}, {disclosure_threshold}.

pub const OPENING: Bank = Bank::new(
    "opening",
    &[
        "Hi, I'm {name} from Acme, ask me about gifts, hospitality or ABC.",
        "Hi Detective, {name} here, how can I help?",
    ],
);

pub const GREETING_HI: Bank = Bank::new(
    "greeting_hi",
    &[
        "Hi Detective, {name} here, how can I help?",
        "Hello, what would you like to know?",
        "Hi, ready when you are.",
        "Hello, happy to chat.",
        "Hi, fire away.",
    ],
);

pub const GREETING_HOW_ARE_YOU: Bank = Bank::new(
    "greeting_how_are_you",
    &[
        "I'm well, thanks, what would you like to know?",
        "Doing fine, how can I help today?",
        "Good, thank you, what should we cover first?",
        "All good, what's your question?",
    ],
);

pub const GREETING_THANKS: Bank = Bank::new(
    "greeting_thanks",
    &[
        "You're welcome, anything else you need?",
        "No problem, happy to help.",
        "Glad to help, what next?",
    ],
);

pub const PIVOT: Bank = Bank::fingerprinted(
    "pivot",
    &[
        "Did I do something wrong there?",
        "Does that sound like I breached the rules?",
        "Would that be a problem under ABC?",
        "Would that count as a breach?",
        "Is that against our policy?",
        "Was that the wrong call?",
        "Did that cross a line?",
        "Would Compliance see that as an issue?",
    ],
    r"did i do something wrong|breached the rules|a problem under abc|count as a breach|against our policy\?|the wrong call|cross a line|compliance see that as an issue",
);

pub const WHAT_SHOULD_I_HAVE_DONE: Bank = Bank::fingerprinted(
    "what_should_i_have_done",
    &[
        "Okay, what should I have done instead?",
        "Right, what would have been the correct step?",
        "Understood, how should I have handled it?",
        "Fair point, what was the proper process?",
        "Okay, what's the right way to deal with this?",
    ],
    r"what should i have done|the correct step|how should i have handled|the proper process\?|right way to deal with this",
);

pub const WHAT_NOW_IF_OK: Bank = Bank::new(
    "what_now_if_ok",
    &[
        "Do you still want me to disclose or log it?",
        "Should I record it just to be safe?",
        "Do you want me to note it in the register?",
        "Shall I tell my manager anyway?",
    ],
);

pub const CLARITY: Bank = Bank::new(
    "clarity",
    &[
        "Could you say which part conflicts with ABC?",
        "Which rule does this touch, the value, the timing or the intent?",
        "What's the policy concern exactly?",
        "Is the issue the timing, the value or who it came from?",
    ],
);

pub const AWAIT_STATEMENT: Bank = Bank::new(
    "await_statement",
    &[
        "What does ABC actually require me to do here?",
        "So what's the rule I should follow, and what do I do now?",
        "Can you spell out what I'm meant to do?",
    ],
);

pub const NUDGE: Bank = Bank::fingerprinted(
    "nudge",
    &[
        "Shall I start with who it came from?",
        "Would you like the value first?",
        "Shall I give you the timing?",
        "Do you want me to walk you through what happened?",
    ],
    r"shall i start with who it came from|would you like the value first|shall i give you the timing|walk you through what happened\?",
);

pub const CLOSED_NOTICE: Bank = Bank::new(
    "closed_notice",
    &[
        "We've wrapped this one up, Detective, so type restart if you'd like to go again.",
        "I think we've covered everything I need, so say restart to run it again.",
    ],
);

pub const RESTART: Bank = Bank::fingerprinted(
    "restart",
    &[
        "Sure, let's start again from the top, {name} here, what would you like to know?",
        "No problem, fresh start, what would you like to ask me?",
    ],
    r"let's start again from the top|no problem, fresh start",
);

pub const FAILURE_REPLY: &str =
    "Sorry, Detective, I lost my train of thought, could you say that again?";
pub const FAILURE_ERROR: &str = "Server error processing your message.";

// --- general topic intents -------------------------------------------------

pub const TENDER_DECLINE: Bank = Bank::new(
    "tender_decline",
    &[
        "I'd decline anything during a live tender and explain our policy.",
        "During a tender we avoid gifts and hospitality altogether, and we can revisit after the award.",
    ],
);

pub const CASH_GIFT: Bank = Bank::new(
    "cash_gift",
    &[
        "Cash or cash-equivalent gifts like vouchers are prohibited.",
        "Anything that works like cash, vouchers included, is a straight no under our policy.",
    ],
);

pub const OFFICIAL_GIFT: Bank = Bank::new(
    "official_gift",
    &[
        "With public officials we stick to token items only, up to £{gift_official_limit}, with Compliance pre-approval and a record in the register.",
        "Anything for a public official needs Compliance pre-approval first, and we keep it to token items under £{gift_official_limit}.",
    ],
);

pub const GIFT_OVER_LIMIT: Bank = Bank::new(
    "gift_over_limit",
    &[
        "At £{amount} that's over the gift limit, since we keep single gifts to £{gift_limit} or less and log them.",
        "£{amount} is above our £{gift_limit} gift limit, so it would need declining or disclosing.",
    ],
);

pub const GIFT_DISCLOSE: Bank = Bank::new(
    "gift_disclose",
    &[
        "At £{amount} it's within the gift limit, but anything over £{disclosure_threshold} still goes on the disclosure form.",
        "£{amount} is under the £{gift_limit} cap, though it's over £{disclosure_threshold} so it needs disclosing.",
    ],
);

pub const GIFT_GENERAL: Bank = Bank::new(
    "gift_general",
    &[
        "If it's modest and not during a tender, I'd accept only within limits, up to £{gift_limit} per person, and log it in the G&H Register.",
        "Modest gifts are fine within the £{gift_limit} limit, as long as they're logged and not tied to a decision.",
    ],
);

pub const OFFICIAL_HOSPITALITY: Bank = Bank::new(
    "official_hospitality",
    &[
        "Hospitality for public officials needs Compliance pre-approval and has to be modest and recorded.",
        "If an official is involved, even a modest meal needs pre-approval from Compliance first.",
    ],
);

pub const HOSPITALITY_OVER_LIMIT: Bank = Bank::new(
    "hospitality_over_limit",
    &[
        "At £{amount} a head that looks lavish, as we cap hospitality at £{hospitality_limit} per person per event.",
        "£{amount} is over our £{hospitality_limit} per person hospitality cap, so I'd scale it back.",
    ],
);

pub const HOSPITALITY_GENERAL: Bank = Bank::new(
    "hospitality_general",
    &[
        "Reasonable hospitality up to £{hospitality_limit} per person is fine if there's a genuine business purpose and it's logged.",
        "Dinners can be pre-approved as hospitality, as long as they're modest and recorded.",
    ],
);

pub const PUBLIC_OFFICIALS: Bank = Bank::new(
    "public_officials",
    &[
        "With public officials we're stricter: token items only, up to £{gift_official_limit}, and Compliance signs off first.",
        "Anything involving a public official goes to Compliance before we offer it, and it stays token-sized.",
    ],
);

pub const FACILITATION: Bank = Bank::new(
    "facilitation",
    &[
        "Facilitation payments are banned, and only in a safety emergency would we pay the minimum and report within 24 hours.",
        "Small speed-up payments to officials are still bribes under our policy, so they're a no.",
    ],
);

pub const THIRD_PARTIES: Bank = Bank::new(
    "third_parties",
    &[
        "Agents and consultants need risk-based due diligence before we engage them.",
        "Third parties acting for us need due diligence, a transparent contract and proper invoices.",
    ],
);

pub const REGISTER: Bank = Bank::new(
    "register",
    &[
        "Gifts and hospitality given or received go in the G&H Register, and I try to log them the same week.",
        "The register is where we record gifts and hospitality, both given and received.",
    ],
);

pub const TRAVEL: Bank = Bank::new(
    "travel",
    &[
        "Client travel needs a bona fide agenda, economy fares, payment to the provider and accurate records.",
        "Travel for clients has to have a real business purpose, standard fares and approval.",
    ],
);

pub const OFFICIAL_DONATION: Bank = Bank::new(
    "official_donation",
    &[
        "Donations linked to public officials need escalation, and any community support goes through a compliant CSR route.",
        "If an official is asking for a donation, that goes straight to Compliance rather than being agreed on the spot.",
    ],
);

pub const DONATIONS: Bank = Bank::new(
    "donations",
    &[
        "Charitable donations go through the CSR process with Compliance sign-off, never as a favour for a deal.",
        "We can support good causes, but only through the CSR route and never tied to business.",
    ],
);

pub const CONFLICTS: Bank = Bank::new(
    "conflicts",
    &[
        "If there's a personal interest I'd declare it and step back from the decision.",
        "Conflicts of interest get declared to my manager and recorded, with no preferential treatment.",
    ],
);

// --- persona flavor --------------------------------------------------------

pub const FLAVOR: Bank = Bank::new(
    "flavor",
    &[
        "Honestly, it's been a hectic quarter.",
        "I'd rather get this right.",
        "I'm glad we're talking it through.",
    ],
);

pub const FLAVOR_DEFENSIVE: Bank = Bank::new(
    "flavor_defensive",
    &[
        "I wasn't trying to hide anything, for what it's worth.",
        "I'm not trying to dodge anything here.",
    ],
);

pub const FLAVOR_MINIMIZING: Bank = Bank::new(
    "flavor_minimizing",
    &["It didn't feel like a big deal at the time."],
);

// --- glossary --------------------------------------------------------------

pub struct GlossaryEntry {
    pub term: &'static str,
    pub definition: &'static str,
}

/// Longer terms first so "public official" wins over "official"-style overlap.
pub const GLOSSARY: &[GlossaryEntry] = &[
    GlossaryEntry {
        term: "gifts and hospitality register",
        definition: "the record of gifts or hospitality provided or received",
    },
    GlossaryEntry {
        term: "third party intermediary",
        definition: "an agent, distributor, reseller or consultant acting for Acme",
    },
    GlossaryEntry {
        term: "facilitation payment",
        definition: "a small unofficial payment to speed up routine actions, which is prohibited",
    },
    GlossaryEntry {
        term: "conflict of interest",
        definition: "a personal interest that could influence work decisions",
    },
    GlossaryEntry {
        term: "anything of value",
        definition: "cash, gifts, hospitality, travel, donations, jobs, internships, favours, discounts or confidential information",
    },
    GlossaryEntry {
        term: "speak up hotline",
        definition: "the confidential channel to report concerns",
    },
    GlossaryEntry {
        term: "public official",
        definition: "anyone employed by or acting on behalf of a public body",
    },
    GlossaryEntry {
        term: "due diligence",
        definition: "risk-based checks on third parties before engagement",
    },
    GlossaryEntry {
        term: "kickback",
        definition: "a secret payment or benefit for awarding business, which is prohibited",
    },
    GlossaryEntry {
        term: "bribe",
        definition: "anything of value offered or received to improperly influence a decision",
    },
];

pub fn glossary_entry(term: &str) -> Option<&'static GlossaryEntry> {
    GLOSSARY.iter().find(|entry| entry.term == term)
}

/// Banks that carry no scenario-specific wording, for table-wide checks.
pub const GENERIC_BANKS: &[Bank] = &[
    OPENING,
    GREETING_HI,
    GREETING_HOW_ARE_YOU,
    GREETING_THANKS,
    PIVOT,
    WHAT_SHOULD_I_HAVE_DONE,
    WHAT_NOW_IF_OK,
    CLARITY,
    AWAIT_STATEMENT,
    NUDGE,
    CLOSED_NOTICE,
    RESTART,
    TENDER_DECLINE,
    CASH_GIFT,
    OFFICIAL_GIFT,
    GIFT_OVER_LIMIT,
    GIFT_DISCLOSE,
    GIFT_GENERAL,
    OFFICIAL_HOSPITALITY,
    HOSPITALITY_OVER_LIMIT,
    HOSPITALITY_GENERAL,
    PUBLIC_OFFICIALS,
    FACILITATION,
    THIRD_PARTIES,
    REGISTER,
    TRAVEL,
    OFFICIAL_DONATION,
    DONATIONS,
    CONFLICTS,
    FLAVOR,
    FLAVOR_DEFENSIVE,
    FLAVOR_MINIMIZING,
];
