use std::sync::LazyLock;

use regex::Regex;

/// Incident labels seen on the beat pages, in the order they were collected.
pub const KNOWN_TYPES: &[&str] = &[
    "Unsecured Door",
    "Trespassing",
    "Lost Property",
    "Medical",
    "Suspicious Person",
    "Welfare Check",
    "Accident",
    "Alarm",
    "Traffic Offense",
    "Theft",
    "Fire Alarm",
    "Criminal Mischief",
    "Property Damage",
    "Sick Person",
    "Suspicious",
    "Found Property",
    "Information",
    "Sex Offense",
    "Suspicious Circumstance",
    "Escort",
    "Glass Break",
    "Drugs",
    "Missing Child",
    "Citizen Assist",
    "Animal Problem",
    "Overdose",
    "Fire",
    "Fraud",
    "Abandoned Vehicle",
    "Pursuit",
    "Agency Assist",
    "Citizen Contact",
    "Keep the Peace",
    "Domestic Violence",
    "Vehicle Theft",
    "Public Peace - Noise Complaint",
    "Report of Smoke - Fire",
    "Gas Smell",
    "Assault",
    "Extortion",
    "Trauma",
    "Threatening",
    "Unconscious",
    "Trespass",
    "Harassment",
    "Skateboarding",
    "BYU EMS",
    "Damage",
    "Disorderly",
    "Disturbance",
    "Fall",
    "DUI",
    "Fireworks",
    "Robbery Alarm",
    "Suicide Attempt",
    "Fire Alarms",
];

/// How competing vocabulary entries are tried at the start of a description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum MatchOrder {
    /// Longer labels first, so "Fire Alarms" beats "Fire Alarm" beats "Fire".
    #[default]
    Longest,
    /// Labels in collection order; an earlier short label shadows a later,
    /// more specific one ("Suspicious" before "Suspicious Circumstance").
    List,
}

static LIST_ORDER_RE: LazyLock<Regex> = LazyLock::new(|| build_matcher(KNOWN_TYPES.to_vec()));
static LONGEST_FIRST_RE: LazyLock<Regex> = LazyLock::new(|| build_matcher(longest_first()));

impl MatchOrder {
    pub(super) fn matcher(self) -> &'static Regex {
        match self {
            MatchOrder::Longest => &LONGEST_FIRST_RE,
            MatchOrder::List => &LIST_ORDER_RE,
        }
    }
}

/// Vocabulary sorted by descending length; ties keep collection order.
pub fn longest_first() -> Vec<&'static str> {
    let mut labels = KNOWN_TYPES.to_vec();
    labels.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
    labels
}

// Alternation is leftmost-first, so candidate order decides which label wins.
// The trailing group stands in for a lookahead: the label has to be followed
// by whitespace or a capital letter, never by the rest of a longer word.
fn build_matcher(labels: Vec<&str>) -> Regex {
    let alternation = labels
        .iter()
        .map(|label| regex::escape(label))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"^({alternation})(?:\s|[A-Z])")).unwrap()
}
