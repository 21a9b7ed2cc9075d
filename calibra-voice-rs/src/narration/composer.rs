//! Builds the ordered list of utterances for one announcement.
//!
//! Only exact day counts are narrated (≤0, 30, 15 and 7) so an item is
//! mentioned on a handful of days instead of every day of its bucket.

use crate::models::{AggregateStats, EquipmentSnapshot};
use crate::status::Period;

use super::dates::date_to_words;
use super::numerals::to_words;

/// Individual items spoken per group before falling back to a count.
pub const MAX_DETAILED_PER_GROUP: usize = 2;

const CERTIFICATE_FALLBACK: &str = "não informado";
const ALL_CLEAR: &str = "Todos os equipamentos estão em dia.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrgencyGroup {
    Overdue,
    DueIn30,
    DueInNearTerm,
}

impl UrgencyGroup {
    /// Narration order.
    pub const ORDER: [UrgencyGroup; 3] = [Self::Overdue, Self::DueIn30, Self::DueInNearTerm];

    pub fn of(days_until_due: i64) -> Option<Self> {
        match days_until_due {
            d if d <= 0 => Some(Self::Overdue),
            30 => Some(Self::DueIn30),
            15 | 7 => Some(Self::DueInNearTerm),
            _ => None,
        }
    }

    fn item_utterance(self, item: &EquipmentSnapshot) -> String {
        match self {
            Self::Overdue => format!(
                "Atenção. O equipamento {} está com a calibração vencida desde o {}.",
                item.description,
                date_to_words(&item.due_date)
            ),
            Self::DueIn30 => format!(
                "Aviso. O equipamento {}, certificado {}, vence em {} dias.",
                item.description,
                certificate_words(item.certificate_number.as_deref()),
                to_words(item.days_until_due)
            ),
            Self::DueInNearTerm => format!(
                "Urgente. O equipamento {}, certificado {}, vence em {} dias.",
                item.description,
                certificate_words(item.certificate_number.as_deref()),
                to_words(item.days_until_due)
            ),
        }
    }

    fn summary_utterance(self, remaining: usize) -> String {
        let count = to_words(i64::try_from(remaining).unwrap_or(i64::MAX));
        let singular = remaining == 1;
        let subject = if singular { "equipamento" } else { "equipamentos" };
        let tail = match self {
            Self::Overdue if singular => "vencido",
            Self::Overdue => "vencidos",
            Self::DueIn30 => "vencendo em trinta dias",
            Self::DueInNearTerm => "com vencimento nos próximos dias",
        };
        format!("E mais {count} {subject} {tail}.")
    }
}

/// Greeting for the period; an empty name drops the vocative.
pub fn greeting(first_name: &str, period: Period) -> String {
    let salutation = match period {
        Period::Morning => "Bom dia",
        Period::Afternoon => "Boa tarde",
        Period::Night => "Boa noite",
    };
    if first_name.is_empty() {
        format!("{salutation}. O sistema Calibra Core está operante.")
    } else {
        format!("{salutation}, {first_name}. O sistema Calibra Core está operante.")
    }
}

/// Numeric certificates are spelled out; anything else is "não informado".
pub fn certificate_words(certificate: Option<&str>) -> String {
    certificate
        .map(str::trim)
        .filter(|c| !c.is_empty() && c.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|c| c.parse::<i64>().ok())
        .map(to_words)
        .unwrap_or_else(|| CERTIFICATE_FALLBACK.to_string())
}

/// Compose the full announcement. Pure: no I/O and no throttle access.
pub fn compose(
    first_name: &str,
    period: Period,
    stats: &AggregateStats,
    items: &[EquipmentSnapshot],
) -> Vec<String> {
    let mut utterances = vec![greeting(first_name, period)];
    let mut anything_urgent = false;

    for group in UrgencyGroup::ORDER {
        let members: Vec<&EquipmentSnapshot> = items
            .iter()
            .filter(|item| UrgencyGroup::of(item.days_until_due) == Some(group))
            .collect();

        if members.is_empty() {
            continue;
        }
        anything_urgent = true;

        utterances.extend(
            members
                .iter()
                .take(MAX_DETAILED_PER_GROUP)
                .map(|item| group.item_utterance(item)),
        );

        if members.len() > MAX_DETAILED_PER_GROUP {
            utterances.push(group.summary_utterance(members.len() - MAX_DETAILED_PER_GROUP));
        }
    }

    if !anything_urgent && stats.overdue == 0 && stats.due_in_30 == 0 {
        utterances.push(ALL_CLEAR.to_string());
    }

    utterances
}
