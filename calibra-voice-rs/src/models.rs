//! Wire types shared with the dashboard (Portuguese field names on the wire).

use serde::{Deserialize, Serialize};

use crate::status::{classify, Severity};

/// One piece of equipment as seen by the dashboard at announcement time.
///
/// The upstream `status` field is deliberately not modelled; severity is
/// always recomputed from `days_until_due`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentSnapshot {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(rename = "descricao")]
    pub description: String,
    #[serde(rename = "numero_certificado", default)]
    pub certificate_number: Option<String>,
    #[serde(rename = "numero_serie", default)]
    pub serial_number: Option<String>,
    /// Expected as `YYYY-MM-DD`; kept as text so a malformed value is still spoken.
    #[serde(rename = "data_vencimento")]
    pub due_date: String,
    #[serde(rename = "dias_para_vencer")]
    pub days_until_due: i64,
}

impl EquipmentSnapshot {
    pub fn severity(&self) -> Severity {
        classify(self.days_until_due)
    }
}

/// Caller-supplied counters. Never reconciled with the item list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateStats {
    pub total: u32,
    #[serde(rename = "em_dia")]
    pub on_schedule: u32,
    #[serde(rename = "vence_60_dias")]
    pub due_in_60: u32,
    #[serde(rename = "vence_30_dias")]
    pub due_in_30: u32,
    #[serde(rename = "vencidos")]
    pub overdue: u32,
}

/// Body of `POST /announce` and the `--input` file of the CLI.
#[derive(Debug, Clone, Deserialize)]
pub struct AnnouncePayload {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(default)]
    pub stats: AggregateStats,
    #[serde(default)]
    pub items: Vec<EquipmentSnapshot>,
    #[serde(default)]
    pub force: bool,
}

/// First whitespace-separated token of a display name.
pub fn first_name(display_name: &str) -> &str {
    display_name.split_whitespace().next().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_decodes_dashboard_json_and_ignores_upstream_status() {
        let raw = r#"{
            "nome": "Maria da Silva",
            "stats": {"total": 10, "em_dia": 6, "vence_60_dias": 2, "vence_30_dias": 1, "vencidos": 1},
            "items": [{
                "id": 7,
                "descricao": "Balança analítica",
                "numero_certificado": "4521",
                "numero_serie": null,
                "data_vencimento": "2024-03-05",
                "dias_para_vencer": -3,
                "status": "em_dia"
            }]
        }"#;

        let payload: AnnouncePayload = serde_json::from_str(raw).unwrap();
        assert_eq!(payload.name, "Maria da Silva");
        assert_eq!(payload.stats.overdue, 1);
        assert_eq!(payload.stats.due_in_30, 1);
        assert!(!payload.force);

        let item = &payload.items[0];
        assert_eq!(item.certificate_number.as_deref(), Some("4521"));
        assert_eq!(item.serial_number, None);
        assert_eq!(item.severity(), Severity::Overdue);
    }

    #[test]
    fn missing_stats_and_items_default_to_empty() {
        let payload: AnnouncePayload = serde_json::from_str(r#"{"nome": "Ana", "force": true}"#).unwrap();
        assert_eq!(payload.stats, AggregateStats::default());
        assert!(payload.items.is_empty());
        assert!(payload.force);
    }

    #[test]
    fn first_name_takes_leading_token() {
        assert_eq!(first_name("João Pedro Santos"), "João");
        assert_eq!(first_name("  Ana  "), "Ana");
        assert_eq!(first_name(""), "");
    }
}
