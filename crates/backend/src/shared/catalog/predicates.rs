//! Построчные предикаты для источников, где метрика - это количество строк.

use std::collections::HashMap;

use crate::shared::data::cells::split_entity_ids;

pub const LEADS_TYPE: &str = "leads_type";
pub const CHANNEL: &str = "mkt_second_channel_name";
pub const SEND_TO_DEALER: &str = "send2dealer_id";

const NATURAL: &str = "自然";
const PAID: &str = "付费";
const STORE_CHANNELS: &[&str] = &["抖音车云店_BMW_本市_LS直发", "抖音车云店_LS直发"];
const AREA_CHANNEL: &str = "抖音车云店_BMW_总部BDT_LS直发";

/// Row as seen by a predicate: the exploded entity id plus cleaned attribute cells
#[derive(Debug, Clone, Default)]
pub struct PredicateRow {
    pub entity_id: String,
    pub fields: HashMap<String, String>,
}

impl PredicateRow {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

pub type RowPredicate = fn(&PredicateRow) -> bool;

pub fn is_natural_lead(row: &PredicateRow) -> bool {
    row.field(LEADS_TYPE) == Some(NATURAL)
}

pub fn is_paid_lead(row: &PredicateRow) -> bool {
    row.field(LEADS_TYPE) == Some(PAID)
}

pub fn is_store_paid_lead(row: &PredicateRow) -> bool {
    is_paid_lead(row)
        && row
            .field(CHANNEL)
            .map_or(false, |channel| STORE_CHANNELS.contains(&channel))
}

pub fn is_area_paid_lead(row: &PredicateRow) -> bool {
    is_paid_lead(row) && row.field(CHANNEL) == Some(AREA_CHANNEL)
}

/// Лид отправлен тому же дилеру, на которого зарегистрирован
pub fn is_local_lead(row: &PredicateRow) -> bool {
    match row.field(SEND_TO_DEALER) {
        Some(target) => split_entity_ids(target)
            .iter()
            .any(|id| *id == row.entity_id),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::hashmap;

    fn row(entity: &str, fields: HashMap<String, String>) -> PredicateRow {
        PredicateRow {
            entity_id: entity.to_string(),
            fields,
        }
    }

    #[test]
    fn test_lead_type_predicates() {
        let paid_store = row(
            "D1",
            hashmap! {
                LEADS_TYPE.to_string() => "付费".to_string(),
                CHANNEL.to_string() => "抖音车云店_LS直发".to_string(),
            },
        );
        assert!(is_paid_lead(&paid_store));
        assert!(is_store_paid_lead(&paid_store));
        assert!(!is_area_paid_lead(&paid_store));
        assert!(!is_natural_lead(&paid_store));

        let natural_area = row(
            "D1",
            hashmap! {
                LEADS_TYPE.to_string() => "自然".to_string(),
                CHANNEL.to_string() => AREA_CHANNEL.to_string(),
            },
        );
        assert!(is_natural_lead(&natural_area));
        assert!(!is_area_paid_lead(&natural_area));
    }

    #[test]
    fn test_local_lead_compares_cleaned_ids() {
        let local = row("D1", hashmap! { SEND_TO_DEALER.to_string() => "D1.0".to_string() });
        assert!(!is_local_lead(&local));

        let local = row("123", hashmap! { SEND_TO_DEALER.to_string() => "123.0".to_string() });
        assert!(is_local_lead(&local));

        let other = row("D1", hashmap! { SEND_TO_DEALER.to_string() => "D2".to_string() });
        assert!(!is_local_lead(&other));
        assert!(!is_local_lead(&row("D1", HashMap::new())));
    }
}
