/// Атрибуты дилера из справочника
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DimensionRecord {
    pub entity_id: String,
    pub tier: Option<String>,
    pub display_name: Option<String>,
}

impl DimensionRecord {
    pub fn new(entity_id: &str, tier: Option<&str>, display_name: Option<&str>) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            tier: tier.map(str::to_string),
            display_name: display_name.map(str::to_string),
        }
    }
}

/// Dealer dimension keyed by entity id. Built through the projection
/// builder the ids are unique; the wide-table join re-checks it.
#[derive(Debug, Clone, Default)]
pub struct DimensionTable {
    records: Vec<DimensionRecord>,
}

impl DimensionTable {
    pub fn from_records(records: Vec<DimensionRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[DimensionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, entity_id: &str) -> Option<&DimensionRecord> {
        self.records.iter().find(|r| r.entity_id == entity_id)
    }
}
