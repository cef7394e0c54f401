use std::collections::BTreeMap;

use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct DiuType {
    pub id: Uuid,
    pub name: String,
}

/// Forward plan: which type names still need a row, and the name → id map
/// for the ones that already exist. Get-or-create semantics make repeat runs
/// create nothing.
#[derive(Debug, Default)]
pub struct BackfillPlan {
    pub creates: Vec<String>,
    pub mapping: BTreeMap<String, Uuid>,
}

pub fn plan_forward<I>(values: I, existing: &[DiuType]) -> BackfillPlan
where
    I: IntoIterator<Item = String>,
{
    let mut plan = BackfillPlan::default();

    for value in values {
        let name = value.trim();
        if name.is_empty() {
            continue;
        }
        if plan.mapping.contains_key(name) || plan.creates.iter().any(|c| c == name) {
            continue;
        }
        match existing.iter().find(|t| t.name == name) {
            Some(t) => {
                plan.mapping.insert(name.to_string(), t.id);
            }
            None => plan.creates.push(name.to_string()),
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diu_type(name: &str) -> DiuType {
        DiuType {
            id: Uuid::new_v4(),
            name: name.to_string(),
        }
    }

    #[test]
    fn creates_only_missing_types() {
        let existing = vec![diu_type("Copper T")];
        let values = vec!["Copper T".to_string(), "Mirena".to_string()];

        let plan = plan_forward(values, &existing);
        assert_eq!(plan.creates, vec!["Mirena".to_string()]);
        assert_eq!(plan.mapping.len(), 1);
        assert!(plan.mapping.contains_key("Copper T"));
    }

    #[test]
    fn second_run_creates_nothing() {
        let values = vec!["Copper T".to_string(), "Mirena".to_string()];
        let first = plan_forward(values.clone(), &[]);
        assert_eq!(first.creates.len(), 2);

        // After the first run every name has a row.
        let existing: Vec<DiuType> = first.creates.iter().map(|n| diu_type(n)).collect();
        let second = plan_forward(values, &existing);
        assert!(second.creates.is_empty());
        assert_eq!(second.mapping.len(), 2);
    }

    #[test]
    fn duplicate_and_blank_values_are_ignored() {
        let values = vec![
            "Mirena".to_string(),
            "Mirena".to_string(),
            "  ".to_string(),
            String::new(),
        ];

        let plan = plan_forward(values, &[]);
        assert_eq!(plan.creates, vec!["Mirena".to_string()]);
    }
}
