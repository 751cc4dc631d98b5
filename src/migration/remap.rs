use std::collections::HashMap;

use log::warn;
use serde_json::{json, Value};

use super::errors::{ErrorLog, ErrorRecord, Operation};
use crate::model::item::{id_of, parse_id, Item};
use crate::model::resource::ResourceType;

pub const CUSTOM_FIELD_PREFIX: &str = "custom_fields_";

/// Source id to target id, one table per referenced resource type.
///
/// Tables only grow during a run; rule transforms read them after the
/// referenced types have been copied.
#[derive(Debug, Default)]
pub struct IdRemapper {
    tables: HashMap<ResourceType, HashMap<u64, u64>>,
}

impl IdRemapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, resource: ResourceType, old_id: u64, new_id: u64) {
        self.tables.entry(resource).or_default().insert(old_id, new_id);
    }

    /// Record the pair from a source item and the item the target created for it.
    pub fn record_items(&mut self, resource: ResourceType, old: &Item, new: &Item) {
        match (id_of(old), id_of(new)) {
            (Some(old_id), Some(new_id)) => self.record(resource, old_id, new_id),
            (old_id, new_id) => warn!(
                "cannot map {} {old_id:?} -> {new_id:?}: missing id",
                resource.as_str()
            ),
        }
    }

    pub fn translate(&self, resource: ResourceType, old_id: u64) -> Option<u64> {
        self.tables.get(&resource)?.get(&old_id).copied()
    }

    pub fn mapped(&self, resource: ResourceType) -> usize {
        self.tables.get(&resource).map_or(0, HashMap::len)
    }

    fn translate_value(&self, resource: ResourceType, raw: &Value) -> Option<u64> {
        parse_id(raw).and_then(|id| self.translate(resource, id))
    }

    /// `custom_fields_<id>` with `<id>` translated, or `None` on a miss.
    fn translate_custom_field(&self, field: &str) -> Option<String> {
        let old_id: u64 = field.strip_prefix(CUSTOM_FIELD_PREFIX)?.parse().ok()?;
        let new_id = self.translate(ResourceType::TicketField, old_id)?;
        Some(format!("{CUSTOM_FIELD_PREFIX}{new_id}"))
    }

    fn rewrite_condition(&self, mut condition: Value) -> Result<Value, String> {
        let Some(field) = condition.get("field").and_then(Value::as_str).map(String::from) else {
            return Ok(condition);
        };

        if field == "ticket_form_id" || field == "group_id" {
            let resource = if field == "group_id" {
                ResourceType::Group
            } else {
                ResourceType::TicketForm
            };
            let raw = condition.get("value").cloned().unwrap_or(Value::Null);
            let new_id = self
                .translate_value(resource, &raw)
                .ok_or_else(|| format!("failed to translate {field}: {raw}"))?;
            condition["value"] = json!(new_id.to_string());
        } else if field.starts_with(CUSTOM_FIELD_PREFIX) {
            let new_field = self
                .translate_custom_field(&field)
                .ok_or_else(|| format!("failed to translate ticket field: {field}"))?;
            condition["field"] = json!(new_field);
        }

        Ok(condition)
    }

    /// Translate the ids a condition list references; untranslatable conditions are dropped.
    pub fn rewrite_conditions(
        &self,
        conditions: Vec<Value>,
        owner: ResourceType,
        owner_id: Option<u64>,
        errors: &mut ErrorLog,
    ) -> Vec<Value> {
        conditions
            .into_iter()
            .filter_map(|condition| match self.rewrite_condition(condition.clone()) {
                Ok(rewritten) => Some(rewritten),
                Err(reason) => {
                    warn!("{} {}: dropping condition, {reason}", owner.as_str(), display_id(owner_id));
                    errors.record(ErrorRecord::new(owner, owner_id, Operation::RewriteCondition, condition));
                    None
                }
            })
            .collect()
    }

    /// Translate custom field actions; untranslatable actions are dropped and recorded.
    pub fn rewrite_actions(
        &self,
        actions: Vec<Value>,
        owner: ResourceType,
        owner_id: Option<u64>,
        errors: &mut ErrorLog,
    ) -> Vec<Value> {
        actions
            .into_iter()
            .filter_map(|mut action| {
                let field = action.get("field").and_then(Value::as_str).unwrap_or_default();
                if !field.starts_with(CUSTOM_FIELD_PREFIX) {
                    return Some(action);
                }
                match self.translate_custom_field(field) {
                    Some(new_field) => {
                        action["field"] = json!(new_field);
                        Some(action)
                    }
                    None => {
                        warn!(
                            "{} {}: dropping action on {field}, no mapped ticket field",
                            owner.as_str(),
                            display_id(owner_id)
                        );
                        errors.record(ErrorRecord::new(owner, owner_id, Operation::RewriteAction, action));
                        None
                    }
                }
            })
            .collect()
    }

    /// Rewrite `conditions.all`, `conditions.any` and `actions` of an automation, trigger or macro.
    pub fn rewrite_rule(&self, rule: &mut Item, owner: ResourceType, errors: &mut ErrorLog) {
        let owner_id = id_of(rule);

        if let Some(Value::Object(conditions)) = rule.get_mut("conditions") {
            for key in ["all", "any"] {
                if let Some(Value::Array(list)) = conditions.get_mut(key) {
                    let rewritten = self.rewrite_conditions(std::mem::take(list), owner, owner_id, errors);
                    *list = rewritten;
                }
            }
        }

        if let Some(Value::Array(actions)) = rule.get_mut("actions") {
            let rewritten = self.rewrite_actions(std::mem::take(actions), owner, owner_id, errors);
            *actions = rewritten;
        }
    }

    /// Translate a form's field list. Built-in fields have no mapping and are left out.
    pub fn rewrite_field_ids(&self, ids: &[Value]) -> Vec<u64> {
        ids.iter()
            .filter_map(|raw| self.translate_value(ResourceType::TicketField, raw))
            .collect()
    }
}

fn display_id(id: Option<u64>) -> String {
    id.map(|id| id.to_string()).unwrap_or_else(|| "(no id)".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remapper() -> IdRemapper {
        let mut r = IdRemapper::new();
        r.record(ResourceType::Group, 42, 99);
        r.record(ResourceType::TicketField, 7, 21);
        r.record(ResourceType::TicketForm, 5, 500);
        r
    }

    fn rewrite_one(condition: Value) -> (Vec<Value>, ErrorLog) {
        let mut errors = ErrorLog::new();
        let out = remapper().rewrite_conditions(vec![condition], ResourceType::Trigger, Some(1), &mut errors);
        (out, errors)
    }

    #[test]
    fn translate_misses_unknown_ids_and_types() {
        let r = remapper();
        assert_eq!(r.translate(ResourceType::Group, 42), Some(99));
        assert_eq!(r.translate(ResourceType::Group, 43), None);
        assert_eq!(r.translate(ResourceType::Macro, 42), None);
        assert_eq!(r.mapped(ResourceType::Group), 1);
        assert_eq!(r.mapped(ResourceType::Macro), 0);
    }

    #[test]
    fn group_condition_is_translated() {
        let (out, errors) = rewrite_one(json!({"field": "group_id", "operator": "is", "value": "42"}));
        assert_eq!(out, vec![json!({"field": "group_id", "operator": "is", "value": "99"})]);
        assert!(errors.is_empty());
    }

    #[test]
    fn unmapped_group_condition_is_dropped_with_diagnostic() {
        let mut errors = ErrorLog::new();
        let out = IdRemapper::new().rewrite_conditions(
            vec![json!({"field": "group_id", "value": "42"})],
            ResourceType::Trigger,
            Some(1),
            &mut errors,
        );
        assert!(out.is_empty());
        assert_eq!(errors.dropped_references().count(), 1);
        assert_eq!(errors.records()[0].operation, Operation::RewriteCondition);
        assert_eq!(errors.records()[0].detail["value"], json!("42"));
    }

    #[test]
    fn ticket_form_condition_accepts_numeric_value() {
        let (out, _) = rewrite_one(json!({"field": "ticket_form_id", "value": 5}));
        assert_eq!(out[0]["value"], json!("500"));
    }

    #[test]
    fn unmapped_ticket_form_condition_is_dropped() {
        let (out, errors) = rewrite_one(json!({"field": "ticket_form_id", "value": "6"}));
        assert!(out.is_empty());
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn custom_field_condition_rewrites_key() {
        let (out, _) = rewrite_one(json!({"field": "custom_fields_7", "operator": "is", "value": "vip"}));
        assert_eq!(out[0]["field"], json!("custom_fields_21"));
        assert_eq!(out[0]["value"], json!("vip"));
    }

    #[test]
    fn unmapped_custom_field_condition_is_dropped() {
        let mut errors = ErrorLog::new();
        let conditions = vec![
            json!({"field": "custom_fields_8", "operator": "is", "value": "gold"}),
            json!({"field": "custom_fields_7", "operator": "is", "value": "silver"}),
        ];
        let out = remapper().rewrite_conditions(conditions, ResourceType::Trigger, Some(1), &mut errors);

        assert_eq!(out, vec![json!({"field": "custom_fields_21", "operator": "is", "value": "silver"})]);
        assert_eq!(errors.len(), 1);
        let record = &errors.records()[0];
        assert_eq!(record.operation, Operation::RewriteCondition);
        assert_eq!(record.detail["field"], json!("custom_fields_8"));
    }

    #[test]
    fn malformed_custom_field_condition_is_dropped() {
        let (out, errors) = rewrite_one(json!({"field": "custom_fields_abc", "value": "x"}));
        assert!(out.is_empty());
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn other_conditions_pass_through_in_order() {
        let mut errors = ErrorLog::new();
        let conditions = vec![
            json!({"field": "status", "operator": "is", "value": "open"}),
            json!({"field": "group_id", "value": "1000"}),
            json!({"field": "priority", "operator": "is", "value": "high"}),
        ];
        let out = remapper().rewrite_conditions(conditions, ResourceType::Automation, Some(3), &mut errors);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["field"], json!("status"));
        assert_eq!(out[1]["field"], json!("priority"));
    }

    #[test]
    fn custom_field_action_is_translated() {
        let mut errors = ErrorLog::new();
        let out = remapper().rewrite_actions(
            vec![json!({"field": "custom_fields_7", "value": "x"})],
            ResourceType::Macro,
            Some(8),
            &mut errors,
        );
        assert_eq!(out, vec![json!({"field": "custom_fields_21", "value": "x"})]);
        assert!(errors.is_empty());
    }

    #[test]
    fn unmapped_custom_field_action_is_dropped_and_recorded() {
        let mut errors = ErrorLog::new();
        let out = IdRemapper::new().rewrite_actions(
            vec![
                json!({"field": "custom_fields_7", "value": "x"}),
                json!({"field": "status", "value": "solved"}),
            ],
            ResourceType::Macro,
            Some(8),
            &mut errors,
        );
        assert_eq!(out, vec![json!({"field": "status", "value": "solved"})]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.records()[0].operation, Operation::RewriteAction);
        assert_eq!(errors.records()[0].item_id, Some(8));
    }

    #[test]
    fn rewrite_rule_touches_all_any_and_actions() {
        let mut rule: Item = json!({
            "id": 11,
            "title": "Route VIPs",
            "conditions": {
                "all": [{"field": "group_id", "operator": "is", "value": "42"}],
                "any": [{"field": "ticket_form_id", "operator": "is", "value": "404"}]
            },
            "actions": [{"field": "custom_fields_7", "value": "gold"}]
        })
        .as_object()
        .cloned()
        .unwrap();

        let mut errors = ErrorLog::new();
        remapper().rewrite_rule(&mut rule, ResourceType::Trigger, &mut errors);

        assert_eq!(rule["conditions"]["all"][0]["value"], json!("99"));
        assert_eq!(rule["conditions"]["any"], json!([]));
        assert_eq!(rule["actions"][0]["field"], json!("custom_fields_21"));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.records()[0].item_id, Some(11));
    }

    #[test]
    fn rewrite_rule_tolerates_missing_sections() {
        let mut rule: Item = json!({"id": 1, "title": "bare"}).as_object().cloned().unwrap();
        let mut errors = ErrorLog::new();
        remapper().rewrite_rule(&mut rule, ResourceType::Macro, &mut errors);
        assert_eq!(rule.len(), 2);
        assert!(errors.is_empty());
    }

    #[test]
    fn field_ids_keep_only_mapped_fields() {
        let ids = vec![json!(1), json!(7), json!("7"), json!(2)];
        assert_eq!(remapper().rewrite_field_ids(&ids), vec![21, 21]);
    }

    #[test]
    fn record_items_uses_both_ids() {
        let mut r = IdRemapper::new();
        let old: Item = json!({"id": 3}).as_object().cloned().unwrap();
        let new: Item = json!({"id": 30}).as_object().cloned().unwrap();
        r.record_items(ResourceType::TicketForm, &old, &new);
        r.record_items(ResourceType::TicketForm, &old, &Item::new());
        assert_eq!(r.translate(ResourceType::TicketForm, 3), Some(30));
        assert_eq!(r.mapped(ResourceType::TicketForm), 1);
    }
}
