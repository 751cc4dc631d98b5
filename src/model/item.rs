use serde_json::{Map, Value};

/// A resource as the environment returns it. The schema differs per resource
/// type, so items stay untyped and transforms edit the JSON in place.
pub type Item = Map<String, Value>;

/// Built-in ticket field types; every other type is a custom field.
pub const DEFAULT_TICKET_FIELD_TYPES: &[&str] = &[
    "subject",
    "description",
    "status",
    "priority",
    "tickettype",
    "group",
    "assignee",
];

pub fn id_of(item: &Item) -> Option<u64> {
    item.get("id").and_then(parse_id)
}

/// Ids show up both as JSON numbers and as numeric strings (condition values).
pub fn parse_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn is_custom_ticket_field(item: &Item) -> bool {
    let field_type = item.get("type").and_then(Value::as_str).unwrap_or_default();
    !DEFAULT_TICKET_FIELD_TYPES.contains(&field_type)
}
