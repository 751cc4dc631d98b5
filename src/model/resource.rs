use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Group,
    TicketField,
    TicketForm,
    Automation,
    Trigger,
    Macro,
}

impl ResourceType {
    pub const ALL: [ResourceType; 6] = [
        ResourceType::Group,
        ResourceType::TicketField,
        ResourceType::TicketForm,
        ResourceType::Automation,
        ResourceType::Trigger,
        ResourceType::Macro,
    ];

    /// Dependents are deleted before the types they reference.
    pub const RESET_ORDER: [ResourceType; 6] = [
        ResourceType::Group,
        ResourceType::Trigger,
        ResourceType::Macro,
        ResourceType::Automation,
        ResourceType::TicketForm,
        ResourceType::TicketField,
    ];

    /// Referenced types are copied before the rules that point at them.
    pub const COPY_ORDER: [ResourceType; 6] = [
        ResourceType::Group,
        ResourceType::TicketField,
        ResourceType::TicketForm,
        ResourceType::Automation,
        ResourceType::Trigger,
        ResourceType::Macro,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Group => "group",
            ResourceType::TicketField => "ticket_field",
            ResourceType::TicketForm => "ticket_form",
            ResourceType::Automation => "automation",
            ResourceType::Trigger => "trigger",
            ResourceType::Macro => "macro",
        }
    }

    /// Collection path, also the key the collection is returned under.
    pub fn collection(&self) -> &'static str {
        match self {
            ResourceType::Group => "groups",
            ResourceType::TicketField => "ticket_fields",
            ResourceType::TicketForm => "ticket_forms",
            ResourceType::Automation => "automations",
            ResourceType::Trigger => "triggers",
            ResourceType::Macro => "macros",
        }
    }

    /// Listing used by both reset and copy. Rules only expose their active subset.
    pub fn list_path(&self) -> &'static str {
        match self {
            ResourceType::Automation => "automations/active",
            ResourceType::Trigger => "triggers/active",
            ResourceType::Macro => "macros/active",
            other => other.collection(),
        }
    }

    /// Wire key wrapping a single item in create requests and responses.
    pub fn singular(&self) -> &'static str {
        self.as_str()
    }

    pub fn item_path(&self, id: u64) -> String {
        format!("{}/{id}", self.collection())
    }

    /// Whether later resource types hold references to this one's ids.
    pub fn is_referenced(&self) -> bool {
        matches!(
            self,
            ResourceType::Group | ResourceType::TicketField | ResourceType::TicketForm
        )
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection())
    }
}

impl FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        ResourceType::ALL
            .into_iter()
            .find(|rt| normalized == rt.as_str() || normalized == rt.collection())
            .ok_or_else(|| {
                let known: Vec<&str> = ResourceType::ALL.iter().map(|rt| rt.collection()).collect();
                format!("Unknown resource type '{s}' (expected one of: {})", known.join(", "))
            })
    }
}
