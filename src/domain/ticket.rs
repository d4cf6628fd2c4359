use serde::{Deserialize, Serialize};

/// Status labels exposed to relay callers. Provider encodings live with the provider client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TicketStatus {
    New,
    Resolved,
    Cancelled,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 3] = [
        TicketStatus::New,
        TicketStatus::Resolved,
        TicketStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::New => "New",
            TicketStatus::Resolved => "Resolved",
            TicketStatus::Cancelled => "Cancelled",
        }
    }

    /// Exact, case-sensitive match on the public label.
    pub fn from_label(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == value)
    }
}

/// Inbound create/update payload. Absent fields are passed through untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TicketRequest {
    #[serde(rename = "ticket_title")]
    pub title: Option<String>,
    #[serde(rename = "ticket_description")]
    pub description: Option<String>,
    #[serde(rename = "ticket_status")]
    pub status: Option<String>,
}

impl TicketRequest {
    /// Unknown labels resolve to `None` so the provider field is omitted instead of failing.
    pub fn status(&self) -> Option<TicketStatus> {
        self.status.as_deref().and_then(TicketStatus::from_label)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Ticket {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
}
