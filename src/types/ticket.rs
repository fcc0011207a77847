use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::TicketAttachment;

/// A normalized support ticket. Every instance comes out of the response
/// normalizer, so `id` and `code` are guaranteed non-empty.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Ticket {
    pub id: String,
    pub code: String,
    pub note: String,
    #[serde(rename = "requestTypeId")]
    pub request_type_id: Option<String>,
    pub request: Option<String>,
    #[serde(rename = "priorityTypeId")]
    pub priority_type_id: Option<String>,
    pub priority: Option<String>,
    #[serde(rename = "statusTypeId")]
    pub status_type_id: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "requesterId")]
    pub requester_id: String,
    pub requester: Option<String>,
    #[serde(rename = "managerId")]
    pub manager_id: Option<String>,
    pub manager: Option<String>,
    #[serde(rename = "teamId")]
    pub team_id: Option<String>,
    #[serde(rename = "duetAt")]
    pub due_at: Option<String>,
    #[serde(rename = "resolvedAt")]
    pub resolved_at: Option<String>,
    #[serde(rename = "closedAt")]
    pub closed_at: Option<String>,
    #[serde(rename = "deletedAt")]
    pub deleted_at: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: Option<String>,
    #[serde(rename = "updatedAt")]
    pub updated_at: Option<String>,
    #[serde(rename = "isResolved")]
    pub is_resolved: Option<bool>,
    #[serde(default)]
    pub attachments: Vec<TicketAttachment>,
}

impl Ticket {
    /// A ticket counts as unread only when the backend said so explicitly.
    pub fn is_unread(&self) -> bool {
        self.is_resolved == Some(false)
    }

    pub fn requester_label(&self) -> &str {
        match self.requester.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.requester_id,
        }
    }

    pub fn title_label(&self) -> &str {
        if let Some(request) = self.request.as_deref() {
            if !request.is_empty() {
                return request;
            }
        }
        if !self.note.is_empty() {
            return &self.note;
        }
        &self.code
    }
}

/// Payload for ticket creation; sent as a multipart form with one part
/// per field plus one file part per attachment.
#[derive(Debug, Clone, Default)]
pub struct TicketCreate {
    pub code: String,
    pub note: String,
    pub request_type_id: String,
    pub priority_type_id: String,
    pub status_type_id: String,
    pub requester_id: String,
    pub team_id: Option<String>,
    pub assignee_id: Option<String>,
    pub due_at: Option<String>,
    pub attachments: Vec<PathBuf>,
}
