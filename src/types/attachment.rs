use serde::{Deserialize, Serialize};

/// A file attached to a ticket. Owned by its parent ticket.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct TicketAttachment {
    pub id: String,
    #[serde(rename = "ticketId")]
    pub ticket_id: Option<String>,
    #[serde(rename = "fileName")]
    pub file_name: String,
    #[serde(rename = "filePath")]
    pub file_path: Option<String>,
    #[serde(rename = "fileSize")]
    pub file_size: Option<u64>,
    #[serde(rename = "mimeType")]
    pub mime_type: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: Option<String>,
    pub url: Option<String>,
}
