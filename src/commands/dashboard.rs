use serde::Serialize;
use tabled::Tabled;

use crate::error::{HelpdeskError, Result};
use crate::output;
use crate::store::TicketStore;
use crate::types::TicketStatus;

use super::auth::ensure_signed_in;

#[derive(Serialize)]
struct StatusCount {
    status: &'static str,
    count: u64,
}

#[derive(Tabled)]
struct StatusCountRow {
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Tickets")]
    count: u64,
}

impl From<&StatusCount> for StatusCountRow {
    fn from(entry: &StatusCount) -> Self {
        Self {
            status: TicketStatus::parse(entry.status)
                .map(TicketStatus::colored)
                .unwrap_or_else(|| entry.status.to_string()),
            count: entry.count,
        }
    }
}

/// Per-status counts for the signed-in user, fetched through the
/// role-appropriate count endpoint one status label at a time.
pub async fn run(store: &TicketStore) -> Result<()> {
    ensure_signed_in(store.client())?;

    let user_id = store
        .client()
        .session()
        .current_user_id()
        .ok_or(HelpdeskError::NoUserId)?;

    let (open, in_progress, on_hold, resolved, closed, cancelled) = tokio::join!(
        store.count_tickets_by_user_id(&user_id, TicketStatus::Open.label()),
        store.count_tickets_by_user_id(&user_id, TicketStatus::InProgress.label()),
        store.count_tickets_by_user_id(&user_id, TicketStatus::OnHold.label()),
        store.count_tickets_by_user_id(&user_id, TicketStatus::Resolved.label()),
        store.count_tickets_by_user_id(&user_id, TicketStatus::Closed.label()),
        store.count_tickets_by_user_id(&user_id, TicketStatus::Cancelled.label()),
    );

    let counts = [
        StatusCount { status: TicketStatus::Open.label(), count: open },
        StatusCount { status: TicketStatus::InProgress.label(), count: in_progress },
        StatusCount { status: TicketStatus::OnHold.label(), count: on_hold },
        StatusCount { status: TicketStatus::Resolved.label(), count: resolved },
        StatusCount { status: TicketStatus::Closed.label(), count: closed },
        StatusCount { status: TicketStatus::Cancelled.label(), count: cancelled },
    ];

    output::print_table(&counts, StatusCountRow::from);
    Ok(())
}
