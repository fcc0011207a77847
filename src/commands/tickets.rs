use std::time::Duration;

use chrono::{Local, Utc};
use tabled::Tabled;

use crate::cli::{TicketCreateArgs, TicketListArgs};
use crate::config::Config;
use crate::error::{HelpdeskError, Result};
use crate::filter::{TicketFilters, TicketListView};
use crate::output;
use crate::store::TicketStore;
use crate::types::{Ticket, TicketCreate, TicketStatus};

use super::auth::ensure_signed_in;

#[derive(Tabled)]
struct TicketRow {
    #[tabled(rename = "Code")]
    code: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Requester")]
    requester: String,
    #[tabled(rename = "Manager")]
    manager: String,
    #[tabled(rename = "Updated")]
    updated: String,
}

impl From<&Ticket> for TicketRow {
    fn from(ticket: &Ticket) -> Self {
        Self {
            code: ticket.code.clone(),
            title: output::truncate(ticket.title_label(), 40),
            status: output::status_colored(ticket.status.as_deref()),
            requester: output::truncate(ticket.requester_label(), 24),
            manager: output::truncate(ticket.manager.as_deref().unwrap_or("-"), 24),
            updated: ticket
                .updated_at
                .as_deref()
                .or(ticket.created_at.as_deref())
                .map(output::format_relative)
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

fn filters_from(args: &TicketListArgs) -> TicketFilters {
    TicketFilters {
        text: args.text.clone().unwrap_or_default(),
        status: args.status.clone(),
        request: args.request.clone(),
        priority: args.priority.clone(),
        requester: args.requester.clone().unwrap_or_default(),
        unread_only: args.unread,
    }
}

pub async fn list(store: &TicketStore, config: &Config, args: TicketListArgs) -> Result<()> {
    ensure_signed_in(store.client())?;

    store.get_all_tickets(false).await;
    if store.has_error() {
        return Err(HelpdeskError::TicketsUnavailable);
    }

    let mut view = TicketListView::new(args.page_size.unwrap_or_else(|| config.page_size()));
    view.set_filters(filters_from(&args));
    view.set_page_index(args.page);

    let tickets = store.tickets();
    let total = view.filtered(&tickets).len();
    let page: Vec<Ticket> = view
        .visible_tickets(&tickets)
        .into_iter()
        .cloned()
        .collect();

    output::print_table(&page, TicketRow::from);
    if !output::is_json_output() {
        println!(
            "Page {}/{} — {} of {} tickets match",
            view.page_index() + 1,
            view.page_count(&tickets),
            page.len(),
            total,
        );
    }
    Ok(())
}

pub async fn view(store: &TicketStore, config: &Config, id: &str) -> Result<()> {
    ensure_signed_in(store.client())?;

    store.get_all_tickets(false).await;
    if store.has_error() {
        return Err(HelpdeskError::TicketsUnavailable);
    }

    let ticket = store
        .tickets()
        .into_iter()
        .find(|t| t.id == id || t.code == id)
        .ok_or_else(|| HelpdeskError::TicketNotFound(id.to_string()))?;

    let api_url = config.api_url()?;
    output::print_item(&ticket, |ticket| {
        println!("{} — {}", ticket.code, ticket.title_label());
        println!("Status:    {}", output::status_colored(ticket.status.as_deref()));
        println!(
            "Priority:  {}",
            ticket.priority.as_deref().unwrap_or("-")
        );
        println!("Requester: {}", ticket.requester_label());
        println!("Manager:   {}", ticket.manager.as_deref().unwrap_or("-"));
        if let Some(created) = ticket.created_at.as_deref() {
            println!("Created:   {}", output::format_date(created));
        }
        if let Some(due) = ticket.due_at.as_deref() {
            println!("Due:       {}", output::format_date(due));
        }
        if !ticket.note.is_empty() {
            println!("\n{}", ticket.note);
        }
        if !ticket.attachments.is_empty() {
            println!("\nAttachments:");
            for attachment in &ticket.attachments {
                println!(
                    "  {} — {}/{}",
                    attachment.file_name,
                    api_url.as_str().trim_end_matches('/'),
                    crate::endpoints::attachment_download(&ticket.id, &attachment.id),
                );
            }
        }
    });
    Ok(())
}

pub async fn create(store: &TicketStore, args: TicketCreateArgs) -> Result<()> {
    ensure_signed_in(store.client())?;

    let requester_id = store
        .client()
        .session()
        .current_user_id()
        .ok_or(HelpdeskError::NoUserId)?;

    store.load_level_types().await;

    let request = store
        .request_type_by_label(&args.request)
        .ok_or_else(|| HelpdeskError::CatalogEntryNotFound(args.request.clone()))?;
    let priority = store
        .priority_type_by_label(&args.priority)
        .ok_or_else(|| HelpdeskError::CatalogEntryNotFound(args.priority.clone()))?;

    let status_label = args
        .status
        .unwrap_or_else(|| TicketStatus::Open.label().to_string());
    let status = store
        .status_type_by_label(&status_label)
        .ok_or_else(|| HelpdeskError::UnknownStatus(status_label.clone()))?;

    let assignee_id = match args.assignee {
        Some(name) => Some(
            store
                .support_user_by_name(&name)
                .ok_or_else(|| HelpdeskError::CatalogEntryNotFound(name.clone()))?
                .id,
        ),
        None => None,
    };

    let code = args
        .code
        .unwrap_or_else(|| Utc::now().format("HD-%y%m%d-%H%M%S").to_string());

    let ticket = store
        .post_ticket(TicketCreate {
            code,
            note: args.note,
            request_type_id: request.id,
            priority_type_id: priority.id,
            status_type_id: status.id,
            requester_id,
            team_id: args.team,
            assignee_id,
            due_at: args.due,
            attachments: args.attachments,
        })
        .await?;

    output::print_item(&ticket, |ticket| {
        println!("Created {} ({})", ticket.code, ticket.id);
    });
    Ok(())
}

pub async fn set_status(store: &TicketStore, id: &str, status: &str) -> Result<()> {
    ensure_signed_in(store.client())?;
    store.load_level_types().await;

    // Accept the key form ('resolved') as well as the catalog label.
    let canonical = TicketStatus::parse(status)
        .map(|s| s.label().to_string())
        .unwrap_or_else(|| status.to_string());
    let level = store
        .status_type_by_label(&canonical)
        .ok_or_else(|| HelpdeskError::UnknownStatus(status.to_string()))?;

    if store.set_ticket_status_by_ticket_id(id, &level.id).await {
        output::print_message(&format!("Ticket {id} → {}", level.label()));
        Ok(())
    } else {
        Err(HelpdeskError::UpdateNotConfirmed)
    }
}

pub async fn assign(store: &TicketStore, id: &str, manager: &str) -> Result<()> {
    ensure_signed_in(store.client())?;
    store.load_level_types().await;

    let user = store
        .support_user_by_name(manager)
        .ok_or_else(|| HelpdeskError::CatalogEntryNotFound(manager.to_string()))?;

    if store.set_ticket_manager_by_ticket_id(id, &user.id).await {
        output::print_message(&format!("Ticket {id} assigned to {}", user.display_name()));
        Ok(())
    } else {
        Err(HelpdeskError::UpdateNotConfirmed)
    }
}

/// Follow the inbox: keep background polling on and print a summary line
/// whenever a refresh lands, until Ctrl-C.
pub async fn watch(store: &TicketStore, args: TicketListArgs) -> Result<()> {
    ensure_signed_in(store.client())?;

    let filters = filters_from(&args);
    store.enable_realtime_updates().await;
    println!("Watching tickets — Ctrl-C to stop");

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                break;
            }
            _ = tokio::time::sleep(Duration::from_millis(5000)) => {
                let tickets = store.tickets();
                let unread = tickets.iter().filter(|t| t.is_unread()).count();
                let matching = tickets.iter().filter(|t| filters.matches(t)).count();
                let mut line = format!(
                    "{} — {} tickets, {} unread",
                    Local::now().format("%H:%M:%S"),
                    tickets.len(),
                    unread,
                );
                if !filters.is_empty() {
                    line.push_str(&format!(", {matching} matching"));
                }
                let breakdown: Vec<String> = store
                    .status_breakdown()
                    .into_iter()
                    .filter(|(_, count)| *count > 0)
                    .map(|(status, count)| format!("{} {count}", status.label()))
                    .collect();
                if !breakdown.is_empty() {
                    line.push_str(&format!(" [{}]", breakdown.join(" · ")));
                }
                if store.has_error() {
                    line.push_str(" (refresh failing)");
                }
                println!("{line}");
            }
        }
    }

    store.disable_realtime_updates().await;
    Ok(())
}
