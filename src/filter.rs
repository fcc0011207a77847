//! Filtering and pagination over the in-memory ticket list. Filters are
//! transient and view-local; nothing here is persisted.

use crate::types::Ticket;

/// User-edited filter criteria, combined conjunctively.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketFilters {
    pub text: String,
    pub status: Vec<String>,
    pub request: Vec<String>,
    pub priority: Vec<String>,
    pub requester: String,
    pub unread_only: bool,
}

impl TicketFilters {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
            && self.status.is_empty()
            && self.request.is_empty()
            && self.priority.is_empty()
            && self.requester.trim().is_empty()
            && !self.unread_only
    }

    pub fn matches(&self, ticket: &Ticket) -> bool {
        self.matches_text(ticket)
            && in_set(&self.status, ticket.status.as_deref())
            && in_set(&self.request, ticket.request.as_deref())
            && in_set(&self.priority, ticket.priority.as_deref())
            && self.matches_requester(ticket)
            && (!self.unread_only || ticket.is_unread())
    }

    fn matches_text(&self, ticket: &Ticket) -> bool {
        let needle = self.text.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }

        let haystack = format!(
            "{} {} {} {} {}",
            ticket.code,
            ticket.request.as_deref().unwrap_or_default(),
            ticket.priority.as_deref().unwrap_or_default(),
            ticket.requester_label(),
            ticket.note,
        )
        .to_lowercase();
        haystack.contains(&needle)
    }

    fn matches_requester(&self, ticket: &Ticket) -> bool {
        let needle = self.requester.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        ticket.requester_label().to_lowercase().contains(&needle)
            || ticket.requester_id.to_lowercase().contains(&needle)
    }
}

fn in_set(set: &[String], value: Option<&str>) -> bool {
    if set.is_empty() {
        return true;
    }
    match value {
        Some(value) => set.iter().any(|candidate| candidate == value),
        None => false,
    }
}

/// Zero-based page window over the filtered ticket list. Editing any
/// filter jumps back to the first page; when the filtered count shrinks,
/// the page index clamps down to the last valid page.
#[derive(Debug, Clone)]
pub struct TicketListView {
    filters: TicketFilters,
    page_index: usize,
    page_size: usize,
}

impl TicketListView {
    pub fn new(page_size: usize) -> Self {
        Self {
            filters: TicketFilters::default(),
            page_index: 0,
            page_size: page_size.max(1),
        }
    }

    pub fn filters(&self) -> &TicketFilters {
        &self.filters
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn set_filters(&mut self, filters: TicketFilters) {
        self.filters = filters;
        self.page_index = 0;
    }

    /// Edit the filters in place; any edit resets the page index.
    pub fn update_filters(&mut self, edit: impl FnOnce(&mut TicketFilters)) {
        edit(&mut self.filters);
        self.page_index = 0;
    }

    pub fn set_page_index(&mut self, index: usize) {
        self.page_index = index;
    }

    pub fn set_page_size(&mut self, size: usize) {
        self.page_size = size.max(1);
    }

    pub fn filtered<'a>(&self, tickets: &'a [Ticket]) -> Vec<&'a Ticket> {
        tickets
            .iter()
            .filter(|ticket| self.filters.matches(ticket))
            .collect()
    }

    /// The current page of the filtered list. Clamps the page index first
    /// so a shrinking result set never leaves the window out of range.
    pub fn visible_tickets<'a>(&mut self, tickets: &'a [Ticket]) -> Vec<&'a Ticket> {
        let filtered = self.filtered(tickets);
        self.clamp_page(filtered.len());

        let start = self.page_index * self.page_size;
        filtered
            .into_iter()
            .skip(start)
            .take(self.page_size)
            .collect()
    }

    pub fn page_count(&self, tickets: &[Ticket]) -> usize {
        let total = self.filtered(tickets).len();
        total.div_ceil(self.page_size).max(1)
    }

    fn clamp_page(&mut self, total: usize) {
        let max_page = total.div_ceil(self.page_size).saturating_sub(1);
        if self.page_index > max_page {
            self.page_index = max_page;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket(id: &str) -> Ticket {
        Ticket {
            id: id.to_string(),
            code: format!("HD-{id}"),
            note: String::new(),
            request_type_id: None,
            request: None,
            priority_type_id: None,
            priority: None,
            status_type_id: None,
            status: None,
            requester_id: "u-1".to_string(),
            requester: None,
            manager_id: None,
            manager: None,
            team_id: None,
            due_at: None,
            resolved_at: None,
            closed_at: None,
            deleted_at: None,
            created_at: None,
            updated_at: None,
            is_resolved: None,
            attachments: Vec::new(),
        }
    }

    fn with_status(id: &str, status: &str, resolved: Option<bool>) -> Ticket {
        let mut t = ticket(id);
        t.status = Some(status.to_string());
        t.is_resolved = resolved;
        t
    }

    #[test]
    fn status_set_filters_exactly() {
        let tickets = vec![
            with_status("1", "Abierto", Some(false)),
            with_status("2", "Resuelto", Some(true)),
        ];
        let mut view = TicketListView::new(10);
        view.update_filters(|f| f.status = vec!["Abierto".to_string()]);

        let visible = view.visible_tickets(&tickets);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, "1");
    }

    #[test]
    fn unread_only_excludes_unknown_resolution() {
        let tickets = vec![
            with_status("1", "Abierto", Some(false)),
            with_status("2", "Abierto", None),
            with_status("3", "Resuelto", Some(true)),
        ];
        let mut view = TicketListView::new(10);
        view.update_filters(|f| f.unread_only = true);

        let visible = view.visible_tickets(&tickets);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, "1");
    }

    #[test]
    fn text_filter_searches_code_labels_requester_and_note() {
        let mut matching = ticket("1");
        matching.note = "La impresora no enciende".to_string();
        let tickets = vec![matching, ticket("2")];

        let mut view = TicketListView::new(10);
        view.update_filters(|f| f.text = "IMPRESORA".to_string());
        assert_eq!(view.visible_tickets(&tickets).len(), 1);

        view.update_filters(|f| f.text = "HD-2".to_string());
        let visible = view.visible_tickets(&tickets);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, "2");
    }

    #[test]
    fn requester_filter_matches_name_or_raw_id() {
        let mut named = ticket("1");
        named.requester = Some("Ana Torres".to_string());
        let anonymous = ticket("2");
        let tickets = vec![named, anonymous];

        let mut view = TicketListView::new(10);
        view.update_filters(|f| f.requester = "torres".to_string());
        assert_eq!(view.visible_tickets(&tickets).len(), 1);

        view.update_filters(|f| f.requester = "u-1".to_string());
        assert_eq!(view.visible_tickets(&tickets).len(), 2);
    }

    #[test]
    fn filters_are_conjunctive() {
        let mut a = with_status("1", "Abierto", Some(false));
        a.priority = Some("Alta".to_string());
        let b = with_status("2", "Abierto", Some(true));
        let tickets = vec![a, b];

        let mut view = TicketListView::new(10);
        view.update_filters(|f| {
            f.status = vec!["Abierto".to_string()];
            f.priority = vec!["Alta".to_string()];
            f.unread_only = true;
        });
        let visible = view.visible_tickets(&tickets);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, "1");
    }

    #[test]
    fn page_length_is_min_of_size_and_remainder() {
        let tickets: Vec<Ticket> = (0..7).map(|i| ticket(&i.to_string())).collect();
        let mut view = TicketListView::new(3);

        assert_eq!(view.visible_tickets(&tickets).len(), 3);
        view.set_page_index(1);
        assert_eq!(view.visible_tickets(&tickets).len(), 3);
        view.set_page_index(2);
        let last = view.visible_tickets(&tickets);
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].id, "6");
    }

    #[test]
    fn editing_filters_resets_the_page() {
        let tickets: Vec<Ticket> = (0..9).map(|i| ticket(&i.to_string())).collect();
        let mut view = TicketListView::new(3);
        view.set_page_index(2);
        assert_eq!(view.visible_tickets(&tickets)[0].id, "6");

        view.update_filters(|f| f.text = "HD".to_string());
        assert_eq!(view.page_index(), 0);
        assert_eq!(view.visible_tickets(&tickets)[0].id, "0");
    }

    #[test]
    fn shrinking_results_clamp_to_the_last_valid_page() {
        let many: Vec<Ticket> = (0..12).map(|i| ticket(&i.to_string())).collect();
        let mut view = TicketListView::new(5);
        view.set_page_index(2);
        assert_eq!(view.visible_tickets(&many).len(), 2);

        let few: Vec<Ticket> = (0..4).map(|i| ticket(&i.to_string())).collect();
        let visible = view.visible_tickets(&few);
        assert_eq!(view.page_index(), 0);
        assert_eq!(visible.len(), 4);

        // An empty result set parks the view on page 0.
        let visible = view.visible_tickets(&[]);
        assert!(visible.is_empty());
        assert_eq!(view.page_index(), 0);
    }
}
