//! Backend route templates, kept in one place so path drift shows up here.

const AUTHENTICATION: &str = "authentication";
const APPLICATION: &str = "application";

pub const SIGN_IN: &str = "authentication/sign-in";
pub const SIGN_UP: &str = "authentication/sign-up";
pub const SIGN_OUT: &str = "authentication/sign-out";
pub const REFRESH_TOKEN: &str = "authentication/refresh-token";

pub const CREATE_TICKET: &str = "application/create/ticket";

pub const REQUEST_TYPES: &str = "application/select/all/request-types";
pub const PRIORITY_TYPES: &str = "application/select/all/priority-types";
pub const STATUS_TYPES: &str = "application/select/all/status-types";
pub const SUPPORT_USERS: &str = "application/select/all/support-users";
pub const TEAMS: &str = "application/select/all/teams";

/// Paths that must never enter the 401 refresh-and-retry loop.
pub fn is_authentication_path(path: &str) -> bool {
    path.starts_with(AUTHENTICATION)
}

pub fn tickets_by_requester(requester_id: &str) -> String {
    format!("{APPLICATION}/select/all/tickets/requester/{requester_id}")
}

pub fn tickets_by_manager(manager_id: &str) -> String {
    format!("{APPLICATION}/select/all/tickets/manager/{manager_id}")
}

pub fn count_tickets_by_requester(requester_id: &str) -> String {
    format!("{APPLICATION}/select/total/tickets/requester/{requester_id}")
}

pub fn count_tickets_by_manager(manager_id: &str) -> String {
    format!("{APPLICATION}/select/total/tickets/manager/{manager_id}")
}

pub fn ticket_status_update(ticket_id: &str, status_type_id: &str) -> String {
    format!("{APPLICATION}/update/ticket/{ticket_id}/status/{status_type_id}")
}

pub fn ticket_manager_update(ticket_id: &str, manager_id: &str) -> String {
    format!("{APPLICATION}/update/ticket/{ticket_id}/manager/{manager_id}")
}

pub fn attachment_download(ticket_id: &str, attachment_id: &str) -> String {
    format!("{APPLICATION}/download/ticket/{ticket_id}/attachments/{attachment_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_paths_are_excluded_from_retry() {
        assert!(is_authentication_path(SIGN_IN));
        assert!(is_authentication_path(REFRESH_TOKEN));
        assert!(!is_authentication_path(CREATE_TICKET));
        assert!(!is_authentication_path(&tickets_by_requester("abc")));
    }

    #[test]
    fn parameterized_paths_interpolate() {
        assert_eq!(
            tickets_by_manager("m-1"),
            "application/select/all/tickets/manager/m-1"
        );
        assert_eq!(
            ticket_status_update("t-1", "s-2"),
            "application/update/ticket/t-1/status/s-2"
        );
    }
}
