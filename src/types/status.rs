use std::fmt;

use colored::Colorize;

/// Canonical ticket statuses as carried by the backend status catalog.
/// Backend labels are Spanish; the CLI accepts both the label and the
/// snake_case key when parsing user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketStatus {
    Open,
    InProgress,
    OnHold,
    Resolved,
    Closed,
    Cancelled,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 6] = [
        TicketStatus::Open,
        TicketStatus::InProgress,
        TicketStatus::OnHold,
        TicketStatus::Resolved,
        TicketStatus::Closed,
        TicketStatus::Cancelled,
    ];

    /// Catalog ordering value.
    pub fn value(self) -> i64 {
        match self {
            TicketStatus::Open => 1,
            TicketStatus::InProgress => 2,
            TicketStatus::OnHold => 3,
            TicketStatus::Resolved => 4,
            TicketStatus::Closed => 5,
            TicketStatus::Cancelled => 6,
        }
    }

    /// Human label as stored in the backend status catalog.
    pub fn label(self) -> &'static str {
        match self {
            TicketStatus::Open => "Abierto",
            TicketStatus::InProgress => "En proceso",
            TicketStatus::OnHold => "En espera",
            TicketStatus::Resolved => "Resuelto",
            TicketStatus::Closed => "Cerrado",
            TicketStatus::Cancelled => "Cancelado",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::OnHold => "on_hold",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
            TicketStatus::Cancelled => "cancelled",
        }
    }

    /// Lossy parse of backend strings and user input. Accepts the Spanish
    /// label, the snake_case key and common spelling variants.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "open" | "abierto" => Some(TicketStatus::Open),
            "in_progress" | "en_proceso" => Some(TicketStatus::InProgress),
            "on_hold" | "en_espera" => Some(TicketStatus::OnHold),
            "resolved" | "resuelto" => Some(TicketStatus::Resolved),
            "closed" | "cerrado" => Some(TicketStatus::Closed),
            "cancelled" | "canceled" | "cancelado" => Some(TicketStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_resolved(self) -> bool {
        matches!(self, TicketStatus::Resolved)
    }

    /// Get the colored label for terminal output.
    pub fn colored(self) -> String {
        let label = self.label();
        match self {
            TicketStatus::Open => label.blue().to_string(),
            TicketStatus::InProgress => label.yellow().to_string(),
            TicketStatus::OnHold => label.magenta().to_string(),
            TicketStatus::Resolved => label.green().to_string(),
            TicketStatus::Closed => label.bright_black().to_string(),
            TicketStatus::Cancelled => label.red().to_string(),
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_labels_keys_and_variants() {
        assert_eq!(TicketStatus::parse("Abierto"), Some(TicketStatus::Open));
        assert_eq!(
            TicketStatus::parse("in-progress"),
            Some(TicketStatus::InProgress)
        );
        assert_eq!(TicketStatus::parse("EN ESPERA"), Some(TicketStatus::OnHold));
        assert_eq!(
            TicketStatus::parse("canceled"),
            Some(TicketStatus::Cancelled)
        );
        assert_eq!(TicketStatus::parse("nonsense"), None);
    }

    #[test]
    fn labels_round_trip_through_parse() {
        for status in TicketStatus::ALL {
            assert_eq!(TicketStatus::parse(status.label()), Some(status));
        }
    }
}
