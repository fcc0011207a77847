use tabled::Tabled;

use crate::cli::CatalogCommands;
use crate::error::Result;
use crate::output;
use crate::store::TicketStore;
use crate::types::{LevelType, SupportUser, Team};

use super::auth::ensure_signed_in;

#[derive(Tabled)]
struct LevelTypeRow {
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "ID")]
    id: String,
}

impl From<&LevelType> for LevelTypeRow {
    fn from(level: &LevelType) -> Self {
        Self {
            label: level.label().to_string(),
            value: level.value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string()),
            id: level.id.clone(),
        }
    }
}

#[derive(Tabled)]
struct SupportUserRow {
    #[tabled(rename = "Username")]
    username: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "ID")]
    id: String,
}

impl From<&SupportUser> for SupportUserRow {
    fn from(user: &SupportUser) -> Self {
        Self {
            username: user.username.clone(),
            name: user.display_name().to_string(),
            id: user.id.clone(),
        }
    }
}

#[derive(Tabled)]
struct TeamRow {
    #[tabled(rename = "Team")]
    description: String,
    #[tabled(rename = "Active")]
    active: String,
    #[tabled(rename = "ID")]
    id: String,
}

impl From<&Team> for TeamRow {
    fn from(team: &Team) -> Self {
        Self {
            description: team.description.clone(),
            active: match team.is_active {
                Some(true) => "yes".to_string(),
                Some(false) => "no".to_string(),
                None => "-".to_string(),
            },
            id: team.id.clone(),
        }
    }
}

pub async fn run(store: &TicketStore, action: CatalogCommands) -> Result<()> {
    ensure_signed_in(store.client())?;

    match action {
        CatalogCommands::RequestTypes => {
            store.load_level_types().await;
            output::print_table(&store.request_types(), LevelTypeRow::from);
        }
        CatalogCommands::PriorityTypes => {
            store.load_level_types().await;
            output::print_table(&store.priority_types(), LevelTypeRow::from);
        }
        CatalogCommands::StatusTypes => {
            store.load_level_types().await;
            output::print_table(&store.status_types(), LevelTypeRow::from);
        }
        CatalogCommands::SupportUsers => {
            store.load_level_types().await;
            output::print_table(&store.support_users(), SupportUserRow::from);
        }
        CatalogCommands::Teams => {
            let teams = store.load_teams().await?;
            output::print_table(&teams, TeamRow::from);
        }
    }

    if store.has_error() && !output::is_json_output() {
        println!("Some catalogs failed to load; results may be incomplete.");
    }
    Ok(())
}
