use std::io::{self, Write};

use serde::Serialize;
use serde_json::json;
use tracing::warn;

use crate::client::ApiClient;
use crate::endpoints;
use crate::error::{HelpdeskError, Result};
use crate::output;

pub fn ensure_signed_in(client: &ApiClient) -> Result<()> {
    if client.session().has_valid_session() {
        Ok(())
    } else {
        Err(HelpdeskError::NotSignedIn)
    }
}

pub async fn sign_in(client: &ApiClient, username: &str) -> Result<()> {
    print!("Password for {username}: ");
    io::stdout().flush()?;

    let mut password = String::new();
    io::stdin().read_line(&mut password)?;
    let password = password.trim_end_matches(['\r', '\n']);

    let response = client
        .post_json(
            endpoints::SIGN_IN,
            json!({"username": username, "password": password}),
        )
        .await?;

    let session = client
        .session()
        .establish_session(&response)
        .ok_or(HelpdeskError::NoAccessToken)?;

    let display = client
        .session()
        .current_user_full_name()
        .or(session.username)
        .unwrap_or_else(|| username.to_string());
    output::print_message(&format!("Signed in as {display}"));
    Ok(())
}

pub async fn sign_up(client: &ApiClient, args: crate::cli::SignUpArgs) -> Result<()> {
    print!("Password for {}: ", args.username);
    io::stdout().flush()?;

    let mut password = String::new();
    io::stdin().read_line(&mut password)?;
    let password = password.trim_end_matches(['\r', '\n']);

    client
        .post_json(
            endpoints::SIGN_UP,
            json!({
                "UserProfile": {
                    "full_name": args.full_name,
                    "email": args.email,
                    "is_active": true,
                },
                "UserAccount": {
                    "username": args.username,
                    "password": password,
                },
                "TeamGroup": {"id": args.team},
            }),
        )
        .await?;

    output::print_message(&format!(
        "Account {} created. Sign in with 'helpdesk sign-in {}'.",
        args.username, args.username
    ));
    Ok(())
}

/// Best-effort server-side sign-out; the local session is cleared either
/// way.
pub async fn sign_out(client: &ApiClient) -> Result<()> {
    if let Some(token) = client.session().access_token() {
        let result = client
            .post_json(endpoints::SIGN_OUT, json!({"authorization": token}))
            .await;
        if let Err(err) = result {
            warn!(%err, "sign-out request failed; clearing the local session anyway");
        }
    }

    client.session().clear_session();
    output::print_message("Signed out.");
    Ok(())
}

#[derive(Serialize)]
struct Identity {
    user_id: Option<String>,
    username: Option<String>,
    full_name: Option<String>,
    team: Option<String>,
    client: Option<String>,
}

pub fn whoami(client: &ApiClient) -> Result<()> {
    ensure_signed_in(client)?;
    let session = client.session();

    let identity = Identity {
        user_id: session.current_user_id(),
        username: session.current_username(),
        full_name: session.current_user_full_name(),
        team: session.current_user_team(),
        client: session.current_user_client(),
    };

    output::print_item(&identity, |identity| {
        let unknown = || "-".to_string();
        println!(
            "{} ({})",
            identity.full_name.clone().unwrap_or_else(unknown),
            identity.username.clone().unwrap_or_else(unknown)
        );
        println!("User id: {}", identity.user_id.clone().unwrap_or_else(unknown));
        println!("Team:    {}", identity.team.clone().unwrap_or_else(unknown));
        if let Some(client_name) = &identity.client {
            println!("Client:  {client_name}");
        }
    });
    Ok(())
}
