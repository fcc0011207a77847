use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "helpdesk")]
#[command(about = "A CLI for the support-ticket desk", version)]
#[command(after_help = "EXAMPLES:
    helpdesk sign-in ana.torres          Sign in and store the session
    helpdesk tickets --status Abierto    List open tickets
    helpdesk ticket create -n \"...\"      File a new ticket
    helpdesk ticket watch                Follow the inbox live
    helpdesk dashboard                   Per-status ticket counts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Show full error chains
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write the initial configuration file
    Init,
    /// Sign in and persist the session
    #[command(name = "sign-in")]
    SignIn {
        /// Account username; the password is prompted on stdin
        username: String,
    },
    /// Create a new account
    #[command(name = "sign-up")]
    SignUp(SignUpArgs),
    /// Sign out and clear the persisted session
    #[command(name = "sign-out")]
    SignOut,
    /// Show the identity decoded from the current session token
    Whoami,
    /// List tickets (alias for 'ticket list')
    #[command(after_help = "EXAMPLES:
    helpdesk tickets --unread
    helpdesk tickets --status Abierto --status \"En proceso\"
    helpdesk tickets --text impresora --page 2")]
    Tickets(TicketListArgs),
    /// Manage tickets
    Ticket {
        #[command(subcommand)]
        action: TicketCommands,
    },
    /// Per-status ticket counts for the signed-in user
    Dashboard,
    /// Reference catalogs
    Catalogs {
        #[command(subcommand)]
        action: CatalogCommands,
    },
    /// Generate shell completions
    #[command(after_help = "EXAMPLES:
    helpdesk completions bash > ~/.bash_completion.d/helpdesk
    helpdesk completions zsh > ~/.zfunc/_helpdesk")]
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum TicketCommands {
    /// List tickets with filters and pagination
    List(TicketListArgs),
    /// Show one ticket in full, including attachment download links
    View {
        /// Ticket id or code
        id: String,
    },
    /// File a new ticket
    #[command(after_help = "EXAMPLES:
    helpdesk ticket create -n \"La impresora no enciende\" --request Hardware --priority Alta
    helpdesk ticket create -n \"VPN caída\" --request Redes --priority Urgente --attach captura.png")]
    Create(TicketCreateArgs),
    /// Set a ticket's status
    Status {
        /// Ticket id
        id: String,
        /// Target status (label or key, e.g. 'Resuelto' or 'resolved')
        status: String,
    },
    /// Assign a ticket to a support user
    Assign {
        /// Ticket id
        id: String,
        /// Support user (username, full name or id)
        manager: String,
    },
    /// Follow the ticket inbox, refreshing in the background
    Watch(TicketListArgs),
}

#[derive(Subcommand)]
pub enum CatalogCommands {
    /// Request type catalog
    RequestTypes,
    /// Priority type catalog
    PriorityTypes,
    /// Status type catalog
    StatusTypes,
    /// Support staff available for assignment
    SupportUsers,
    /// Teams
    Teams,
}

#[derive(Args)]
pub struct SignUpArgs {
    /// Account username; the password is prompted on stdin
    pub username: String,

    /// Full display name
    #[arg(long)]
    pub full_name: String,

    /// Contact email
    #[arg(long)]
    pub email: String,

    /// Team id to join (see 'helpdesk catalogs teams')
    #[arg(long)]
    pub team: String,
}

#[derive(Args, Clone, Default)]
pub struct TicketListArgs {
    /// Free-text match against code, labels, requester and note
    #[arg(long)]
    pub text: Option<String>,

    /// Status filter; repeat for several statuses
    #[arg(long)]
    pub status: Vec<String>,

    /// Request type filter; repeat for several types
    #[arg(long)]
    pub request: Vec<String>,

    /// Priority filter; repeat for several priorities
    #[arg(long)]
    pub priority: Vec<String>,

    /// Requester name or id substring
    #[arg(long)]
    pub requester: Option<String>,

    /// Only tickets not yet resolved
    #[arg(long)]
    pub unread: bool,

    /// Zero-based page index
    #[arg(long, default_value_t = 0)]
    pub page: usize,

    /// Tickets per page
    #[arg(long)]
    pub page_size: Option<usize>,
}

#[derive(Args)]
pub struct TicketCreateArgs {
    /// Ticket code; generated when omitted
    #[arg(long)]
    pub code: Option<String>,

    /// Problem description
    #[arg(short, long)]
    pub note: String,

    /// Request type label (see 'helpdesk catalogs request-types')
    #[arg(long)]
    pub request: String,

    /// Priority label (see 'helpdesk catalogs priority-types')
    #[arg(long)]
    pub priority: String,

    /// Initial status label; defaults to the open status
    #[arg(long)]
    pub status: Option<String>,

    /// Team id to route the ticket to
    #[arg(long)]
    pub team: Option<String>,

    /// Support user to pre-assign (username, full name or id)
    #[arg(long)]
    pub assignee: Option<String>,

    /// Due date (ISO 8601)
    #[arg(long)]
    pub due: Option<String>,

    /// File to attach; repeat for several files
    #[arg(long = "attach")]
    pub attachments: Vec<PathBuf>,
}
