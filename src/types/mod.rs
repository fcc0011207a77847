mod attachment;
mod level_type;
mod session;
mod status;
mod team;
mod ticket;
mod user;

pub use attachment::TicketAttachment;
pub use level_type::LevelType;
pub use session::Session;
pub use status::TicketStatus;
pub use team::Team;
pub use ticket::{Ticket, TicketCreate};
pub use user::SupportUser;
