pub mod auth;
pub mod catalogs;
pub mod dashboard;
pub mod init;
pub mod tickets;
