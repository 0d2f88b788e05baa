pub mod ats;
pub mod handlers;
pub mod import;
pub mod store;
