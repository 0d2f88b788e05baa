pub mod document;
pub mod handlers;
pub mod merge;
pub mod store;
