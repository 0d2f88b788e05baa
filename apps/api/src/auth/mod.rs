// Accounts and sessions: password hashing, signed tokens, request identity, page gating.

pub mod accounts;
pub mod gate;
pub mod handlers;
pub mod identity;
pub mod password;
pub mod session;
