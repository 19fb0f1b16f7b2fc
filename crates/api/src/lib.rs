//! Admin HTTP API: destination management, the chat command bridge and
//! server membership events.

pub mod middleware;
pub mod routes;
pub mod state;
