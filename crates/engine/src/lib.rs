pub mod commands;
pub mod dispatcher;
pub mod guild;
pub mod registry;
pub mod render;
pub mod retry;
pub mod store;

pub use dispatcher::{DispatchReport, NotificationDispatcher};
pub use registry::DestinationRegistry;
