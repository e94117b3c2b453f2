//! Local web form: document upload, questions and resource recommendations.
pub mod handlers;
pub mod page;
pub mod server;

pub use server::{WebContext, WebServer};
