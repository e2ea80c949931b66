//! Read-only web viewer for the event history

pub mod handlers;
pub mod server;
pub mod status;

#[cfg(test)]
mod tests;

pub use server::{ServerState, ViewerServer};
pub use status::ViewerStatus;
