//! Kanban board client: a cached board kept in step with a REST store,
//! drag-and-drop reconciliation, and a proxy to the chat assistant.
pub mod chat;
pub mod cli;
pub mod config;
pub mod events;
pub mod logging;
pub mod output;
pub mod rest;
pub mod session;

#[cfg(test)]
mod testing;
