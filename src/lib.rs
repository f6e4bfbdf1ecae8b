//! Scripted chat funnel
//!
//! A one-way scripted conversation in a messaging-app style: the bot walks a
//! fixed script, the visitor answers with text or buttons, and the final step
//! offers an outbound call to action. Analytics events are emitted at each
//! transition.

pub mod config;
pub mod message;
pub mod runtime;
pub mod script;
pub mod state_machine;
