//! Core data model types for the message and its attachments.

pub mod attachment;
pub mod mail;
