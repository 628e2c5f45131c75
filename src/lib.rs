//! `mailpdf`: convert an email and its attachments into a single PDF.
//!
//! The email body is rendered to a bitmap and placed on the first page; PDF
//! attachments are then copied page by page and image attachments are placed
//! centered on pages of their own, in attachment order.

pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod parser;
pub mod pdf;
pub mod pipeline;
pub mod render;
pub mod store;
