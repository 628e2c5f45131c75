//! Email parsing: HTML body extraction and MIME attachment handling.

pub mod mime;
