//! gemini-relay: HTTP endpoints that forward text prompts and image edits to
//! the Gemini API and relay the generated text or image back.
pub mod config;
pub mod dtos;
pub mod handlers;
pub mod services;
pub mod startup;
