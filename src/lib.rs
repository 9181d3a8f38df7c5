//! Huddle — a Slack scheduling assistant.
//!
//! Single Rust binary. Listens on Slack Socket Mode. Messages that look like
//! meeting requests are parsed into a structured intent and scheduled on the
//! sender's Google Calendar; everything else is answered by an LLM.
//!
//! See `DESIGN.md` for architecture notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod config;
pub mod logging;

pub mod intent;

pub mod adapters;
pub mod calendar;
pub mod providers;

pub mod router;
