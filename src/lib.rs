//! Whistle - voice notes stored on Walrus and shared by link
//!
//! This crate records audio from the microphone, prefixes it with a one-line
//! JSON metadata header, uploads it to a Walrus publisher, and plays shared
//! recordings back from an aggregator.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Session state machine, blob framing, share links, config values
//! - **Application**: Use cases and port interfaces (traits)
//! - **Infrastructure**: Adapter implementations (cpal, Walrus HTTP, rodio, JSON file, clipboard)
//! - **CLI**: Command-line interface, argument parsing, and signal handling

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
