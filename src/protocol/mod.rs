//! Protocol module for building and parsing Bot frames.
//!
//! This module contains the implementations for:
//! - Command frame construction
//! - Status response parsing
//! - Advertisement service data parsing

pub mod advertisement;
pub mod command;
pub mod status;

pub use advertisement::{decode_advertisement_flags, AdvertisementFlags};
pub use command::{encode_action, encode_query, BotAction, CommandFrame};
pub use status::{
    decode_status, decode_status_with_layout, encode_status, StatusLayout, StatusRecord,
};
