//! Error types

use thiserror::Error;

/// Configuration that cannot drive a surface
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("at least one device must be configured")]
    NoDevices,

    #[error("device {index} needs input_port and output_port when several devices are configured")]
    MissingPortNames { index: usize },

    #[error("detection pattern must not be empty")]
    EmptyDetectionPattern,

    #[error("at least one encoder bank must be configured")]
    NoEncoderBanks,

    #[error("encoder bank '{bank}' has no pages")]
    EmptyBank { bank: String },

    #[error("page '{page}' of encoder bank '{bank}' needs either per_channel or assignments")]
    InvalidPage { bank: String, page: String },

    #[error("{what} note {note:#04x} is out of range or used by a channel strip")]
    InvalidNote { what: String, note: u8 },

    #[error("note {note:#04x} is bound more than once ({first} and {second})")]
    DuplicateNote { note: u8, first: String, second: String },

    #[error("button {note:#04x} needs a parameter or an action")]
    EmptyButton { note: u8 },

    #[error("tick_ms must be greater than zero")]
    InvalidTick,

    #[error("display_revert_seconds must be between 0 and 60 seconds")]
    InvalidRevertDelay,
}
