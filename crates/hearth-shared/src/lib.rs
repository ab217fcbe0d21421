//! # hearth-shared
//!
//! Types shared between the Hearth store and its API surface: identifier
//! newtypes, the reaction key codec, and protocol constants.

pub mod constants;
pub mod error;
pub mod reaction;
pub mod types;
