use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("User id must not be empty")]
    EmptyUserId,

    #[error("Invalid id: {0}")]
    Malformed(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReactionKeyError {
    #[error("Invalid hex token in reaction key: {0:?}")]
    InvalidHex(String),

    #[error("Codepoint {0:#x} is not a valid Unicode scalar value")]
    InvalidCodepoint(u32),
}
