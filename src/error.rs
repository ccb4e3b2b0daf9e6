
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("particle property `{property}` is not registered")]
    MissingProperty { property: &'static str },

    #[error("body `{body}` lacks required property `{property}`")]
    BodyMissingProperty { body: String, property: &'static str },

    #[error("expected {expected} values for particle property `{property}`, got {found}")]
    LengthMismatch {
        property: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("particle property `{property}` is already borrowed")]
    BorrowConflict { property: &'static str },

    #[error("body `{body}` has no contacting bodies")]
    EmptyContactList { body: String },

    #[error("body `{body}` cannot be in contact with itself")]
    SelfContact { body: String },

    #[error("contact body `{body}` is not a wall")]
    NotAWall { body: String },

    #[error("unknown body id {0}")]
    UnknownBody(usize),

    #[error("relation does not match body `{body}`: {reason}")]
    RelationMismatch { body: String, reason: String },

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("failed to parse configuration")]
    Config(#[from] toml::de::Error),
}
