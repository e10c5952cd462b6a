//! Error types for FIT container operations

use core::fmt;

/// Result type for FIT container operations
pub type Result<T> = core::result::Result<T, FitError>;

/// Errors that can occur while parsing or resolving a FIT container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitError {
    /// Header magic does not match the device-tree magic word
    BadMagic,

    /// Blob ends before a structure the header claims is present
    Truncated,

    /// Property value has an impossible length or encoding
    MalformedProperty,

    /// A required property is absent from its node
    MissingProperty,

    /// The /configurations node is missing
    NoConfigurations,

    /// No `default` property, or no configuration matches it
    NoDefaultConfig,

    /// The /images node is missing
    NoImagesNode,

    /// A configuration references an image node that does not exist
    ImageNotFound,

    /// Image carries neither a data-position nor a data-offset property
    NoExternalData,

    /// Node or property name is not valid UTF-8
    InvalidString,

    /// I/O error reading the container from its backing medium
    Io,
}

impl fmt::Display for FitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadMagic => write!(f, "Bad container magic"),
            Self::Truncated => write!(f, "Container truncated"),
            Self::MalformedProperty => write!(f, "Malformed property value"),
            Self::MissingProperty => write!(f, "Required property missing"),
            Self::NoConfigurations => write!(f, "No /configurations node"),
            Self::NoDefaultConfig => write!(f, "No matching default configuration"),
            Self::NoImagesNode => write!(f, "No /images node"),
            Self::ImageNotFound => write!(f, "Referenced image node not found"),
            Self::NoExternalData => write!(f, "Image has no external data location"),
            Self::InvalidString => write!(f, "Invalid string encoding"),
            Self::Io => write!(f, "I/O error reading container"),
        }
    }
}
