//! Contract violations raised at declaration time.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Rejected `register` call.
///
/// Every variant names the offending type so a broken plugin is identifiable
/// from the startup failure alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConformanceError {
    NoInterfaces {
        type_name: String,
    },
    UndeclaredInterface {
        type_name: String,
        interface: String,
    },
    MissingMember {
        type_name: String,
        member: String,
        interface: String,
    },
    MemberNotCallable {
        type_name: String,
        member: String,
        interface: String,
    },
    DuplicateImplementation {
        type_name: String,
        interface: String,
    },
}

impl ConformanceError {
    /// Name of the type whose registration failed.
    pub fn type_name(&self) -> &str {
        match self {
            Self::NoInterfaces { type_name }
            | Self::UndeclaredInterface { type_name, .. }
            | Self::MissingMember { type_name, .. }
            | Self::MemberNotCallable { type_name, .. }
            | Self::DuplicateImplementation { type_name, .. } => type_name,
        }
    }
}

impl Display for ConformanceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoInterfaces { type_name } => {
                write!(f, "type `{type_name}` must declare at least one interface")
            }
            Self::UndeclaredInterface {
                type_name,
                interface,
            } => write!(
                f,
                "type `{type_name}` targets interface `{interface}` which is not declared in this registry"
            ),
            Self::MissingMember {
                type_name,
                member,
                interface,
            } => write!(
                f,
                "type `{type_name}` does not implement member `{member}` of interface `{interface}`"
            ),
            Self::MemberNotCallable {
                type_name,
                member,
                interface,
            } => write!(
                f,
                "type `{type_name}` provides `{member}` as an attribute, but interface `{interface}` requires a method"
            ),
            Self::DuplicateImplementation {
                type_name,
                interface,
            } => write!(
                f,
                "type `{type_name}` is already registered for interface `{interface}`"
            ),
        }
    }
}

impl Error for ConformanceError {}
