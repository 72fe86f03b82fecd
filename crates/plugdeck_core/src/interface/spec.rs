//! Interface declarations.

use std::collections::BTreeMap;

/// Kind of a declared member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// Callable member. An attribute of the same name does not satisfy it.
    Method,
    /// Plain attribute. Any member of the same name satisfies it.
    Attribute,
}

impl MemberKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Method => "method",
            Self::Attribute => "attribute",
        }
    }
}

/// Declarative contract for one interface.
///
/// Built with chained calls and handed to `Registry::declare_interface`:
/// `InterfaceSpec::new("IGreeter").method("greet")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceSpec {
    name: String,
    members: BTreeMap<String, MemberKind>,
    service: bool,
}

impl InterfaceSpec {
    /// Creates a service interface contract without members.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: BTreeMap::new(),
            service: true,
        }
    }

    /// Declares a method conforming types must provide.
    pub fn method(mut self, name: impl Into<String>) -> Self {
        self.members.insert(name.into(), MemberKind::Method);
        self
    }

    /// Declares an attribute conforming types must provide.
    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        self.members.insert(name.into(), MemberKind::Attribute);
        self
    }

    /// Sets service semantics (default `true`).
    ///
    /// Service interfaces instantiate conforming types at registration;
    /// non-service interfaces keep the classes.
    pub fn service(mut self, service: bool) -> Self {
        self.service = service;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_service(&self) -> bool {
        self.service
    }

    /// Public members a conforming type must provide, sorted by name.
    ///
    /// Underscore-prefixed members are private helpers and never required.
    pub fn required_members(&self) -> impl Iterator<Item = (&str, MemberKind)> + '_ {
        self.members
            .iter()
            .filter(|(name, _)| !is_private_member(name))
            .map(|(name, kind)| (name.as_str(), *kind))
    }
}

fn is_private_member(name: &str) -> bool {
    name.starts_with('_')
}

#[cfg(test)]
mod tests {
    use super::{InterfaceSpec, MemberKind};

    #[test]
    fn defaults_to_service_without_members() {
        let spec = InterfaceSpec::new("INoop");
        assert!(spec.is_service());
        assert_eq!(spec.required_members().count(), 0);
    }

    #[test]
    fn skips_private_members() {
        let spec = InterfaceSpec::new("IGreeter")
            .method("greet")
            .method("_format")
            .attribute("language");

        let required: Vec<_> = spec.required_members().collect();
        assert_eq!(
            required,
            vec![
                ("greet", MemberKind::Method),
                ("language", MemberKind::Attribute)
            ]
        );
    }

    #[test]
    fn later_declaration_overrides_member_kind() {
        let spec = InterfaceSpec::new("IEngine")
            .attribute("name")
            .method("name")
            .service(false);

        assert!(!spec.is_service());
        assert_eq!(
            spec.required_members().collect::<Vec<_>>(),
            vec![("name", MemberKind::Method)]
        );
    }
}
