//! Composition of plugin-contributed query and mutation fields.
//!
//! Plugins register classes against `IQueryContribution` and
//! `IMutationContribution`; `compose_schema` merges them into one
//! `Query` type and an optional `Mutation` type.
//!
//! # Invariants
//! - At least one query contribution is required.
//! - Contributions are merged in registration order; on a field name clash
//!   the earliest contributor wins.

use crate::interface::{Interface, InterfaceSpec, Registry};
use log::{info, warn};
use serde::Serialize;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const QUERY_INTERFACE: &str = "IQueryContribution";
pub const MUTATION_INTERFACE: &str = "IMutationContribution";

/// A set of root fields a plugin adds to the schema.
pub trait SchemaContribution: Send + Sync {
    fn fields(&self) -> Vec<SchemaField>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaField {
    pub name: String,
    pub type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SchemaField {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// One merged root type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposedType {
    pub name: String,
    pub fields: Vec<SchemaField>,
    /// Type names of the contributions, in merge order.
    pub contributors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposedSchema {
    pub query: ComposedType,
    pub mutation: Option<ComposedType>,
}

impl Display for ComposedType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "type {} {{", self.name)?;
        for field in &self.fields {
            if let Some(description) = &field.description {
                writeln!(f, "  \"{description}\"")?;
            }
            writeln!(f, "  {}: {}", field.name, field.type_name)?;
        }
        write!(f, "}}")
    }
}

impl Display for ComposedSchema {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.query)?;
        if let Some(mutation) = &self.mutation {
            write!(f, "\n\n{mutation}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    NoQuery,
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoQuery => write!(
                f,
                "no plugin implements `{QUERY_INTERFACE}`; register at least one query contribution"
            ),
        }
    }
}

impl Error for SchemaError {}

/// Returns the non-service `IQueryContribution` interface, declaring it on first use.
pub fn query_contributions(registry: &Registry) -> Interface<dyn SchemaContribution> {
    registry.interface_or_declare(
        InterfaceSpec::new(QUERY_INTERFACE)
            .service(false)
            .method("fields"),
    )
}

/// Returns the non-service `IMutationContribution` interface, declaring it on first use.
pub fn mutation_contributions(registry: &Registry) -> Interface<dyn SchemaContribution> {
    registry.interface_or_declare(
        InterfaceSpec::new(MUTATION_INTERFACE)
            .service(false)
            .method("fields"),
    )
}

/// Merges every enabled query and mutation contribution of `registry`.
///
/// # Errors
/// - `NoQuery` when no enabled query contribution is registered.
pub fn compose_schema(registry: &Registry) -> Result<ComposedSchema, SchemaError> {
    let query =
        compose_type("Query", &query_contributions(registry)).ok_or(SchemaError::NoQuery)?;
    let mutation = compose_type("Mutation", &mutation_contributions(registry));

    info!(
        "event=schema_compose module=schema status=ok query_fields={} mutation_fields={}",
        query.fields.len(),
        mutation.as_ref().map_or(0, |mutation| mutation.fields.len())
    );
    Ok(ComposedSchema { query, mutation })
}

fn compose_type(
    name: &str,
    contributions: &Interface<dyn SchemaContribution>,
) -> Option<ComposedType> {
    let classes: Vec<_> = contributions.enumerate(false).classes().collect();
    if classes.is_empty() {
        return None;
    }

    let mut seen = BTreeSet::new();
    let mut fields = Vec::new();
    let mut contributors = Vec::new();
    for class in classes {
        for field in class.instantiate().fields() {
            if seen.insert(field.name.clone()) {
                fields.push(field);
            } else {
                warn!(
                    "event=schema_compose module=schema status=field_shadowed type={} field={} contributor={}",
                    name,
                    field.name,
                    class.type_name()
                );
            }
        }
        contributors.push(class.type_name().to_string());
    }

    Some(ComposedType {
        name: name.to_string(),
        fields,
        contributors,
    })
}
