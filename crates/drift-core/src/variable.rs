//! Particle variable definitions and the fixed schema built from them.

use indexmap::IndexMap;

use crate::column::ColumnType;
use crate::error::SchemaError;

/// How a variable's value evolves over a particle's lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VariableKind {
    /// Set once at release and immutable thereafter (e.g. release time,
    /// origin tag). Stored once per particle, indexed by pid.
    Particle,
    /// Recomputed every timestep (e.g. position, behaviour state).
    /// Stored per live particle and compacted with the population.
    Instance,
}

/// Definition of one particle variable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariableDef {
    /// Variable name, unique within a schema.
    pub name: String,
    /// Particle or instance variable.
    pub kind: VariableKind,
    /// Element type of the backing column.
    pub column_type: ColumnType,
    /// Optional unit annotation (e.g. `"m"`).
    pub units: Option<String>,
}

impl VariableDef {
    /// A floating-point instance variable.
    pub fn instance(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: VariableKind::Instance,
            column_type: ColumnType::Float,
            units: None,
        }
    }

    /// A floating-point particle variable.
    pub fn particle(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: VariableKind::Particle,
            column_type: ColumnType::Float,
            units: None,
        }
    }

    /// Override the element type.
    pub fn with_type(mut self, column_type: ColumnType) -> Self {
        self.column_type = column_type;
        self
    }

    /// Attach a unit annotation.
    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }
}

/// The fixed set of variables a simulation carries.
///
/// Built once at construction and never altered at runtime. Iteration
/// order is declaration order, which is also the order columns appear
/// in output frames.
#[derive(Clone, Debug, PartialEq)]
pub struct Schema {
    vars: IndexMap<String, VariableDef>,
}

impl Schema {
    /// Build a schema, rejecting empty or duplicate names.
    pub fn new(defs: impl IntoIterator<Item = VariableDef>) -> Result<Self, SchemaError> {
        let mut vars = IndexMap::new();
        for def in defs {
            if def.name.is_empty() {
                return Err(SchemaError::EmptyName);
            }
            if vars.contains_key(&def.name) {
                return Err(SchemaError::DuplicateVariable { name: def.name });
            }
            vars.insert(def.name.clone(), def);
        }
        Ok(Self { vars })
    }

    /// Look up a variable by name.
    pub fn get(&self, name: &str) -> Option<&VariableDef> {
        self.vars.get(name)
    }

    /// Returns `true` if a variable with this name is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// All variables in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &VariableDef> {
        self.vars.values()
    }

    /// Instance variables in declaration order.
    pub fn instance_variables(&self) -> impl Iterator<Item = &VariableDef> {
        self.iter().filter(|d| d.kind == VariableKind::Instance)
    }

    /// Particle variables in declaration order.
    pub fn particle_variables(&self) -> impl Iterator<Item = &VariableDef> {
        self.iter().filter(|d| d.kind == VariableKind::Particle)
    }

    /// Number of declared variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Returns `true` if no variables are declared.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}
