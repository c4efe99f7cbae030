//! Path State
//!
//! The traversal cursor: the selected field index at every open struct depth,
//! the open array dimensions, and the root being hashed.

use crate::eip712::schema::{FieldDef, SchemaRegistry, StructDef};
use crate::eip712::types::DOMAIN_STRUCT_NAME;

/// Which top-level struct is being hashed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RootType {
    #[default]
    Domain,
    Message,
}

impl RootType {
    /// Classify a root struct by exact name
    pub fn of(type_name: &str) -> Self {
        if type_name == DOMAIN_STRUCT_NAME {
            RootType::Domain
        } else {
            RootType::Message
        }
    }
}

/// One open array dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayDepth {
    /// Depth index the array field lives at
    pub path_index: u8,
    /// Declared element count
    pub size: u8,
    /// Current element
    pub index: u8,
}

/// Traversal cursor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathState {
    pub(crate) depths: Vec<u8>,
    pub(crate) array_depths: Vec<ArrayDepth>,
    pub(crate) root_type: RootType,
    pub(crate) root_struct: Option<String>,
}

impl PathState {
    /// Start over at a new root, with no depth open yet
    pub(crate) fn reset(&mut self, root: &str) {
        self.depths.clear();
        self.array_depths.clear();
        self.root_type = RootType::of(root);
        self.root_struct = Some(root.to_string());
    }

    pub fn depth_count(&self) -> usize {
        self.depths.len()
    }

    pub fn array_depth_count(&self) -> usize {
        self.array_depths.len()
    }

    pub fn depths(&self) -> &[u8] {
        &self.depths
    }

    pub fn array_depths(&self) -> &[ArrayDepth] {
        &self.array_depths
    }

    pub fn root_type(&self) -> RootType {
        self.root_type
    }

    pub fn root_name(&self) -> Option<&str> {
        self.root_struct.as_deref()
    }

    /// Whether the innermost array dimension, if any, is still on its first
    /// element
    pub fn at_first_array_element(&self) -> bool {
        self.array_depths.last().map_or(true, |arr| arr.index == 0)
    }

    /// Field selected by the first `n` depths, with the number of fields of
    /// the struct it belongs to
    pub fn nth_field_with_count<'r, R>(&self, registry: &'r R, n: usize) -> Option<(&'r FieldDef, usize)>
    where
        R: SchemaRegistry + ?Sized,
    {
        if n == 0 || n > self.depths.len() {
            return None;
        }

        let mut def: &'r StructDef = registry.get_struct(self.root_struct.as_deref()?)?;
        let mut selected: Option<(&'r FieldDef, usize)> = None;
        for &index in &self.depths[..n] {
            if let Some((parent, _)) = selected {
                if !parent.is_custom() {
                    return None;
                }
                def = registry.get_struct(parent.type_name())?;
            }
            let field = def.fields.get(usize::from(index))?;
            selected = Some((field, def.fields.len()));
        }
        selected
    }

    /// Field selected by the first `n` depths
    pub fn nth_field<'r, R>(&self, registry: &'r R, n: usize) -> Option<&'r FieldDef>
    where
        R: SchemaRegistry + ?Sized,
    {
        self.nth_field_with_count(registry, n).map(|(field, _)| field)
    }

    /// Field the cursor points at
    pub fn field<'r, R>(&self, registry: &'r R) -> Option<&'r FieldDef>
    where
        R: SchemaRegistry + ?Sized,
    {
        self.nth_field(registry, self.depths.len())
    }

    /// Struct type of the field `n` depths above the cursor
    pub fn nth_struct_to_last<'r, R>(&self, registry: &'r R, n: usize) -> Option<&'r StructDef>
    where
        R: SchemaRegistry + ?Sized,
    {
        let depth = self.depths.len().checked_sub(n)?;
        let field = self.nth_field(registry, depth)?;
        registry.get_struct(field.type_name())
    }
}
