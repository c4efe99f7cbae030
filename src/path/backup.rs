//! Backup Path
//!
//! Snapshot of the cursor taken when an array is declared empty. It is
//! walked up to the nearest array field and then only read, to check that
//! relative field paths declared for the skipped elements exist.

use super::state::PathState;
use crate::eip712::schema::{FieldDef, SchemaRegistry};

/// Segment selecting the element type of an array field
pub const ARRAY_SEGMENT: &str = "[]";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupPath {
    state: PathState,
}

impl BackupPath {
    /// Copy `path` and shrink it until it points at an array field
    pub fn capture<R>(path: &PathState, registry: &R) -> Self
    where
        R: SchemaRegistry + ?Sized,
    {
        let mut state = path.clone();
        while state.depth_count() > 1 {
            match state.field(registry) {
                Some(field) if !field.type_is_array() => {
                    state.depths.pop();
                }
                _ => break,
            }
        }
        Self { state }
    }

    pub fn depth_count(&self) -> usize {
        self.state.depth_count()
    }

    pub fn state(&self) -> &PathState {
        &self.state
    }

    pub fn nth_field<'r, R>(&self, registry: &'r R, n: usize) -> Option<&'r FieldDef>
    where
        R: SchemaRegistry + ?Sized,
    {
        self.state.nth_field(registry, n)
    }

    /// Check a relative path such as `.[].to.[].addr` against the schema
    /// reachable from the backed-up field
    pub fn exists<R>(&self, registry: &R, relative: &str) -> bool
    where
        R: SchemaRegistry + ?Sized,
    {
        let Some(mut field) = self.state.field(registry) else {
            return false;
        };

        let mut rest = relative;
        while !rest.is_empty() {
            let Some(segment_start) = rest.strip_prefix('.') else {
                return false;
            };

            if let Some(after) = segment_start.strip_prefix(ARRAY_SEGMENT) {
                if !field.type_is_array() {
                    return false;
                }
                rest = after;
                continue;
            }

            let end = segment_start.find('.').unwrap_or(segment_start.len());
            if end == 0 {
                return false;
            }
            let key = &segment_start[..end];
            let Some(def) = registry.get_struct(field.type_name()) else {
                return false;
            };
            let Some(next) = def.field(key) else {
                return false;
            };
            field = next;
            rest = &segment_start[end..];
        }
        true
    }
}
