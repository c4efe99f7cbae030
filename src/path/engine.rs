//! Traversal Engine
//!
//! Walks a struct schema field by field, in the order a signer streams the
//! message, and keeps one hash context per open scope so that every nested
//! struct and array collapses to its own hash inside its parent:
//!
//! hashStruct(s) = keccak256(typeHash || encodeData(s))
//!
//! The external driver issues three commands (`set_root`, `open_array`,
//! `advance`) and feeds the 32-byte encoding of each leaf with `feed` before
//! advancing past it. Descent into nested structs is an explicit loop over
//! the owned depth stack.

use super::backup::BackupPath;
use super::hash_stack::HashStack;
use super::state::{ArrayDepth, PathState, RootType};
use crate::config::EngineConfig;
use crate::eip712::schema::{ArrayLevel, FieldDef, SchemaRegistry, StructDef};
use crate::error::{Eip712Error, Eip712Result};
use crate::{log_debug, log_warn};

const LOG_MODULE: &str = "path";

/// Digests written when a root scope closes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Digests {
    pub domain_hash: Option<[u8; 32]>,
    pub message_hash: Option<[u8; 32]>,
}

/// Policy of a struct descent
#[derive(Debug, Clone, Copy)]
struct Descent {
    /// Do not enter the cursor's own field if it starts an undeclared array.
    /// Array fields of entered structs are never declared yet, so the
    /// descent always stops at them.
    skip_if_array: bool,
    /// Prefix every entered struct's context with its type hash
    type_hash: bool,
}

impl Descent {
    const FORWARD: Descent = Descent {
        skip_if_array: true,
        type_hash: true,
    };

    fn forward(type_hash: bool) -> Self {
        Descent {
            type_hash,
            ..Self::FORWARD
        }
    }
}

struct Checkpoint {
    path: Option<PathState>,
    backup: Option<BackupPath>,
    hashes: HashStack,
    digests: Digests,
}

/// Incremental EIP-712 path/hashing engine
pub struct PathEngine<'r, R: SchemaRegistry + ?Sized> {
    registry: &'r R,
    config: EngineConfig,
    path: Option<PathState>,
    backup: Option<BackupPath>,
    hashes: HashStack,
    digests: Digests,
}

impl<'r, R: SchemaRegistry + ?Sized> PathEngine<'r, R> {
    /// Start a session against `registry`
    pub fn new(registry: &'r R, config: EngineConfig) -> Eip712Result<Self> {
        config.validate()?;
        Ok(Self {
            registry,
            config,
            path: Some(PathState::default()),
            backup: Some(BackupPath::default()),
            hashes: HashStack::new(config.hash_context_slots),
            digests: Digests::default(),
        })
    }

    /// Start a new session, discarding any previous one
    pub fn init(&mut self) {
        self.teardown();
        self.path = Some(PathState::default());
        self.backup = Some(BackupPath::default());
        self.digests = Digests::default();
    }

    /// Release the path state and every remaining hash context
    pub fn teardown(&mut self) {
        if self.path.is_some() || !self.hashes.is_empty() {
            log_debug!(LOG_MODULE, "session torn down", contexts = self.hashes.len());
        }
        self.path = None;
        self.backup = None;
        self.hashes.clear();
    }

    pub fn is_active(&self) -> bool {
        self.path.is_some()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Schema the session walks
    pub fn registry(&self) -> &'r R {
        self.registry
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Set the struct whose hash is computed next
    pub fn set_root(&mut self, type_name: &str) -> Eip712Result<()> {
        self.transact(|engine| engine.set_root_inner(type_name))
    }

    /// Declare the element count of the array dimension at the cursor
    pub fn open_array(&mut self, count: u8) -> Eip712Result<()> {
        self.transact(|engine| engine.open_array_inner(count))
    }

    /// [`PathEngine::open_array`] for a host-side length
    pub fn open_array_len(&mut self, len: usize) -> Eip712Result<()> {
        let count = u8::try_from(len).map_err(|_| Eip712Error::InvalidValue {
            type_name: "array size".to_string(),
            value: len.to_string(),
        })?;
        self.open_array(count)
    }

    /// Move to the next field, closing and folding finished scopes
    pub fn advance(&mut self) -> Eip712Result<()> {
        self.advance_with(true)
    }

    /// [`PathEngine::advance`] with explicit type hashing of entered structs
    pub fn advance_with(&mut self, type_hash: bool) -> Eip712Result<()> {
        self.transact(|engine| {
            if engine.state()?.depth_count() == 0 {
                return Err(Eip712Error::NotInitialized);
            }
            engine.step()?;
            engine.descend(Descent::forward(type_hash))
        })
    }

    /// Feed bytes into the context of the innermost open scope
    pub fn feed(&mut self, bytes: &[u8]) -> Eip712Result<()> {
        self.state()?;
        self.hashes.feed(bytes)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn depth_count(&self) -> usize {
        self.path.as_ref().map_or(0, PathState::depth_count)
    }

    pub fn array_depth_count(&self) -> usize {
        self.path.as_ref().map_or(0, PathState::array_depth_count)
    }

    pub fn backup_depth_count(&self) -> usize {
        self.backup.as_ref().map_or(0, BackupPath::depth_count)
    }

    /// Number of live hash contexts
    pub fn hash_depth(&self) -> usize {
        self.hashes.len()
    }

    pub fn hash_stack(&self) -> &HashStack {
        &self.hashes
    }

    /// Cursor, if a session is active
    pub fn path(&self) -> Option<&PathState> {
        self.path.as_ref()
    }

    /// Field the cursor points at
    pub fn field(&self) -> Option<&'r FieldDef> {
        self.path.as_ref()?.field(self.registry)
    }

    /// Field selected by the first `n` depths
    pub fn nth_field(&self, n: usize) -> Option<&'r FieldDef> {
        self.path.as_ref()?.nth_field(self.registry, n)
    }

    /// Struct type of the field `n` depths above the cursor
    pub fn nth_struct_to_last(&self, n: usize) -> Option<&'r StructDef> {
        self.path.as_ref()?.nth_struct_to_last(self.registry, n)
    }

    pub fn backup_nth_field(&self, n: usize) -> Option<&'r FieldDef> {
        self.backup.as_ref()?.nth_field(self.registry, n)
    }

    pub fn root_type(&self) -> RootType {
        self.path.as_ref().map_or(RootType::Domain, PathState::root_type)
    }

    pub fn root_struct(&self) -> Option<&'r StructDef> {
        let name = self.path.as_ref()?.root_name()?;
        self.registry.get_struct(name)
    }

    /// Check a relative path against the snapshot taken at the last empty
    /// array
    pub fn exists_in_backup(&self, relative: &str) -> bool {
        self.backup
            .as_ref()
            .is_some_and(|backup| backup.exists(self.registry, relative))
    }

    pub fn digests(&self) -> &Digests {
        &self.digests
    }

    /// Hand the digests to the signing step, clearing them
    pub fn take_digests(&mut self) -> Digests {
        std::mem::take(&mut self.digests)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn state(&self) -> Eip712Result<&PathState> {
        self.path.as_ref().ok_or(Eip712Error::NotInitialized)
    }

    fn state_mut(&mut self) -> Eip712Result<&mut PathState> {
        self.path.as_mut().ok_or(Eip712Error::NotInitialized)
    }

    /// Run a command, restoring the previous state if it is rejected
    fn transact<T, F>(&mut self, command: F) -> Eip712Result<T>
    where
        F: FnOnce(&mut Self) -> Eip712Result<T>,
    {
        let checkpoint = Checkpoint {
            path: self.path.clone(),
            backup: self.backup.clone(),
            hashes: self.hashes.clone(),
            digests: self.digests,
        };

        command(self).map_err(|e| {
            log_warn!(LOG_MODULE, "command rejected", error = e, depth = self.depth_count());
            self.path = checkpoint.path;
            self.backup = checkpoint.backup;
            self.hashes = checkpoint.hashes;
            self.digests = checkpoint.digests;
            e
        })
    }

    fn set_root_inner(&mut self, type_name: &str) -> Eip712Result<()> {
        let registry = self.registry;
        self.state()?;
        if registry.get_struct(type_name).is_none() {
            return Err(Eip712Error::UnknownType(type_name.to_string()));
        }
        let type_hash = registry
            .type_hash(type_name)
            .ok_or_else(|| Eip712Error::UnknownType(type_name.to_string()))?;

        if !self.hashes.is_empty() {
            log_warn!(LOG_MODULE, "discarding unfinished scopes", contexts = self.hashes.len());
            self.hashes.clear();
        }

        self.hashes.push(true)?;
        self.hashes.feed(&type_hash)?;

        let path = self.state_mut()?;
        path.reset(type_name);
        path.depths.push(0);
        let root_type = path.root_type();

        log_debug!(LOG_MODULE, "root set", root = type_name, kind = format!("{:?}", root_type));

        // the first field could be a struct type
        self.descend(Descent::FORWARD).map_err(|e| match e {
            Eip712Error::DepthExceeded { .. } | Eip712Error::OutOfMemory => e,
            other => Eip712Error::InvalidSchema(other.to_string()),
        })
    }

    /// Enter struct-typed fields until the cursor points at a leaf, an array
    /// that still has to be declared, or nothing at all
    fn descend(&mut self, policy: Descent) -> Eip712Result<()> {
        let registry = self.registry;
        let max_depth = self.config.max_path_depth;
        let path = self.path.as_mut().ok_or(Eip712Error::NotInitialized)?;

        let Some(mut field) = path.field(registry) else {
            return Ok(());
        };

        let mut first = true;
        while field.is_custom() {
            // arrays inside an entered struct are never declared yet
            let undeclared = !first || (policy.skip_if_array && path.at_first_array_element());
            if undeclared && field.type_is_array() {
                break;
            }

            let type_name = field.type_name();
            let def = registry
                .get_struct(type_name)
                .ok_or_else(|| Eip712Error::UnknownType(type_name.to_string()))?;
            let Some(first_field) = def.fields.first() else {
                return Err(Eip712Error::InvalidSchema(format!("struct {} has no fields", type_name)));
            };
            if path.depth_count() >= max_depth {
                return Err(Eip712Error::DepthExceeded { max: max_depth });
            }

            self.hashes.push(true)?;
            if policy.type_hash {
                let hash = registry
                    .type_hash(type_name)
                    .ok_or_else(|| Eip712Error::UnknownType(type_name.to_string()))?;
                self.hashes.feed(&hash)?;
            }
            path.depths.push(0);

            log_debug!(
                LOG_MODULE,
                "struct entered",
                struct_name = type_name,
                depth = path.depth_count(),
                typed = policy.type_hash,
            );

            field = first_field;
            first = false;
        }
        Ok(())
    }

    fn open_array_inner(&mut self, count: u8) -> Eip712Result<()> {
        let registry = self.registry;
        let max_array_depth = self.config.max_array_depth;

        let path = self.path.as_ref().ok_or(Eip712Error::NotInitialized)?;
        if path.depth_count() == 0 {
            return Err(Eip712Error::NotInitialized);
        }
        if path.array_depth_count() >= max_array_depth {
            return Err(Eip712Error::ArrayDepthExceeded { max: max_array_depth });
        }
        if count == 0 {
            let backup = BackupPath::capture(path, registry);
            self.backup = Some(backup);
        }

        self.descend(Descent {
            skip_if_array: false,
            type_hash: count > 0,
        })?;

        let path = self.path.as_ref().ok_or(Eip712Error::NotInitialized)?;
        let open_before = path.array_depth_count();
        let (path_index, field, level) = find_array_level(path, registry, open_before)?;
        if let ArrayLevel::Fixed(expected) = level {
            if expected != count {
                return Err(Eip712Error::ArrayShapeMismatch {
                    expected,
                    got: count,
                });
            }
        }

        if field.is_custom() {
            // the element struct scope was entered by the descent above
            let element = context_index_of_depth(path, path_index + 1);
            self.hashes.push_below(element, true)?;
            if count == 0 {
                // nothing will be hashed for the element, drop the type
                // hashes fed when its scopes were entered
                for index in element + 1..self.hashes.len() {
                    self.hashes.reseed(index)?;
                }
            }
        } else {
            self.hashes.push(true)?;
        }

        self.state_mut()?.array_depths.push(ArrayDepth {
            path_index: path_index as u8,
            size: count,
            index: 0,
        });

        log_debug!(
            LOG_MODULE,
            "array opened",
            field = field.key_name,
            size = count,
            array_depth = open_before + 1,
        );

        if count == 0 {
            self.skip_empty_array(open_before)?;
        }
        Ok(())
    }

    /// Walk past every field of an array declared empty, without hashing
    /// type hashes for the elements that never materialize
    fn skip_empty_array(&mut self, open_before: usize) -> Eip712Result<()> {
        loop {
            self.step()?;
            let closed = self.state()?.array_depth_count() <= open_before;
            self.descend(Descent::forward(closed))?;
            if closed {
                return Ok(());
            }
        }
    }

    /// Move the cursor one field forward in document order, closing array
    /// dimensions and struct depths that end on the way
    fn step(&mut self) -> Eip712Result<()> {
        let registry = self.registry;
        let path = self.path.as_mut().ok_or(Eip712Error::NotInitialized)?;
        let hashes = &mut self.hashes;

        loop {
            // arrays anchored at the current depth
            while let Some(arr) = path.array_depths.last_mut() {
                if usize::from(arr.path_index) + 1 != path.depths.len() {
                    break;
                }
                arr.index += 1;
                if arr.index < arr.size {
                    return Ok(());
                }

                // nothing hashed is fine here: an empty array hashes to keccak256("")
                let (digest, _) = hashes.finalize_top()?;
                hashes.feed(&digest)?;
                path.array_depths.pop();
                log_debug!(LOG_MODULE, "array closed", digest = hex::encode(digest));
            }

            let Some((_, field_count)) = path.nth_field_with_count(registry, path.depth_count()) else {
                return Ok(());
            };
            let Some(index) = path.depths.last_mut() else {
                return Ok(());
            };
            *index += 1;
            if usize::from(*index) < field_count {
                return Ok(());
            }

            path.depths.pop();
            let (digest, had_input) = hashes.finalize_top()?;
            if path.depths.is_empty() {
                match path.root_type {
                    RootType::Domain => self.digests.domain_hash = Some(digest),
                    RootType::Message => self.digests.message_hash = Some(digest),
                }
                log_debug!(
                    LOG_MODULE,
                    "root closed",
                    kind = format!("{:?}", path.root_type),
                    digest = hex::encode(digest),
                );
                return Ok(());
            }
            if had_input {
                hashes.feed(&digest)?;
            }
            log_debug!(LOG_MODULE, "struct closed", depth = path.depths.len());
        }
    }
}

impl<R: SchemaRegistry + ?Sized> Drop for PathEngine<'_, R> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Find the first array level along the cursor that is not open yet
fn find_array_level<'r, R>(
    path: &PathState,
    registry: &'r R,
    open: usize,
) -> Eip712Result<(usize, &'r FieldDef, ArrayLevel)>
where
    R: SchemaRegistry + ?Sized,
{
    let mut total = 0usize;
    for pidx in 0..path.depth_count() {
        let field = path
            .nth_field(registry, pidx + 1)
            .ok_or_else(|| Eip712Error::InvalidSchema("cursor points outside the schema".into()))?;
        if !field.type_is_array() {
            continue;
        }
        let preceding = total;
        total += field.array_levels.len();
        if total > open {
            // levels are outer-to-inner; the ones before `open` are already declared
            return Ok((pidx, field, field.array_levels[open - preceding]));
        }
    }
    Err(Eip712Error::NoMatchingArrayField)
}

/// Stack position of the context owned by struct depth `depth`: one context
/// per shallower depth plus one per array dimension opened beneath it
fn context_index_of_depth(path: &PathState, depth: usize) -> usize {
    let arrays_below = path
        .array_depths
        .iter()
        .filter(|arr| usize::from(arr.path_index) < depth)
        .count();
    depth + arrays_below
}
