//! Hash-Context Stack
//!
//! One Keccak-256 accumulator per open structural scope, allocated from a
//! fixed number of slots. Contexts are strictly last-in-first-out except for
//! [`HashStack::push_below`], which slides a new array accumulator under the
//! element scope it collects.

use crate::error::{Eip712Error, Eip712Result};
use std::fmt;
use tiny_keccak::{Hasher, Keccak};

/// Incremental Keccak-256 accumulator
#[derive(Clone)]
pub struct HashContext {
    state: Option<Keccak>,
    absorbed: usize,
}

impl HashContext {
    /// Seeded context, ready to absorb bytes
    pub fn fresh() -> Self {
        Self {
            state: Some(Keccak::v256()),
            absorbed: 0,
        }
    }

    /// Zeroed context, must be seeded before use
    pub fn unseeded() -> Self {
        Self {
            state: None,
            absorbed: 0,
        }
    }

    pub fn is_seeded(&self) -> bool {
        self.state.is_some()
    }

    /// Number of bytes fed so far
    pub fn absorbed(&self) -> usize {
        self.absorbed
    }

    fn update(&mut self, bytes: &[u8]) -> Eip712Result<()> {
        let state = self.state.as_mut().ok_or(Eip712Error::NotInitialized)?;
        state.update(bytes);
        self.absorbed += bytes.len();
        Ok(())
    }

    fn finalize(self) -> Eip712Result<([u8; 32], bool)> {
        let state = self.state.ok_or(Eip712Error::NotInitialized)?;
        let mut digest = [0u8; 32];
        state.finalize(&mut digest);
        Ok((digest, self.absorbed > 0))
    }
}

impl fmt::Debug for HashContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashContext")
            .field("seeded", &self.is_seeded())
            .field("absorbed", &self.absorbed)
            .finish()
    }
}

/// Fixed-capacity stack of hash contexts
#[derive(Debug, Clone)]
pub struct HashStack {
    contexts: Vec<HashContext>,
    slots: usize,
}

impl HashStack {
    pub fn new(slots: usize) -> Self {
        Self {
            contexts: Vec::with_capacity(slots),
            slots,
        }
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Total number of slots in the arena
    pub fn slots(&self) -> usize {
        self.slots
    }

    /// Context at a stack position, bottom is 0
    pub fn get(&self, index: usize) -> Option<&HashContext> {
        self.contexts.get(index)
    }

    pub fn top(&self) -> Option<&HashContext> {
        self.contexts.last()
    }

    /// Allocate a new context on top
    pub fn push(&mut self, initialize: bool) -> Eip712Result<()> {
        if self.contexts.len() == self.slots {
            return Err(Eip712Error::OutOfMemory);
        }
        self.contexts.push(if initialize {
            HashContext::fresh()
        } else {
            HashContext::unseeded()
        });
        Ok(())
    }

    /// Allocate a new context and place it at `index`, shifting the
    /// contexts above it up by one
    pub fn push_below(&mut self, index: usize, initialize: bool) -> Eip712Result<()> {
        if index > self.contexts.len() {
            return Err(Eip712Error::InvalidSchema(format!(
                "no hash context at position {}",
                index
            )));
        }
        self.push(initialize)?;
        self.contexts[index..].rotate_right(1);
        Ok(())
    }

    /// Replace the context at `index` with a freshly seeded one
    pub fn reseed(&mut self, index: usize) -> Eip712Result<()> {
        let ctx = self
            .contexts
            .get_mut(index)
            .ok_or(Eip712Error::NotInitialized)?;
        *ctx = HashContext::fresh();
        Ok(())
    }

    /// Feed bytes to the top context
    pub fn feed(&mut self, bytes: &[u8]) -> Eip712Result<()> {
        self.contexts
            .last_mut()
            .ok_or(Eip712Error::NotInitialized)?
            .update(bytes)
    }

    /// Finalize and remove the top context; the flag tells whether anything
    /// was fed to it
    pub fn finalize_top(&mut self) -> Eip712Result<([u8; 32], bool)> {
        self.contexts
            .pop()
            .ok_or(Eip712Error::NotInitialized)?
            .finalize()
    }

    /// Release every context
    pub fn clear(&mut self) {
        self.contexts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eip712::encoder::keccak256;

    #[test]
    fn test_finalize_reports_input() {
        let mut stack = HashStack::new(4);
        stack.push(true).unwrap();
        stack.feed(b"hello").unwrap();
        stack.push(true).unwrap();

        let (digest, had_input) = stack.finalize_top().unwrap();
        assert!(!had_input);
        assert_eq!(digest, keccak256(b""));

        let (digest, had_input) = stack.finalize_top().unwrap();
        assert!(had_input);
        assert_eq!(digest, keccak256(b"hello"));
        assert!(stack.is_empty());
    }

    #[test]
    fn test_arena_exhaustion() {
        let mut stack = HashStack::new(2);
        stack.push(true).unwrap();
        stack.push(false).unwrap();
        assert_eq!(stack.push(true), Err(Eip712Error::OutOfMemory));
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn test_unseeded_context_rejects_input() {
        let mut stack = HashStack::new(2);
        stack.push(false).unwrap();
        assert_eq!(stack.feed(b"x"), Err(Eip712Error::NotInitialized));

        stack.reseed(0).unwrap();
        stack.feed(b"x").unwrap();
        assert_eq!(stack.top().unwrap().absorbed(), 1);
    }

    #[test]
    fn test_push_below_keeps_upper_state() {
        let mut stack = HashStack::new(4);
        stack.push(true).unwrap();
        stack.push(true).unwrap();
        stack.feed(b"element").unwrap();

        stack.push_below(1, true).unwrap();
        assert_eq!(stack.len(), 3);
        assert_eq!(stack.get(1).unwrap().absorbed(), 0);
        assert_eq!(stack.top().unwrap().absorbed(), 7);
    }

    #[test]
    fn test_empty_stack_operations() {
        let mut stack = HashStack::new(1);
        assert_eq!(stack.feed(b"x"), Err(Eip712Error::NotInitialized));
        assert!(stack.finalize_top().is_err());
        stack.clear();
        stack.clear();
        assert!(stack.is_empty());
    }
}
