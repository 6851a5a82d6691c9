//! Mutable project state that contexts are opened from.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use thiserror::Error;

use super::context::MemoryContext;
use crate::context::Registration;
use crate::kind::DeclKind;

/// Error opening or editing a workspace.
#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum ContextError {
    #[error("workspace has been closed")]
    Closed,
    #[error("no source file `{file}` in the workspace")]
    UnknownFile { file: Arc<str> },
    #[error("`{binary_name}` is not a valid binary name for a {kind}")]
    InvalidStub { binary_name: Arc<str>, kind: DeclKind },
}

/// A type known only by its binary name, with no member list.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct BinaryStub {
    pub binary_name: Arc<str>,
    pub kind: DeclKind,
}

type Callback = Box<dyn FnOnce() + Send>;

/// Shared "background index in progress" flag with one-shot completion
/// callbacks.
#[derive(Default)]
pub struct IndexMonitor {
    indexing: AtomicBool,
    waiting: Mutex<Vec<Callback>>,
}

impl IndexMonitor {
    pub fn new() -> Self {
        IndexMonitor::default()
    }

    /// Mark indexing as started.
    pub fn begin(&self) {
        let _waiting = self.waiting.lock();
        self.indexing.store(true, Ordering::Release);
    }

    pub fn is_indexing(&self) -> bool {
        self.indexing.load(Ordering::Acquire)
    }

    /// Number of callbacks waiting for the index to finish.
    pub fn pending(&self) -> usize {
        self.waiting.lock().len()
    }

    /// Mark indexing as finished and run every waiting callback on the
    /// calling thread. Returns how many callbacks ran.
    pub fn finish(&self) -> usize {
        let callbacks = {
            let mut waiting = self.waiting.lock();
            self.indexing.store(false, Ordering::Release);
            std::mem::take(&mut *waiting)
        };
        let count = callbacks.len();
        tracing::debug!(callbacks = count, "index finished");
        for callback in callbacks {
            callback();
        }
        count
    }

    /// Run `task` after the index finishes, or now when it is not running.
    pub fn run_when_finished(&self, task: Callback) -> Registration {
        let mut waiting = self.waiting.lock();
        if self.indexing.load(Ordering::Acquire) {
            waiting.push(task);
            return Registration::Deferred;
        }
        drop(waiting);
        task();
        Registration::RanImmediately
    }
}

impl std::fmt::Debug for IndexMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexMonitor")
            .field("indexing", &self.is_indexing())
            .field("pending", &self.pending())
            .finish()
    }
}

#[derive(Default, Debug)]
struct State {
    files: BTreeMap<Arc<str>, Arc<str>>,
    stubs: Vec<BinaryStub>,
    modules: Vec<Arc<str>>,
    generation: u64,
    closed: bool,
}

/// File texts, binary stubs and modules of a project, plus its indexer.
///
/// Every [`Workspace::open`] builds a fresh [`MemoryContext`] from the
/// current state, so ids from one context never line up with another.
#[derive(Default, Debug)]
pub struct Workspace {
    state: RwLock<State>,
    monitor: Arc<IndexMonitor>,
}

impl Workspace {
    pub fn new() -> Self {
        Workspace::default()
    }

    pub fn with_files<'s>(files: impl IntoIterator<Item = (&'s str, &'s str)>) -> Self {
        let workspace = Workspace::new();
        for (path, text) in files {
            workspace.set_file(path, text);
        }
        workspace
    }

    pub fn monitor(&self) -> &Arc<IndexMonitor> {
        &self.monitor
    }

    /// Bumped by every edit.
    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }

    /// Add or replace a source file.
    pub fn set_file(&self, path: &str, text: &str) {
        let mut state = self.state.write();
        state.files.insert(Arc::from(path), Arc::from(text));
        state.generation += 1;
    }

    pub fn remove_file(&self, path: &str) -> Result<(), ContextError> {
        let mut state = self.state.write();
        if state.files.remove(path).is_none() {
            return Err(ContextError::UnknownFile {
                file: Arc::from(path),
            });
        }
        state.generation += 1;
        Ok(())
    }

    pub fn file_text(&self, path: &str) -> Option<Arc<str>> {
        self.state.read().files.get(path).cloned()
    }

    /// Register a type known only by binary name, like a classfile with no
    /// attributed members.
    pub fn add_stub(&self, binary_name: &str, kind: DeclKind) -> Result<(), ContextError> {
        let valid = kind.is_type()
            && !binary_name.is_empty()
            && binary_name
                .split(['.', '$'])
                .all(|part| !part.is_empty());
        if !valid {
            return Err(ContextError::InvalidStub {
                binary_name: Arc::from(binary_name),
                kind,
            });
        }
        let mut state = self.state.write();
        state.stubs.push(BinaryStub {
            binary_name: Arc::from(binary_name),
            kind,
        });
        state.generation += 1;
        Ok(())
    }

    pub fn add_module(&self, name: &str) {
        let mut state = self.state.write();
        state.modules.push(Arc::from(name));
        state.generation += 1;
    }

    /// Build a context from the current state.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn open(&self) -> Result<MemoryContext, ContextError> {
        let state = self.state.read();
        if state.closed {
            return Err(ContextError::Closed);
        }
        let files: Vec<(Arc<str>, Arc<str>)> = state
            .files
            .iter()
            .map(|(path, text)| (Arc::clone(path), Arc::clone(text)))
            .collect();
        Ok(MemoryContext::build(
            &files,
            &state.stubs,
            &state.modules,
            Arc::clone(&self.monitor),
            state.generation,
        ))
    }

    /// Refuse further [`Workspace::open`] calls.
    pub fn close(&self) {
        self.state.write().closed = true;
    }
}
