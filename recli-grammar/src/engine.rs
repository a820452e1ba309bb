//! The `Engine` (spec.md §9's "Global mutable state" design note, resolved):
//! rather than a process-wide singleton Pool and registries, every stateful
//! piece — the Node Pool, the macro table, the data-type registry — lives on
//! one explicit struct. A `lazy_static` `Mutex<Engine>` facade is offered
//! below purely so a single process-wide default can satisfy Rust's `Sync`
//! requirement for statics; it is not an invitation to share one `Engine`
//! across threads (spec.md §5: the engine is single-threaded).

use std::rc::Rc;
use std::sync::Mutex;

use indexmap::IndexMap;
use lazy_static::lazy_static;

use crate::algebra;
use crate::error::{EngineError, RegistrationError};
use crate::node::{Handle, Validator};
use crate::pool::Pool;
use crate::{datatypes, parser};

/// Owns the Node Pool plus the two name tables a grammar source references:
/// registered macros (`NAME=body` definitions) and built-in data-types.
pub struct Engine {
    pool: Pool,
    macros: IndexMap<String, Handle>,
    types: IndexMap<String, Handle>,
}

impl Engine {
    /// A fresh engine with the twelve built-in data-types already registered
    /// (spec.md §4.6) and an empty macro table.
    pub fn new() -> Self {
        let mut pool = Pool::new();
        let mut types = IndexMap::new();
        for (name, validator) in datatypes::builtins() {
            let handle = algebra::validator_word(&mut pool, name, validator);
            types.insert(name.to_string(), handle);
        }
        Engine { pool, macros: IndexMap::new(), types }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut Pool {
        &mut self.pool
    }

    pub fn force_word(&mut self, text: &str) -> Handle {
        algebra::force_word(&mut self.pool, text)
    }

    pub fn lookup_macro(&self, name: &str) -> Option<Handle> {
        self.macros.get(name).cloned()
    }

    pub fn lookup_datatype(&self, name: &str) -> Option<Handle> {
        self.types.get(name).cloned()
    }

    /// Registers a custom validator under `name`, alongside the built-ins.
    /// Used by embedders that need a data-type this crate doesn't ship
    /// (spec.md §4.6's "the registry is open, not fixed to the built-ins").
    pub fn register_datatype(&mut self, name: &str, validator: Rc<dyn Validator>) -> Result<(), EngineError> {
        if self.types.contains_key(name) {
            return Err(RegistrationError { name: name.to_string(), message: "a data-type with this name is already registered".to_string() }.into());
        }
        let handle = algebra::validator_word(&mut self.pool, name, validator);
        self.types.insert(name.to_string(), handle);
        Ok(())
    }

    /// Binds `name` to `handle` in the macro table. A redefinition replaces
    /// the prior binding (last-definition-wins, spec.md §9's open question —
    /// see DESIGN.md) rather than erroring, so a grammar file can be
    /// re-sourced to patch one macro without restarting the process.
    pub fn register_macro(&mut self, name: &str, handle: Handle) -> Result<(), EngineError> {
        self.macros.insert(name.to_string(), handle);
        Ok(())
    }

    pub fn build_word(&mut self, raw: &str) -> Result<Handle, EngineError> {
        algebra::word(&mut self.pool, raw)
    }

    pub fn build_varargs(&mut self) -> Handle {
        algebra::varargs(&mut self.pool)
    }

    pub fn build_optional(&mut self, x: Handle) -> Result<Handle, EngineError> {
        algebra::optional(&mut self.pool, x)
    }

    pub fn build_plus(&mut self, x: Handle, min: u8) -> Result<Handle, EngineError> {
        algebra::plus(&mut self.pool, x, min)
    }

    pub fn build_concat(&mut self, a: Handle, b: Handle) -> Result<Handle, EngineError> {
        algebra::concat(&mut self.pool, a, b)
    }

    pub fn build_alternate(&mut self, a: Handle, b: Handle) -> Result<Handle, EngineError> {
        algebra::alternate(&mut self.pool, a, b)
    }

    pub fn build_macro(&mut self, name: &str, body: Handle) -> Result<Handle, EngineError> {
        algebra::macro_def(&mut self.pool, name, body)
    }

    /// Parses one grammar source line, merging it into the engine's running
    /// top-level grammar (spec.md §4.3).
    pub fn parse_line(&mut self, existing: Option<Handle>, text: &str) -> Result<Option<Handle>, EngineError> {
        parser::merge_line(self, existing, text)
    }

    /// Parses an entire grammar file, folding its lines into one top-level
    /// alternation.
    pub fn parse_file(&mut self, path: &std::path::Path) -> Result<Option<Handle>, EngineError> {
        parser::parse_file(self, path)
    }

    /// Drops every root handle the caller still holds and asserts the Pool
    /// is left empty — a test/embedder helper for verifying no grammar
    /// fragment outlives its session (spec.md §3's lifecycle guarantee).
    pub fn assert_pool_empty(&mut self) {
        assert!(self.pool.is_empty(), "pool still holds live nodes after teardown");
    }

    /// Forcibly releases the two classes of root handle that otherwise live
    /// for the process's lifetime (spec.md §3's "Lifecycle": macro
    /// definitions and validator-bearing `Word`s are rooted until the engine
    /// is torn down). After this call the Pool holds only whatever handles
    /// a caller still owns externally; a caller with none left will see
    /// `assert_pool_empty` succeed.
    pub fn teardown(&mut self) {
        self.macros.clear();
        self.types.clear();
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

lazy_static! {
    /// A process-wide convenience engine for callers that don't want to
    /// thread an `Engine` through their own state (e.g. a short-lived CLI
    /// invocation). The `Mutex` exists only to make the `static` compile;
    /// taking the lock from more than one thread at a time is a misuse of
    /// this engine, not a supported concurrent-access mode.
    pub static ref DEFAULT_ENGINE: Mutex<Engine> = Mutex::new(Engine::new());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn teardown_empties_pool_once_caller_drops_its_own_handles() {
        let mut e = Engine::new();
        let g = e.parse_line(None, "show version").unwrap().unwrap();
        drop(g);
        e.teardown();
        e.assert_pool_empty();
    }

    #[test]
    fn fresh_engine_registers_twelve_builtin_datatypes() {
        let e = Engine::new();
        for name in ["BOOLEAN", "HOSTNAME", "INTEGER", "IPADDR", "IPV4ADDR", "IPV6ADDR", "IPPREFIX", "MACADDR", "STRING", "DQSTRING", "SQSTRING", "BQSTRING"] {
            assert!(e.lookup_datatype(name).is_some(), "missing builtin {}", name);
        }
    }
}
