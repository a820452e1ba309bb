//! A hash-consed, normalized syntax forest for a restricted command-line
//! shell's grammar DSL: parsing (`parser`), argument validation and greedy
//! reconstruction (`matcher`), tab completion (`complete`), and
//! context-sensitive help (`help`), all built on a content-addressable Node
//! Pool (`pool`) and a small Node Algebra (`algebra`) that keeps every
//! interned node in one canonical, normalized form. `unparse` renders a node
//! back to grammar source text, mostly useful for debugging and tests.

pub mod algebra;
pub mod complete;
pub mod datatypes;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod help;
pub mod matcher;
pub mod node;
pub mod parser;
pub mod pool;
pub mod tokenize;
pub mod unparse;

pub use complete::tab_complete;
pub use engine::{Engine, DEFAULT_ENGINE};
pub use error::EngineError;
pub use help::HelpBinder;
pub use matcher::{check, match_max, match_word, Progress};
pub use node::{Handle, Validator};
pub use unparse::unparse;
