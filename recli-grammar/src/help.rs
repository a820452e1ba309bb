//! The Help Binder (spec.md §4.7): reads a Markdown-ish help source into two
//! parallel grammar forests — `long_help` and `short_help` — whose leaves
//! are opaque `force_word` help-text blobs, then answers lookups against
//! those forests with the same Matcher primitives used for validation and
//! completion.
//!
//! The source's single combined tree with a `kind` tag on each leaf becomes
//! two separate trees here: which forest a leaf lives in already says
//! whether it's long- or short-form, so the tag collapses away (see
//! DESIGN.md).

use std::fs;
use std::path::Path;

use crate::engine::Engine;
use crate::error::EngineError;
use crate::matcher::{frontier, match_word};
use crate::node::{Handle, NodeData};

pub struct HelpBinder {
    long_help: Option<Handle>,
    short_help: Option<Handle>,
}

impl HelpBinder {
    pub fn new() -> Self {
        HelpBinder { long_help: None, short_help: None }
    }

    /// Parses a command path heading (`#`/`##`/… stripped) as a plain
    /// sequence of words — no alternation, optional, repetition, or macro
    /// syntax is recognized here, per spec.md §4.7.
    fn bind_heading_path(engine: &mut Engine, text: &str) -> Result<Handle, EngineError> {
        let mut acc: Option<Handle> = None;
        for word in text.split_whitespace() {
            let leaf = if is_all_upper(word) {
                engine
                    .lookup_datatype(word)
                    .or_else(|| engine.lookup_macro(word))
                    .ok_or_else(|| crate::error::StructureError { byte_offset: 0, message: format!("'{}' is not a registered macro or data-type", word) })?
            } else {
                engine.build_word(word)?
            };
            acc = Some(match acc {
                None => leaf,
                Some(prev) => engine.build_concat(prev, leaf)?,
            });
        }
        acc.ok_or_else(|| crate::error::StructureError { byte_offset: 0, message: "empty help heading".to_string() }.into())
    }

    fn flush(&mut self, engine: &mut Engine, path: &Handle, long_text: &str, short_text: &str) -> Result<(), EngineError> {
        if !long_text.is_empty() {
            let leaf = engine.force_word(long_text.trim_end());
            let frag = engine.build_concat(path.clone(), leaf)?;
            self.long_help = Some(match self.long_help.take() {
                None => frag,
                Some(existing) => engine.build_alternate(existing, frag)?,
            });
        }
        if !short_text.is_empty() {
            let leaf = engine.force_word(short_text.trim_end());
            let frag = engine.build_concat(path.clone(), leaf)?;
            self.short_help = Some(match self.short_help.take() {
                None => frag,
                Some(existing) => engine.build_alternate(existing, frag)?,
            });
        }
        Ok(())
    }

    /// Reads a whole help source file, binding each heading's trailing
    /// prose into `long_help` and each four-space-indented line into
    /// `short_help`.
    pub fn parse_file(&mut self, engine: &mut Engine, path: &Path) -> Result<(), EngineError> {
        let contents = fs::read_to_string(path).map_err(|e| EngineError::Io(format!("{}: {}", path.display(), e)))?;
        let mut current_path: Option<Handle> = None;
        let mut long_text = String::new();
        let mut short_text = String::new();

        for line in contents.lines() {
            if let Some(heading_text) = strip_heading(line) {
                if let Some(path) = current_path.take() {
                    self.flush(engine, &path, &long_text, &short_text)?;
                }
                long_text.clear();
                short_text.clear();
                current_path = Some(Self::bind_heading_path(engine, heading_text)?);
            } else if current_path.is_some() {
                if line.trim().is_empty() {
                    continue;
                }
                if is_short_help_line(line) {
                    short_text.push_str(line[4..].trim_end());
                    short_text.push('\n');
                } else {
                    long_text.push_str(line.trim());
                    long_text.push('\n');
                }
            }
        }
        if let Some(path) = current_path.take() {
            self.flush(engine, &path, &long_text, &short_text)?;
        }
        Ok(())
    }

    /// Consumes `argv` word by word against `forest`, returning the residual
    /// node once every word is accounted for (spec.md §4.7's "uses
    /// Match-max to locate the path then walks its alternation tail" —
    /// realized here via repeated Match-word, the same primitive Tab
    /// Completion uses, since the forest's trailing help leaf is never
    /// itself present in `argv`).
    fn locate(engine: &mut Engine, forest: &Option<Handle>, argv: &[String]) -> Option<Handle> {
        let mut cur = forest.clone()?;
        for word in argv {
            match match_word(engine, &cur, word, true) {
                Some(Some(next)) => cur = next,
                Some(None) => return None,
                None => return None,
            }
        }
        Some(cur)
    }

    fn leaf_text(node: &Handle) -> Option<&str> {
        match node.data() {
            NodeData::Word(w) if w.validator.is_none() => Some(&w.text),
            _ => None,
        }
    }

    /// `show_help(argv)`: the long-form help text bound to `argv`'s command
    /// path, if any.
    pub fn show_help(&self, engine: &mut Engine, argv: &[String]) -> Option<String> {
        let residual = Self::locate(engine, &self.long_help, argv)?;
        Self::leaf_text(&residual).map(|s| s.to_string())
    }

    /// `print_context_help(argv)`: the short-form (`?`) help text, rendered
    /// with the path that produced it.
    pub fn print_context_help(&self, engine: &mut Engine, argv: &[String]) -> Option<String> {
        let residual = Self::locate(engine, &self.short_help, argv)?;
        let text = Self::leaf_text(&residual)?;
        Some(format!("{}\n  {}", argv.join(" "), text))
    }

    /// `print_context_help_subcommands(syntax, argv)`: every legal next word
    /// under `argv` in `syntax`, each padded to a common width and followed
    /// by its short help when `self.short_help` has one for that position
    /// (or the bare word when it doesn't).
    pub fn print_context_help_subcommands(&self, engine: &mut Engine, syntax: &Handle, argv: &[String]) -> String {
        let next_words: Vec<String> = match Self::locate(engine, &Some(syntax.clone()), argv) {
            Some(residual) => frontier(engine, &residual)
                .into_iter()
                .filter(|item| !item.is_empty_alternative)
                .filter_map(|item| match item.leaf.data() {
                    NodeData::Word(w) if w.validator.is_none() => Some(w.text.clone()),
                    NodeData::Varargs => Some("...".to_string()),
                    _ => None,
                })
                .collect(),
            None => Vec::new(),
        };

        let help_residual = Self::locate(engine, &self.short_help, argv);
        let mut pairs: Vec<(String, Option<String>)> = Vec::new();
        let width = next_words.iter().map(|w| w.len()).max().unwrap_or(0);
        for word in next_words {
            let short = help_residual.as_ref().and_then(|r| {
                frontier(engine, r).into_iter().find_map(|item| match item.leaf.data() {
                    NodeData::Word(w) if w.text == word => {
                        item.residual.as_ref().and_then(Self::leaf_text).map(|s| s.to_string())
                    }
                    _ => None,
                })
            });
            pairs.push((word, short));
        }

        let mut out = String::new();
        for (word, short) in pairs {
            match short {
                Some(text) => out.push_str(&format!("  {:<width$}  {}\n", word, text, width = width)),
                None => out.push_str(&format!("  {}\n", word)),
            }
        }
        out
    }
}

impl Default for HelpBinder {
    fn default() -> Self {
        HelpBinder::new()
    }
}

fn strip_heading(line: &str) -> Option<&str> {
    if !line.starts_with('#') {
        return None;
    }
    Some(line.trim_start_matches('#').trim())
}

fn is_short_help_line(line: &str) -> bool {
    line.len() > 4 && line.starts_with("    ") && line.as_bytes()[4] != b' '
}

fn is_all_upper(word: &str) -> bool {
    let bytes = word.as_bytes();
    !bytes.is_empty() && bytes[0].is_ascii_alphabetic() && bytes.iter().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || *b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use std::path::PathBuf;

    struct ScratchFile(PathBuf);

    impl ScratchFile {
        fn new(name: &str, contents: &str) -> Self {
            let path = std::env::temp_dir().join(format!("recli-help-test-{}-{}", std::process::id(), name));
            std::fs::write(&path, contents).unwrap();
            ScratchFile(path)
        }
    }

    impl Drop for ScratchFile {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.0);
        }
    }

    #[test]
    fn binds_heading_and_prose_into_long_help() {
        let mut e = Engine::new();
        let f = ScratchFile::new("long", "# show version\nPrints the running version string.\n");
        let mut binder = HelpBinder::new();
        binder.parse_file(&mut e, &f.0).unwrap();
        let argv = vec!["show".to_string(), "version".to_string()];
        assert_eq!(binder.show_help(&mut e, &argv).as_deref(), Some("Prints the running version string."));
    }

    #[test]
    fn binds_four_space_line_into_short_help() {
        let mut e = Engine::new();
        let f = ScratchFile::new("short", "# show version\n    Show the version.\nMore detail here.\n");
        let mut binder = HelpBinder::new();
        binder.parse_file(&mut e, &f.0).unwrap();
        let argv = vec!["show".to_string(), "version".to_string()];
        let short = binder.print_context_help(&mut e, &argv).unwrap();
        assert!(short.contains("Show the version."));
    }

    #[test]
    fn unknown_path_returns_none() {
        let mut e = Engine::new();
        let f = ScratchFile::new("unknown", "# show version\nDetails.\n");
        let mut binder = HelpBinder::new();
        binder.parse_file(&mut e, &f.0).unwrap();
        let argv = vec!["reboot".to_string()];
        assert!(binder.show_help(&mut e, &argv).is_none());
    }
}
