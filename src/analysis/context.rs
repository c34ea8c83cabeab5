//! Loading and caching of translation units.
//!
//! The AnalysisContext provides:
//! - Frontend selection by `-x` flag or file extension
//! - Parallel parsing of a compilation database
//! - Project membership of every loaded file
//! - Caching, so that pipelines run in one invocation share parsed units

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use globset::GlobSet;
use rayon::prelude::*;
use tracing::debug;

use crate::analysis::{get_frontend, get_frontend_by_id, Frontend};
use crate::ast::TranslationUnit;
use crate::compdb::{canonical, CompileCommand};
use crate::error::{IndexError, Result};

/// A parsed and lowered source file.
#[derive(Debug)]
pub struct LoadedUnit {
    /// Canonical path; also the file name used in locations.
    pub path: PathBuf,
    pub language: &'static str,
    pub tu: TranslationUnit,
}

pub struct AnalysisContext {
    project_root: PathBuf,
    excluded: GlobSet,
    /// Loaded units, keyed by canonical path.
    cache: RwLock<HashMap<PathBuf, Arc<LoadedUnit>>>,
}

impl AnalysisContext {
    pub fn new<P: AsRef<Path>>(project_root: P, excluded: GlobSet) -> Self {
        Self {
            project_root: canonical(project_root.as_ref()),
            excluded,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Whether facts may be extracted from `path` (a canonical path).
    pub fn is_in_project(&self, path: &Path) -> bool {
        if !path.starts_with(&self.project_root) {
            return false;
        }
        let relative = path.strip_prefix(&self.project_root).unwrap_or(path);
        !(self.excluded.is_match(path) || self.excluded.is_match(relative))
    }

    /// Parse and lower the file of one compile command.
    ///
    /// Returns the cached unit if the file was loaded before.
    pub fn load(&self, command: &CompileCommand) -> Result<Arc<LoadedUnit>> {
        if !command.file.is_file() {
            return Err(IndexError::MissingInput(command.file.clone()));
        }
        let path = canonical(&command.file);

        if let Some(unit) = self.read_cache().get(&path) {
            return Ok(Arc::clone(unit));
        }

        let frontend = select_frontend(command, &path)?;
        let source = fs::read(&path).map_err(|source| IndexError::Io {
            path: path.clone(),
            source,
        })?;
        let parsed = frontend.parse(&path, &source)?;
        let mut tu = frontend.lower(&parsed)?;
        let in_project = self.is_in_project(&path);
        tu.file_mut().set_in_project(in_project);
        debug!(
            path = %path.display(),
            language = frontend.language_id(),
            nodes = tu.len(),
            in_project,
            "loaded translation unit"
        );

        let unit = Arc::new(LoadedUnit {
            path: path.clone(),
            language: frontend.language_id(),
            tu,
        });
        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        Ok(Arc::clone(cache.entry(path).or_insert(unit)))
    }

    /// Load every command in parallel. Results keep the input order; the
    /// first failure aborts.
    pub fn load_all(&self, commands: &[CompileCommand]) -> Result<Vec<Arc<LoadedUnit>>> {
        commands.par_iter().map(|c| self.load(c)).collect()
    }

    /// Number of distinct files loaded so far.
    pub fn cached_units(&self) -> usize {
        self.read_cache().len()
    }

    fn read_cache(&self) -> std::sync::RwLockReadGuard<'_, HashMap<PathBuf, Arc<LoadedUnit>>> {
        self.cache.read().unwrap_or_else(|e| e.into_inner())
    }
}

fn select_frontend(command: &CompileCommand, path: &Path) -> Result<&'static dyn Frontend> {
    let by_flag = command.language().and_then(get_frontend_by_id);
    let by_extension = || {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(get_frontend)
    };
    by_flag
        .or_else(by_extension)
        .ok_or_else(|| IndexError::UnsupportedLanguage(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use globset::{Glob, GlobSetBuilder};
    use tempfile::TempDir;

    fn excluded(patterns: &[&str]) -> GlobSet {
        let mut builder = GlobSetBuilder::new();
        for p in patterns {
            builder.add(Glob::new(p).unwrap());
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_load_marks_project_membership() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("proj");
        fs::create_dir_all(root.join("vendor")).unwrap();
        fs::write(root.join("main.c"), "int main(void) { return 0; }\n").unwrap();
        fs::write(root.join("vendor/lib.c"), "void lib(void) {}\n").unwrap();
        fs::write(temp.path().join("outside.c"), "void o(void) {}\n").unwrap();

        let ctx = AnalysisContext::new(&root, excluded(&["vendor/**"]));
        let main = ctx.load(&CompileCommand::plain(root.join("main.c"))).unwrap();
        assert!(main.tu.file().in_project());
        assert_eq!(main.language, "c");
        assert!(main.path.is_absolute());

        let lib = ctx.load(&CompileCommand::plain(root.join("vendor/lib.c"))).unwrap();
        assert!(!lib.tu.file().in_project());

        let outside = ctx
            .load(&CompileCommand::plain(temp.path().join("outside.c")))
            .unwrap();
        assert!(!outside.tu.file().in_project());
    }

    #[test]
    fn test_language_flag_overrides_extension() {
        let temp = TempDir::new().unwrap();
        let header = temp.path().join("shape.h");
        fs::write(&header, "struct S { int n; void f() { n = 1; } };\n").unwrap();

        let ctx = AnalysisContext::new(temp.path(), GlobSet::empty());
        let mut command = CompileCommand::plain(header);
        command.arguments = vec!["c++".into(), "-x".into(), "c++".into()];
        let unit = ctx.load(&command).unwrap();
        assert_eq!(unit.language, "cpp");
    }

    #[test]
    fn test_load_all_preserves_order_and_caches() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.c");
        let b = temp.path().join("b.cpp");
        fs::write(&a, "int a;\n").unwrap();
        fs::write(&b, "int b;\n").unwrap();

        let ctx = AnalysisContext::new(temp.path(), GlobSet::empty());
        let commands = vec![
            CompileCommand::plain(b.clone()),
            CompileCommand::plain(a.clone()),
            CompileCommand::plain(b.clone()),
        ];
        let units = ctx.load_all(&commands).unwrap();
        assert_eq!(units.len(), 3);
        assert!(units[0].path.ends_with("b.cpp"));
        assert!(units[1].path.ends_with("a.c"));
        assert!(Arc::ptr_eq(&units[0], &units[2]));
        assert_eq!(ctx.cached_units(), 2);
    }

    #[test]
    fn test_missing_and_unsupported_inputs() {
        let temp = TempDir::new().unwrap();
        let ctx = AnalysisContext::new(temp.path(), GlobSet::empty());
        assert!(matches!(
            ctx.load(&CompileCommand::plain(temp.path().join("gone.c"))),
            Err(IndexError::MissingInput(_))
        ));

        let script = temp.path().join("run.py");
        fs::write(&script, "print(1)\n").unwrap();
        assert!(matches!(
            ctx.load(&CompileCommand::plain(script)),
            Err(IndexError::UnsupportedLanguage(_))
        ));
    }
}
