//! Pipeline runner that feeds loaded units to the indexers.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use super::{functions, insertions, loops, snippets, statements};
use crate::analysis::LoadedUnit;
use crate::ast::TranslationUnit;
use crate::db::{
    FactDatabase, FunctionDatabase, InsertionPointDatabase, LoopDatabase, SnippetDatabase,
    StatementDatabase,
};
use crate::liveness::{CfgLiveness, LivenessProvider};

/// One kind of fact extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pipeline {
    Functions,
    Loops,
    Insertions,
    Snippets,
    Statements,
}

impl Pipeline {
    pub const ALL: [Pipeline; 5] = [
        Pipeline::Functions,
        Pipeline::Loops,
        Pipeline::Insertions,
        Pipeline::Snippets,
        Pipeline::Statements,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Pipeline::Functions => "functions",
            Pipeline::Loops => "loops",
            Pipeline::Insertions => "insertions",
            Pipeline::Snippets => "snippets",
            Pipeline::Statements => "statements",
        }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSummary {
    pub pipeline: Pipeline,
    /// Distinct files indexed.
    pub units: usize,
    /// Units skipped because their file was already indexed.
    pub duplicates: usize,
    pub entries: usize,
    /// File the facts were written to, if any.
    pub output: Option<PathBuf>,
}

/// Runs indexing pipelines over loaded translation units.
pub struct Runner {
    strict_statements: bool,
    liveness: Box<dyn LivenessProvider>,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    pub fn new() -> Self {
        Self {
            strict_statements: true,
            liveness: Box::new(CfgLiveness),
        }
    }

    /// Also exclude literals and initializer lists from statements.
    pub fn strict_statements(mut self, strict: bool) -> Self {
        self.strict_statements = strict;
        self
    }

    /// Replace the liveness provider.
    pub fn liveness(mut self, provider: Box<dyn LivenessProvider>) -> Self {
        self.liveness = provider;
        self
    }

    /// Run one pipeline and return its database.
    pub fn run(
        &self,
        pipeline: Pipeline,
        units: &[Arc<LoadedUnit>],
    ) -> (Box<dyn FactDatabase>, PipelineSummary) {
        let (db, visits) = match pipeline {
            Pipeline::Functions => boxed(self.functions(units)),
            Pipeline::Loops => boxed(self.loops(units)),
            Pipeline::Insertions => boxed(self.insertions(units)),
            Pipeline::Snippets => boxed(self.snippets(units)),
            Pipeline::Statements => boxed(self.statements(units)),
        };
        let summary = PipelineSummary {
            pipeline,
            units: visits.indexed,
            duplicates: visits.duplicates,
            entries: db.len(),
            output: None,
        };
        info!(
            pipeline = %pipeline,
            units = summary.units,
            entries = summary.entries,
            "pipeline finished"
        );
        (db, summary)
    }

    pub fn statements(&self, units: &[Arc<LoadedUnit>]) -> (StatementDatabase, Visits) {
        let mut db = StatementDatabase::new();
        let visits = each_new_unit(units, |tu| {
            statements::index_unit(tu, self.liveness.as_ref(), self.strict_statements, &mut db)
        });
        (db, visits)
    }

    pub fn snippets(&self, units: &[Arc<LoadedUnit>]) -> (SnippetDatabase, Visits) {
        let mut db = SnippetDatabase::new();
        let visits = each_new_unit(units, |tu| snippets::index_unit(tu, &mut db));
        (db, visits)
    }

    pub fn insertions(&self, units: &[Arc<LoadedUnit>]) -> (InsertionPointDatabase, Visits) {
        let mut db = InsertionPointDatabase::new();
        let visits = each_new_unit(units, |tu| {
            insertions::index_unit(tu, self.strict_statements, &mut db)
        });
        (db, visits)
    }

    pub fn loops(&self, units: &[Arc<LoadedUnit>]) -> (LoopDatabase, Visits) {
        let mut db = LoopDatabase::new();
        let visits = each_new_unit(units, |tu| loops::index_unit(tu, &mut db));
        (db, visits)
    }

    pub fn functions(&self, units: &[Arc<LoadedUnit>]) -> (FunctionDatabase, Visits) {
        let mut db = FunctionDatabase::new();
        let visits = each_new_unit(units, |tu| functions::index_unit(tu, &mut db));
        (db, visits)
    }
}

/// Unit counts of one traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Visits {
    pub indexed: usize,
    pub duplicates: usize,
}

fn boxed<D: FactDatabase + 'static>((db, visits): (D, Visits)) -> (Box<dyn FactDatabase>, Visits) {
    (Box::new(db), visits)
}

/// Call `index` for each unit whose file has not been seen in this traversal.
fn each_new_unit<F>(units: &[Arc<LoadedUnit>], mut index: F) -> Visits
where
    F: FnMut(&TranslationUnit),
{
    let mut visited: HashSet<&PathBuf> = HashSet::new();
    let mut visits = Visits::default();
    for unit in units {
        if !visited.insert(&unit.path) {
            debug!(path = %unit.path.display(), "already indexed");
            visits.duplicates += 1;
            continue;
        }
        index(&unit.tu);
        visits.indexed += 1;
    }
    visits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::testing::lower;

    fn unit(path: &str, src: &str) -> Arc<LoadedUnit> {
        Arc::new(LoadedUnit {
            path: PathBuf::from(path),
            language: "c",
            tu: lower(path, src),
        })
    }

    #[test]
    fn test_each_file_indexed_once() {
        let a = unit("/p/a.c", "void f(int x) {\n  x++;\n}\n");
        let b = unit("/p/b.c", "void g(int y) {\n  y--;\n  y++;\n}\n");
        let units = vec![a.clone(), b, a];

        let runner = Runner::new();
        let (db, summary) = runner.run(Pipeline::Statements, &units);
        assert_eq!(db.len(), 3);
        assert_eq!(summary.units, 2);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.entries, 3);
        assert_eq!(db.file_name(), "statements.json");
    }

    #[test]
    fn test_every_pipeline_has_its_file() {
        let units = vec![unit(
            "/p/a.c",
            "void g(void);\nint f(int n) {\n  while (n) {\n    if (n == 3) break;\n    g();\n    n--;\n  }\n  return n;\n}\n",
        )];
        let runner = Runner::new();
        let mut names = Vec::new();
        for pipeline in Pipeline::ALL {
            let (db, summary) = runner.run(pipeline, &units);
            assert!(!db.is_empty(), "{} produced nothing", pipeline);
            assert_eq!(summary.pipeline, pipeline);
            names.push(db.file_name());
        }
        assert_eq!(
            names,
            vec![
                "functions.json",
                "loops.json",
                "insertion-points.json",
                "snippets.json",
                "statements.json"
            ]
        );
    }

    #[test]
    fn test_lenient_statements_keep_literals() {
        let units = vec![unit("/p/a.c", "void f(void) {\n  42;\n}\n")];
        let (strict, _) = Runner::new().statements(&units);
        let (lenient, _) = Runner::new().strict_statements(false).statements(&units);
        assert!(strict.is_empty());
        assert_eq!(lenient.entries()[0].kind, "IntegerLiteral");
    }
}
