use std::collections::{BTreeSet, HashMap};

use super::FactDatabase;
use crate::analysis::{analyze_accesses, SnippetFact, SnippetKind};
use crate::ast::{NodeId, TranslationUnit};
use crate::error::{Result, SkipReason};

/// Snippets keyed by their exact text.
///
/// Adding a snippet whose text is already known only records the new
/// location; reads are computed when the entry is created.
#[derive(Debug, Clone, Default)]
pub struct SnippetDatabase {
    entries: Vec<SnippetFact>,
    by_content: HashMap<String, usize>,
}

impl SnippetDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        kind: SnippetKind,
        tu: &TranslationUnit,
        stmt: NodeId,
    ) -> std::result::Result<(), SkipReason> {
        let (content, location) = match (tu.text(stmt), tu.location(stmt)) {
            (Some(content), Some(location)) => (content, location),
            _ => return Err(SkipReason::InvalidLocation),
        };
        let index = match self.by_content.get(content).copied() {
            Some(index) => index,
            None => {
                self.entries.push(SnippetFact {
                    kind,
                    content: content.to_string(),
                    locations: BTreeSet::new(),
                    reads: analyze_accesses(tu, stmt).reads,
                });
                let index = self.entries.len() - 1;
                self.by_content.insert(content.to_string(), index);
                index
            }
        };
        self.entries[index].locations.insert(location);
        Ok(())
    }

    pub fn entries(&self) -> &[SnippetFact] {
        &self.entries
    }

    pub fn get(&self, content: &str) -> Option<&SnippetFact> {
        self.by_content.get(content).map(|i| &self.entries[*i])
    }
}

impl FactDatabase for SnippetDatabase {
    fn file_name(&self) -> &'static str {
        "snippets.json"
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(&self.entries)?)
    }
}
