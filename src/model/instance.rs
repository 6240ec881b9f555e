//! The host document model of one filing.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use super::fact::{Context, Fact, FactId, Unit};
use super::presentation::{PresentationArc, PresentationNetwork};
use super::qname::QName;
use super::types::Concept;

/// Errors raised while loading a host model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Failed to read instance file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse instance JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Duplicate concept declaration: {0}")]
    DuplicateConcept(String),

    #[error("Footnote references unknown fact {0}")]
    UnknownFact(usize),
}

pub type ModelResult<T> = Result<T, ModelError>;

/// An extended link role with its definition text,
/// e.g. `0020 - Statement - Consolidated Balance Sheets`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleType {
    pub uri: String,
    #[serde(default)]
    pub definition: String,
}

/// A dimension-default relationship from the definition linkbase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionDefault {
    pub dimension: QName,
    pub default: QName,
}

/// A footnote attached to a fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Footnote {
    pub fact: FactId,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
struct InstanceIndex {
    concepts: HashMap<QName, usize>,
    contexts: HashMap<String, usize>,
    units: HashMap<String, usize>,
    presentation: PresentationNetwork,
}

/// The filing as exposed by the host XBRL processor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Instance {
    /// Base name of the entry point document.
    pub entry_point: String,

    /// Prefix → namespace for every namespace document in the DTS.
    #[serde(default)]
    pub namespaces: BTreeMap<String, String>,

    #[serde(default)]
    pub concepts: Vec<Concept>,

    #[serde(default)]
    pub roles: Vec<RoleType>,

    #[serde(default)]
    pub contexts: Vec<Context>,

    #[serde(default)]
    pub units: Vec<Unit>,

    #[serde(default)]
    pub facts: Vec<Fact>,

    #[serde(default)]
    pub presentation: Vec<PresentationArc>,

    #[serde(default)]
    pub dimension_defaults: Vec<DimensionDefault>,

    #[serde(default)]
    pub footnotes: Vec<Footnote>,

    #[serde(skip)]
    index: InstanceIndex,
}

impl Instance {
    pub fn new(entry_point: impl Into<String>) -> Self {
        Self {
            entry_point: entry_point.into(),
            ..Self::default()
        }
    }

    /// Load an exported instance from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ModelResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> ModelResult<Self> {
        let mut instance: Instance = serde_json::from_str(json)?;
        instance.reindex()?;
        Ok(instance)
    }

    /// Rebuild lookup tables after the public fields changed.
    pub fn reindex(&mut self) -> ModelResult<()> {
        let mut index = InstanceIndex::default();
        for (i, concept) in self.concepts.iter().enumerate() {
            if index.concepts.insert(concept.qname.clone(), i).is_some() {
                return Err(ModelError::DuplicateConcept(concept.qname.to_string()));
            }
        }
        for (i, context) in self.contexts.iter().enumerate() {
            index.contexts.insert(context.id.clone(), i);
        }
        for (i, unit) in self.units.iter().enumerate() {
            index.units.insert(unit.id.clone(), i);
        }
        if let Some(footnote) = self.footnotes.iter().find(|f| f.fact.0 >= self.facts.len()) {
            return Err(ModelError::UnknownFact(footnote.fact.0));
        }
        index.presentation = PresentationNetwork::from_arcs(&self.presentation);
        self.index = index;
        Ok(())
    }

    pub fn fact(&self, id: FactId) -> &Fact {
        &self.facts[id.0]
    }

    pub fn fact_ids(&self) -> impl Iterator<Item = FactId> {
        (0..self.facts.len()).map(FactId)
    }

    pub fn concept(&self, qname: &QName) -> Option<&Concept> {
        self.index.concepts.get(qname).map(|&i| &self.concepts[i])
    }

    pub fn concept_of(&self, id: FactId) -> Option<&Concept> {
        self.concept(&self.fact(id).qname)
    }

    pub fn context(&self, id: &str) -> Option<&Context> {
        self.index.contexts.get(id).map(|&i| &self.contexts[i])
    }

    /// The fact's context, `None` when missing or dangling.
    pub fn context_of(&self, id: FactId) -> Option<&Context> {
        self.fact(id)
            .context_ref
            .as_deref()
            .and_then(|c| self.context(c))
    }

    pub fn unit(&self, id: &str) -> Option<&Unit> {
        self.index.units.get(id).map(|&i| &self.units[i])
    }

    pub fn unit_of(&self, id: FactId) -> Option<&Unit> {
        self.fact(id).unit_ref.as_deref().and_then(|u| self.unit(u))
    }

    pub fn role_definition(&self, uri: &str) -> Option<&str> {
        self.roles
            .iter()
            .find(|r| r.uri == uri)
            .map(|r| r.definition.as_str())
    }

    pub fn presentation_network(&self) -> &PresentationNetwork {
        &self.index.presentation
    }

    /// Defaults declared for a dimension, in document order.
    pub fn defaults_of<'a>(&'a self, dimension: &'a QName) -> impl Iterator<Item = &'a QName> + 'a {
        self.dimension_defaults
            .iter()
            .filter(move |d| &d.dimension == dimension)
            .map(|d| &d.default)
    }

    /// Facts grouped by qualified name, groups and members in document order.
    pub fn facts_by_qname(&self) -> Vec<(QName, Vec<FactId>)> {
        let mut slots: HashMap<&QName, usize> = HashMap::new();
        let mut groups: Vec<(QName, Vec<FactId>)> = Vec::new();
        for id in self.fact_ids() {
            let qname = &self.fact(id).qname;
            match slots.get(qname) {
                Some(&slot) => groups[slot].1.push(id),
                None => {
                    slots.insert(qname, groups.len());
                    groups.push((qname.clone(), vec![id]));
                }
            }
        }
        groups
    }

    /// The label shown for a concept, falling back to its local name.
    pub fn label(&self, qname: &QName) -> String {
        self.concept(qname)
            .map(|c| c.display_label())
            .unwrap_or_else(|| qname.local_name.clone())
    }
}
