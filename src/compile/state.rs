//! Mutable state of one filing compilation.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::{CompileError, CompileOptions, CompileResult, FilingFlags};
use crate::command::CommandGroup;
use crate::cube::{Cube, CubeId, SkippedFact};
use crate::diagnostics::Diagnostics;
use crate::embedding::{Embedding, EmbeddingId};
use crate::emit::ReportSummary;
use crate::index::Entities;
use crate::layout::LayoutContext;
use crate::model::{FactId, Instance, QName};

/// Why a fact is accounted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FactUse {
    /// Duplicate or otherwise unusable; never recovered.
    Broken,
    /// Placed by a live embedding.
    Embedding(EmbeddingId),
}

/// Disjoint borrows of a [`FilingState`] for one phase step.
pub struct Split<'s> {
    pub cx: LayoutContext<'s>,
    pub cubes: &'s mut [Cube],
    pub embeddings: &'s mut [Embedding],
    pub diagnostics: &'s mut Diagnostics,
}

/// Everything the phases share for one filing. Owned by a single
/// [`compile_filing`](super::compile_filing) call.
pub struct FilingState<'a> {
    pub instance: &'a Instance,
    pub options: &'a CompileOptions,
    pub flags: FilingFlags,

    pub entities: Entities,
    pub cubes: Vec<Cube>,
    cube_index: HashMap<String, CubeId>,
    pub embeddings: Vec<Embedding>,

    pub duplicates: BTreeSet<FactId>,
    pub used_or_broken: BTreeMap<FactId, BTreeSet<FactUse>>,
    pub skipped: Vec<SkippedFact>,

    /// Cubes that were numbered while some fact embedded them.
    pub embedded_cubes: BTreeSet<CubeId>,
    pub fact_to_embedding: BTreeMap<FactId, EmbeddingId>,
    pub has_embeddings: bool,
    /// Set once deferred cubes start rendering; no embedded command is realized after that.
    pub disallow_embeddings: bool,

    pub qname_values: BTreeMap<FactId, QName>,
    pub footnotes: BTreeMap<FactId, Vec<String>>,

    pub is_recovery: bool,
    pub next_file_number: u32,
    pub next_uncategorized_file_number: u32,

    pub diagnostics: Diagnostics,
    pub summaries: Vec<ReportSummary>,
}

impl<'a> FilingState<'a> {
    pub fn new(instance: &'a Instance, options: &'a CompileOptions) -> Self {
        Self {
            instance,
            options,
            flags: FilingFlags::detect(instance),
            entities: Entities::new(),
            cubes: Vec::new(),
            cube_index: HashMap::new(),
            embeddings: Vec::new(),
            duplicates: BTreeSet::new(),
            used_or_broken: BTreeMap::new(),
            skipped: Vec::new(),
            embedded_cubes: BTreeSet::new(),
            fact_to_embedding: BTreeMap::new(),
            has_embeddings: false,
            disallow_embeddings: true,
            qname_values: BTreeMap::new(),
            footnotes: BTreeMap::new(),
            is_recovery: false,
            next_file_number: options.first_file_number,
            next_uncategorized_file_number: options.uncategorized_file_number,
            diagnostics: Diagnostics::new(),
            summaries: Vec::new(),
        }
    }

    pub fn add_cube(&mut self, cube: impl FnOnce(CubeId) -> Cube) -> CubeId {
        let id = CubeId(self.cubes.len());
        let cube = cube(id);
        self.cube_index.insert(cube.linkrole.clone(), id);
        self.cubes.push(cube);
        id
    }

    pub fn cube_id(&self, linkrole: &str) -> Option<CubeId> {
        self.cube_index.get(linkrole).copied()
    }

    pub fn is_cube(&self, linkrole: &str) -> bool {
        self.cube_index.contains_key(linkrole)
    }

    pub fn cube(&self, id: CubeId) -> CompileResult<&Cube> {
        match self.cubes.get(id.0) {
            Some(cube) if !cube.is_released() => Ok(cube),
            Some(_) => Err(CompileError::CubeReleased(id)),
            None => Err(CompileError::UnknownCube(id)),
        }
    }

    pub fn cube_mut(&mut self, id: CubeId) -> CompileResult<&mut Cube> {
        live_cube(&mut self.cubes, id)
    }

    pub fn embedding(&self, id: EmbeddingId) -> CompileResult<&Embedding> {
        match self.embeddings.get(id.0) {
            Some(e) if !e.is_released() => Ok(e),
            Some(_) => Err(CompileError::EmbeddingReleased(id)),
            None => Err(CompileError::UnknownEmbedding(id)),
        }
    }

    pub fn embedding_mut(&mut self, id: EmbeddingId) -> CompileResult<&mut Embedding> {
        live_embedding(&mut self.embeddings, id)
    }

    /// Register an embedding on a live cube.
    pub fn add_embedding(
        &mut self,
        cube: CubeId,
        explicit: Vec<CommandGroup>,
        trigger: Option<FactId>,
    ) -> CompileResult<EmbeddingId> {
        let id = EmbeddingId(self.embeddings.len());
        self.cube_mut(cube)?.embeddings.push(id);
        self.embeddings.push(Embedding::new(id, cube, explicit, trigger));
        Ok(id)
    }

    pub fn mark_broken(&mut self, fact: FactId) {
        self.used_or_broken
            .entry(fact)
            .or_default()
            .insert(FactUse::Broken);
    }

    pub fn mark_used(&mut self, fact: FactId, embedding: EmbeddingId) {
        self.used_or_broken
            .entry(fact)
            .or_default()
            .insert(FactUse::Embedding(embedding));
    }

    /// Drop one embedding's claim on a fact.
    pub fn unmark_used(&mut self, fact: FactId, embedding: EmbeddingId) {
        if let Some(uses) = self.used_or_broken.get_mut(&fact) {
            uses.remove(&FactUse::Embedding(embedding));
        }
    }

    /// Break an embedding and withdraw every claim it made.
    pub fn break_embedding(&mut self, id: EmbeddingId) -> CompileResult<()> {
        let embedding = self.embedding_mut(id)?;
        embedding.mark_broken();
        embedding.report = None;
        let facts: Vec<FactId> = embedding.facts().collect();
        for fact in facts {
            self.unmark_used(fact, id);
        }
        Ok(())
    }

    pub fn release_embedding(&mut self, id: EmbeddingId) -> CompileResult<()> {
        match self.embeddings.get_mut(id.0) {
            Some(e) => {
                e.release();
                Ok(())
            }
            None => Err(CompileError::UnknownEmbedding(id)),
        }
    }

    /// Release a cube and every embedding still attached to it.
    pub fn release_cube(&mut self, id: CubeId) -> CompileResult<()> {
        let embeddings = match self.cubes.get(id.0) {
            Some(cube) => cube.embeddings.clone(),
            None => return Err(CompileError::UnknownCube(id)),
        };
        for embedding in embeddings {
            self.release_embedding(embedding)?;
        }
        self.cubes[id.0].release();
        Ok(())
    }

    /// Facts no live embedding claims and nothing marked broken.
    pub fn unused_facts(&self) -> BTreeSet<FactId> {
        self.instance
            .fact_ids()
            .filter(|f| self.used_or_broken.get(f).map_or(true, |uses| uses.is_empty()))
            .collect()
    }

    /// Read-only layout view plus the mutable cube, embedding and message tables.
    pub fn split(&mut self) -> Split<'_> {
        let cx = LayoutContext {
            instance: self.instance,
            entities: &self.entities,
            flags: &self.flags,
            render: &self.options.render,
            has_embeddings: self.has_embeddings,
            footnotes: &self.footnotes,
            qname_values: &self.qname_values,
        };
        Split {
            cx,
            cubes: &mut self.cubes,
            embeddings: &mut self.embeddings,
            diagnostics: &mut self.diagnostics,
        }
    }

    /// Drop every first-pass cube, embedding and entity.
    pub fn clear_for_recovery(&mut self) {
        self.entities.clear();
        self.cubes.clear();
        self.cube_index.clear();
        self.embeddings.clear();
        self.embedded_cubes.clear();
        self.fact_to_embedding.clear();
        self.is_recovery = true;
    }
}

pub(crate) fn live_cube(cubes: &mut [Cube], id: CubeId) -> CompileResult<&mut Cube> {
    match cubes.get_mut(id.0) {
        Some(cube) if !cube.is_released() => Ok(cube),
        Some(_) => Err(CompileError::CubeReleased(id)),
        None => Err(CompileError::UnknownCube(id)),
    }
}

pub(crate) fn live_embedding(
    embeddings: &mut [Embedding],
    id: EmbeddingId,
) -> CompileResult<&mut Embedding> {
    match embeddings.get_mut(id.0) {
        Some(e) if !e.is_released() => Ok(e),
        Some(_) => Err(CompileError::EmbeddingReleased(id)),
        None => Err(CompileError::UnknownEmbedding(id)),
    }
}
