//! In-memory construction of an [`Instance`].
//!
//! Names are written `prefix:local`; unknown prefixes get a synthetic
//! `urn:factcube:<prefix>` namespace so builders never fail half-way.
//!
//! ```
//! use factcube::model::{DataType, InstanceBuilder, ymd};
//!
//! let mut b = InstanceBuilder::new("abc-20231231.htm");
//! b.prefix("us-gaap", "http://fasb.org/us-gaap/2023")
//!     .concept("us-gaap:Assets", DataType::Monetary)
//!     .role("urn:bs", "0010 - Statement - Balance Sheet")
//!     .arc("urn:bs", "us-gaap:BalanceSheetAbstract", "us-gaap:Assets")
//!     .unit("usd", "iso4217:USD")
//!     .instant("c1", ymd(2023, 12, 31));
//! b.numeric("us-gaap:Assets", "c1", "usd", "100", "0");
//! let instance = b.build().unwrap();
//! assert_eq!(instance.facts.len(), 1);
//! ```

use chrono::NaiveDate;
use std::collections::HashMap;

use super::fact::{Context, DimensionValue, Fact, FactId, Period, Unit};
use super::instance::{DimensionDefault, Footnote, Instance, ModelResult, RoleType};
use super::presentation::PresentationArc;
use super::qname::QName;
use super::types::{Concept, DataType};

/// Shorthand for a calendar date; out-of-range input yields the epoch default.
pub fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

/// Builds an [`Instance`] fact by fact.
#[derive(Debug, Default)]
pub struct InstanceBuilder {
    instance: Instance,
    next_line: u32,
    next_order: HashMap<(String, QName), f64>,
}

impl InstanceBuilder {
    pub fn new(entry_point: impl Into<String>) -> Self {
        Self {
            instance: Instance::new(entry_point),
            next_line: 10,
            next_order: HashMap::new(),
        }
    }

    pub fn prefix(&mut self, prefix: &str, namespace: &str) -> &mut Self {
        self.instance
            .namespaces
            .insert(prefix.to_string(), namespace.to_string());
        self
    }

    /// Resolve `prefix:local`, registering a synthetic namespace when needed.
    pub fn qname(&mut self, name: &str) -> QName {
        let (prefix, local) = name.split_once(':').unwrap_or(("", name));
        let namespace = self
            .instance
            .namespaces
            .entry(prefix.to_string())
            .or_insert_with(|| format!("urn:factcube:{}", prefix))
            .clone();
        QName::new(prefix, namespace, local)
    }

    fn declare(&mut self, concept: Concept) -> &mut Self {
        self.instance.concepts.retain(|c| c.qname != concept.qname);
        self.instance.concepts.push(concept);
        self
    }

    pub fn concept(&mut self, name: &str, data_type: DataType) -> &mut Self {
        let qname = self.qname(name);
        self.declare(Concept::new(qname, data_type))
    }

    /// A concept whose type declaration is missing.
    pub fn untyped_concept(&mut self, name: &str) -> &mut Self {
        let qname = self.qname(name);
        let mut concept = Concept::new(qname, DataType::Other);
        concept.data_type = None;
        self.declare(concept)
    }

    pub fn abstract_concept(&mut self, name: &str) -> &mut Self {
        let qname = self.qname(name);
        let mut concept = Concept::new(qname, DataType::String);
        concept.is_abstract = true;
        self.declare(concept)
    }

    pub fn axis(&mut self, name: &str) -> &mut Self {
        let qname = self.qname(name);
        let mut concept = Concept::new(qname, DataType::Domain);
        concept.is_abstract = true;
        concept.is_dimension = true;
        self.declare(concept)
    }

    pub fn member(&mut self, name: &str) -> &mut Self {
        let qname = self.qname(name);
        let mut concept = Concept::new(qname, DataType::Domain);
        concept.is_abstract = true;
        self.declare(concept)
    }

    pub fn label(&mut self, name: &str, label: &str) -> &mut Self {
        let qname = self.qname(name);
        if let Some(concept) = self.instance.concepts.iter_mut().find(|c| c.qname == qname) {
            concept.label = Some(label.to_string());
        }
        self
    }

    pub fn role(&mut self, uri: &str, definition: &str) -> &mut Self {
        self.instance.roles.push(RoleType {
            uri: uri.to_string(),
            definition: definition.to_string(),
        });
        self
    }

    /// Parent-child arc; order follows insertion under the same parent.
    pub fn arc(&mut self, linkrole: &str, from: &str, to: &str) -> &mut Self {
        self.push_arc(linkrole, from, to, None)
    }

    pub fn arc_with_label(
        &mut self,
        linkrole: &str,
        from: &str,
        to: &str,
        preferred_label: &str,
    ) -> &mut Self {
        self.push_arc(linkrole, from, to, Some(preferred_label.to_string()))
    }

    fn push_arc(
        &mut self,
        linkrole: &str,
        from: &str,
        to: &str,
        preferred_label: Option<String>,
    ) -> &mut Self {
        let from = self.qname(from);
        let to = self.qname(to);
        let slot = self
            .next_order
            .entry((linkrole.to_string(), from.clone()))
            .or_insert(0.0);
        *slot += 1.0;
        let order = *slot;
        self.instance.presentation.push(PresentationArc {
            linkrole: linkrole.to_string(),
            from,
            to,
            order,
            preferred_label,
        });
        self
    }

    pub fn dimension_default(&mut self, axis: &str, member: &str) -> &mut Self {
        let dimension = self.qname(axis);
        let default = self.qname(member);
        self.instance
            .dimension_defaults
            .push(DimensionDefault { dimension, default });
        self
    }

    pub fn unit(&mut self, id: &str, measure: &str) -> &mut Self {
        self.instance.units.push(Unit {
            id: id.to_string(),
            measure: measure.to_string(),
        });
        self
    }

    pub fn instant(&mut self, id: &str, date: NaiveDate) -> &mut Self {
        self.instance.contexts.push(Context::instant(id, date));
        self
    }

    pub fn duration(&mut self, id: &str, start: NaiveDate, end: NaiveDate) -> &mut Self {
        self.instance.contexts.push(Context::duration(id, start, end));
        self
    }

    /// A context with explicit dimension members, given as `(axis, member)` pairs.
    pub fn dimensional(&mut self, id: &str, period: Period, dims: &[(&str, &str)]) -> &mut Self {
        let dimensions = dims
            .iter()
            .map(|(axis, member)| DimensionValue {
                dimension: self.qname(axis),
                member: self.qname(member),
            })
            .collect();
        self.instance.contexts.push(Context {
            id: id.to_string(),
            period,
            dimensions,
            has_scenario: false,
        });
        self
    }

    /// A non-numeric fact.
    pub fn fact(&mut self, name: &str, context: &str, value: &str) -> FactId {
        let qname = self.qname(name);
        self.push_fact(Fact::new(qname, context, value))
    }

    pub fn numeric(
        &mut self,
        name: &str,
        context: &str,
        unit: &str,
        value: &str,
        decimals: &str,
    ) -> FactId {
        let qname = self.qname(name);
        let mut fact = Fact::new(qname, context, value);
        fact.unit_ref = Some(unit.to_string());
        fact.decimals = Some(decimals.to_string());
        self.push_fact(fact)
    }

    fn push_fact(&mut self, mut fact: Fact) -> FactId {
        fact.source_line = self.next_line;
        self.next_line += 1;
        self.instance.facts.push(fact);
        FactId(self.instance.facts.len() - 1)
    }

    pub fn fact_mut(&mut self, id: FactId) -> &mut Fact {
        &mut self.instance.facts[id.0]
    }

    pub fn context_mut(&mut self, id: &str) -> Option<&mut Context> {
        self.instance.contexts.iter_mut().find(|c| c.id == id)
    }

    pub fn footnote(&mut self, fact: FactId, text: &str) -> &mut Self {
        self.instance.footnotes.push(Footnote {
            fact,
            text: text.to_string(),
        });
        self
    }

    pub fn build(self) -> ModelResult<Instance> {
        let mut instance = self.instance;
        instance.reindex()?;
        Ok(instance)
    }
}
