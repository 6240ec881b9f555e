//! Host document model: the filing as handed over by an XBRL processor.
//!
//! Everything here is read-only input to compilation. Facts are addressed by
//! [`FactId`], their position in [`Instance::facts`].

pub mod builder;
pub mod fact;
pub mod instance;
pub mod presentation;
pub mod qname;
pub mod types;

pub use builder::{ymd, InstanceBuilder};
pub use fact::{Context, DimensionValue, Fact, FactId, Period, Unit};
pub use instance::{DimensionDefault, Footnote, Instance, ModelError, ModelResult, RoleType};
pub use presentation::{ArcInfo, LinkroleTree, PresentationArc, PresentationNetwork};
pub use qname::QName;
pub use types::{Concept, DataType};
