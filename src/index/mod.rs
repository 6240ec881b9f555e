//! Entity tables built from the deduplicated fact set.
//!
//! Elements, axes, members and period descriptors live in one [`Entities`]
//! arena. Everything else refers to them by id, so the recovery pass can drop
//! the whole first-pass graph with a single [`Entities::clear`].

pub mod dedup;
pub mod period;
pub mod populate;

pub use dedup::deduplicate;
pub use period::{PeriodDescriptor, PeriodKey};
pub use populate::{populate, populate_uncategorized};

use std::collections::{BTreeSet, HashMap};

use crate::cube::CubeId;
use crate::model::QName;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
        pub struct $name(pub usize);

        impl $name {
            pub fn index(self) -> usize {
                self.0
            }
        }
    };
}

entity_id!(
    /// Handle to an [`Element`].
    ElementId
);
entity_id!(
    /// Handle to an [`Axis`].
    AxisId
);
entity_id!(
    /// Handle to a [`Member`].
    MemberId
);
entity_id!(
    /// Handle to a [`PeriodDescriptor`].
    PeriodId
);

/// A concept with at least one usable fact.
#[derive(Debug, Clone)]
pub struct Element {
    pub qname: QName,
    pub cubes: BTreeSet<CubeId>,
}

/// A dimension concept observed on some fact's context.
#[derive(Debug, Clone)]
pub struct Axis {
    pub qname: QName,
    /// First dimension-default found for the axis, if any.
    pub default: Option<QName>,
    pub cubes: BTreeSet<CubeId>,
    pub members: BTreeSet<MemberId>,
}

/// A dimension value observed on some fact's context.
#[derive(Debug, Clone)]
pub struct Member {
    pub qname: QName,
    pub axis: Option<AxisId>,
}

/// Arena of every entity built for one pass over the filing.
#[derive(Debug, Clone, Default)]
pub struct Entities {
    elements: Vec<Element>,
    element_index: HashMap<QName, ElementId>,
    axes: Vec<Axis>,
    axis_index: HashMap<QName, AxisId>,
    members: Vec<Member>,
    member_index: HashMap<QName, MemberId>,
    periods: Vec<PeriodDescriptor>,
    period_index: HashMap<PeriodKey, PeriodId>,
}

impl Entities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entity; ids handed out before are meaningless afterwards.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn element_or_insert(&mut self, qname: &QName) -> ElementId {
        if let Some(&id) = self.element_index.get(qname) {
            return id;
        }
        let id = ElementId(self.elements.len());
        self.elements.push(Element {
            qname: qname.clone(),
            cubes: BTreeSet::new(),
        });
        self.element_index.insert(qname.clone(), id);
        id
    }

    /// Get or create an axis; `default` is only consulted on creation.
    pub fn axis_or_insert(
        &mut self,
        qname: &QName,
        default: impl FnOnce() -> Option<QName>,
    ) -> AxisId {
        if let Some(&id) = self.axis_index.get(qname) {
            return id;
        }
        let id = AxisId(self.axes.len());
        self.axes.push(Axis {
            qname: qname.clone(),
            default: default(),
            cubes: BTreeSet::new(),
            members: BTreeSet::new(),
        });
        self.axis_index.insert(qname.clone(), id);
        id
    }

    pub fn member_or_insert(&mut self, qname: &QName) -> MemberId {
        if let Some(&id) = self.member_index.get(qname) {
            return id;
        }
        let id = MemberId(self.members.len());
        self.members.push(Member {
            qname: qname.clone(),
            axis: None,
        });
        self.member_index.insert(qname.clone(), id);
        id
    }

    pub fn period_or_insert(&mut self, key: PeriodKey) -> PeriodId {
        if let Some(&id) = self.period_index.get(&key) {
            return id;
        }
        let id = PeriodId(self.periods.len());
        self.periods.push(PeriodDescriptor::new(key));
        self.period_index.insert(key, id);
        id
    }

    /// Record that `member` was seen on `axis`.
    pub fn link_member(&mut self, axis: AxisId, member: MemberId) {
        self.members[member.0].axis = Some(axis);
        self.axes[axis.0].members.insert(member);
    }

    pub fn link_element_cube(&mut self, element: ElementId, cube: CubeId) {
        self.elements[element.0].cubes.insert(cube);
    }

    pub fn link_axis_cube(&mut self, axis: AxisId, cube: CubeId) {
        self.axes[axis.0].cubes.insert(cube);
    }

    pub fn element(&self, id: ElementId) -> &Element {
        &self.elements[id.0]
    }

    pub fn element_id(&self, qname: &QName) -> Option<ElementId> {
        self.element_index.get(qname).copied()
    }

    pub fn axis(&self, id: AxisId) -> &Axis {
        &self.axes[id.0]
    }

    pub fn axis_id(&self, qname: &QName) -> Option<AxisId> {
        self.axis_index.get(qname).copied()
    }

    pub fn axis_by_name(&self, qname: &QName) -> Option<&Axis> {
        self.axis_id(qname).map(|id| self.axis(id))
    }

    pub fn member(&self, id: MemberId) -> &Member {
        &self.members[id.0]
    }

    pub fn member_id(&self, qname: &QName) -> Option<MemberId> {
        self.member_index.get(qname).copied()
    }

    pub fn period(&self, id: PeriodId) -> &PeriodDescriptor {
        &self.periods[id.0]
    }

    pub fn period_id(&self, key: &PeriodKey) -> Option<PeriodId> {
        self.period_index.get(key).copied()
    }

    /// The default member of an axis, looked up by name.
    pub fn default_of(&self, axis: &QName) -> Option<&QName> {
        self.axis_by_name(axis).and_then(|a| a.default.as_ref())
    }

    pub fn elements(&self) -> impl Iterator<Item = (ElementId, &Element)> {
        self.elements.iter().enumerate().map(|(i, e)| (ElementId(i), e))
    }

    pub fn axes(&self) -> impl Iterator<Item = (AxisId, &Axis)> {
        self.axes.iter().enumerate().map(|(i, a)| (AxisId(i), a))
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn axis_count(&self) -> usize {
        self.axes.len()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn period_count(&self) -> usize {
        self.periods.len()
    }
}
