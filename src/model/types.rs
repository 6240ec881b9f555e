//! Concept declarations.

use serde::{Deserialize, Serialize};

use super::qname::QName;

/// Item type of a concept, reduced to what rendering cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Monetary,
    Shares,
    PerShare,
    Percent,
    Decimal,
    Integer,
    String,
    TextBlock,
    Date,
    Boolean,
    /// Domain and member items.
    Domain,
    Other,
}

impl DataType {
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Monetary
                | DataType::Shares
                | DataType::PerShare
                | DataType::Percent
                | DataType::Decimal
                | DataType::Integer
        )
    }
}

/// A declared concept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concept {
    pub qname: QName,

    /// `None` when the type declaration is missing or broken.
    #[serde(default)]
    pub data_type: Option<DataType>,

    #[serde(default)]
    pub is_abstract: bool,

    /// Dimension (axis) items.
    #[serde(default)]
    pub is_dimension: bool,

    /// Standard label, if the host resolved one.
    #[serde(default)]
    pub label: Option<String>,
}

impl Concept {
    pub fn new(qname: QName, data_type: DataType) -> Self {
        Self {
            qname,
            data_type: Some(data_type),
            is_abstract: false,
            is_dimension: false,
            label: None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.data_type.is_some_and(|t| t.is_numeric())
    }

    pub fn is_text_block(&self) -> bool {
        self.data_type == Some(DataType::TextBlock)
    }

    /// The label to show, falling back to the local name.
    pub fn display_label(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| self.qname.local_name.clone())
    }
}
