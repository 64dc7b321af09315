//! Index types reported by result pages

use serde::{Deserialize, Serialize};

/// A composite index known to the service
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Index {
    /// Service-assigned index id
    pub id: u64,
    /// Record kind the index covers
    pub kind: String,
    /// Indexed properties, in index order
    #[serde(default)]
    pub properties: Vec<String>,
}

impl Index {
    /// Create a new index description
    pub fn new<I, S>(id: u64, kind: impl Into<String>, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id,
            kind: kind.into(),
            properties: properties.into_iter().map(Into::into).collect(),
        }
    }
}

/// The parts of a query that decide which index can serve it
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QueryShape {
    /// Record kind queried
    pub kind: String,
    /// Properties used in filters
    #[serde(default)]
    pub filters: Vec<String>,
    /// Properties used in sort orders
    #[serde(default)]
    pub orders: Vec<String>,
}

impl QueryShape {
    /// Shape of a query over `kind` with no filters or orders
    pub fn kind(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    /// Add a filter property
    #[must_use]
    pub fn filter(mut self, property: impl Into<String>) -> Self {
        self.filters.push(property.into());
        self
    }

    /// Add a sort property
    #[must_use]
    pub fn order(mut self, property: impl Into<String>) -> Self {
        self.orders.push(property.into());
        self
    }
}

/// One index a page's execution touched
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexInfo {
    /// The index used
    pub index: Index,
    /// Shape of the query component it served
    pub shape: QueryShape,
    /// Whether the index is only consulted when no alternative exists
    #[serde(default)]
    pub only_use_if_required: bool,
}

impl IndexInfo {
    /// Index used as a matter of course
    pub fn used(index: Index, shape: QueryShape) -> Self {
        Self {
            index,
            shape,
            only_use_if_required: false,
        }
    }

    /// Index flagged "use only if required"
    pub fn required(index: Index, shape: QueryShape) -> Self {
        Self {
            index,
            shape,
            only_use_if_required: true,
        }
    }
}
