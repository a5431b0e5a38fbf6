use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DocbenchError;

/// The eight TPC-H entities, each stored as one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Region,
    Nation,
    Supplier,
    Customer,
    Part,
    PartSupp,
    Orders,
    LineItem,
}

impl Collection {
    pub const ALL: [Collection; 8] = [
        Collection::Region,
        Collection::Nation,
        Collection::Supplier,
        Collection::Customer,
        Collection::Part,
        Collection::PartSupp,
        Collection::Orders,
        Collection::LineItem,
    ];

    /// Collection name in the document store.
    pub fn name(self) -> &'static str {
        match self {
            Collection::Region => "region",
            Collection::Nation => "nation",
            Collection::Supplier => "supplier",
            Collection::Customer => "customer",
            Collection::Part => "part",
            Collection::PartSupp => "partsupp",
            Collection::Orders => "orders",
            Collection::LineItem => "lineitem",
        }
    }

    /// Prefix carried by every column of this entity (`l_` for lineitem, ...).
    pub fn field_prefix(self) -> &'static str {
        match self {
            Collection::Region => "r_",
            Collection::Nation => "n_",
            Collection::Supplier => "s_",
            Collection::Customer => "c_",
            Collection::Part => "p_",
            Collection::PartSupp => "ps_",
            Collection::Orders => "o_",
            Collection::LineItem => "l_",
        }
    }

    /// Returns true if `field` is a column of this entity.
    pub fn owns_field(self, field: &str) -> bool {
        let root = field.split('.').next().unwrap_or(field);
        root.starts_with(self.field_prefix())
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Collection {
    type Err = DocbenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| DocbenchError::UnknownCollection(s.to_string()))
    }
}
