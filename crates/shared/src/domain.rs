use serde::{Deserialize, Serialize};

/// Position of an entry in the todo list. Only stable between two full reloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub usize);

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoRecord {
    pub name: String,
    #[serde(default)]
    pub completed: bool,
}

impl TodoRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            completed: false,
        }
    }
}

pub const DEFAULT_FUEL_PRICE: u64 = 1;
pub const DEFAULT_FUEL_LIMIT: u64 = 1000;

/// Resource budget attached to every submitted write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuelParams {
    pub fuel_price: u64,
    pub fuel_limit: u64,
}

impl Default for FuelParams {
    fn default() -> Self {
        Self {
            fuel_price: DEFAULT_FUEL_PRICE,
            fuel_limit: DEFAULT_FUEL_LIMIT,
        }
    }
}
