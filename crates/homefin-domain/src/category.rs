//! Domain types representing the category/subcategory taxonomy.

use serde::{Deserialize, Serialize};

use crate::common::*;

/// Top-level category with an ordered list of subcategories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subcategories: Vec<SubCategory>,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            icon: None,
            color: None,
            subcategories: Vec::new(),
        }
    }

    pub fn with_subcategory(mut self, name: impl Into<String>) -> Self {
        self.subcategories.push(SubCategory::new(name));
        self
    }

    pub fn subcategory(&self, id: &str) -> Option<&SubCategory> {
        self.subcategories.iter().find(|sub| sub.id == id)
    }

    /// Finds a subcategory by trimmed, case-insensitive name.
    pub fn subcategory_named(&self, name: &str) -> Option<&SubCategory> {
        self.subcategories
            .iter()
            .find(|sub| names_match(&sub.name, name))
    }
}

impl Identifiable for Category {
    fn id(&self) -> &str {
        &self.id
    }
}

impl NamedEntity for Category {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Displayable for Category {
    fn display_label(&self) -> String {
        match self.subcategories.len() {
            0 => self.name.clone(),
            n => format!("{} ({n} sub)", self.name),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubCategory {
    pub id: String,
    pub name: String,
}

impl SubCategory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
        }
    }
}

impl Identifiable for SubCategory {
    fn id(&self) -> &str {
        &self.id
    }
}

impl NamedEntity for SubCategory {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Direction for user-controlled reordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}
