//! Business logic for the category/subcategory registry.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use homefin_domain::{names_match, Category, DashboardData, Direction, SubCategory};

use crate::{CoreError, CoreResult};

/// One `(category, subcategory?)` pair from an external category list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryImportRow {
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
}

impl CategoryImportRow {
    pub fn new(category: impl Into<String>, subcategory: Option<&str>) -> Self {
        Self {
            category: category.into(),
            subcategory: subcategory.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryImportReport {
    pub categories_created: usize,
    pub subcategories_created: usize,
}

/// Provides validated operations over a profile's ordered category list.
///
/// Deleting a category or subcategory only clears references; transactions are never
/// removed as a side effect.
pub struct CategoryService;

impl CategoryService {
    /// Adds a category with a unique (trimmed, case-insensitive) name.
    pub fn add_category(data: &mut DashboardData, name: &str) -> CoreResult<String> {
        let name = Self::validate_name(data, None, name)?;
        let category = Category::new(name);
        let id = category.id.clone();
        debug!(id = %id, name = %category.name, "added category");
        data.categories.push(category);
        Ok(id)
    }

    pub fn rename_category(data: &mut DashboardData, id: &str, name: &str) -> CoreResult<()> {
        let name = Self::validate_name(data, Some(id), name)?;
        let category = data
            .category_mut(id)
            .ok_or_else(|| CoreError::CategoryNotFound(id.to_string()))?;
        category.name = name;
        Ok(())
    }

    pub fn add_subcategory(
        data: &mut DashboardData,
        category_id: &str,
        name: &str,
    ) -> CoreResult<String> {
        let category = data
            .category_mut(category_id)
            .ok_or_else(|| CoreError::CategoryNotFound(category_id.to_string()))?;
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(CoreError::Validation("subcategory name is required".into()));
        }
        if category.subcategory_named(trimmed).is_some() {
            return Err(CoreError::Validation(format!(
                "Subcategory `{trimmed}` already exists in `{}`",
                category.name
            )));
        }
        let sub = SubCategory::new(trimmed);
        let id = sub.id.clone();
        category.subcategories.push(sub);
        Ok(id)
    }

    /// Removes a category, clears `categoryId`/`subCategoryId` on every referencing
    /// transaction (active and trashed) and drops it from budget restriction lists.
    pub fn delete_category(data: &mut DashboardData, id: &str) -> CoreResult<Category> {
        let position = data
            .categories
            .iter()
            .position(|category| category.id == id)
            .ok_or_else(|| CoreError::CategoryNotFound(id.to_string()))?;
        let removed = data.categories.remove(position);

        let mut cleared = 0usize;
        let all = data
            .transactions
            .iter_mut()
            .chain(data.trash.iter_mut().map(|entry| &mut entry.transaction));
        for txn in all {
            if txn.category_id.as_deref() == Some(id) {
                txn.category_id = None;
                txn.sub_category_id = None;
                cleared += 1;
            }
        }
        for budget in &mut data.budgets {
            budget.categories.retain(|entry| entry.category_id != id);
        }
        info!(id, name = %removed.name, cleared, "deleted category");
        Ok(removed)
    }

    /// Removes one subcategory. Referencing transactions keep their category.
    pub fn delete_subcategory(
        data: &mut DashboardData,
        category_id: &str,
        sub_id: &str,
    ) -> CoreResult<SubCategory> {
        let category = data
            .category_mut(category_id)
            .ok_or_else(|| CoreError::CategoryNotFound(category_id.to_string()))?;
        let position = category
            .subcategories
            .iter()
            .position(|sub| sub.id == sub_id)
            .ok_or_else(|| CoreError::CategoryNotFound(sub_id.to_string()))?;
        let removed = category.subcategories.remove(position);

        let all = data
            .transactions
            .iter_mut()
            .chain(data.trash.iter_mut().map(|entry| &mut entry.transaction));
        for txn in all {
            if txn.sub_category_id.as_deref() == Some(sub_id) {
                txn.sub_category_id = None;
            }
        }
        debug!(category_id, sub_id, "deleted subcategory");
        Ok(removed)
    }

    /// Swaps the category with its neighbour. Returns `false` at either boundary.
    pub fn reorder_category(
        data: &mut DashboardData,
        id: &str,
        direction: Direction,
    ) -> CoreResult<bool> {
        let index = data
            .categories
            .iter()
            .position(|category| category.id == id)
            .ok_or_else(|| CoreError::CategoryNotFound(id.to_string()))?;
        Ok(swap_with_neighbour(&mut data.categories, index, direction))
    }

    pub fn reorder_subcategory(
        data: &mut DashboardData,
        category_id: &str,
        sub_id: &str,
        direction: Direction,
    ) -> CoreResult<bool> {
        let category = data
            .category_mut(category_id)
            .ok_or_else(|| CoreError::CategoryNotFound(category_id.to_string()))?;
        let index = category
            .subcategories
            .iter()
            .position(|sub| sub.id == sub_id)
            .ok_or_else(|| CoreError::CategoryNotFound(sub_id.to_string()))?;
        Ok(swap_with_neighbour(
            &mut category.subcategories,
            index,
            direction,
        ))
    }

    /// Match-or-create for every row. Blank names are skipped.
    pub fn import(data: &mut DashboardData, rows: &[CategoryImportRow]) -> CategoryImportReport {
        let mut report = CategoryImportReport::default();
        for row in rows {
            let Some((_, created_category, created_sub)) =
                Self::resolve(data, &row.category, row.subcategory.as_deref())
            else {
                continue;
            };
            report.categories_created += usize::from(created_category);
            report.subcategories_created += usize::from(created_sub);
        }
        info!(
            rows = rows.len(),
            categories = report.categories_created,
            subcategories = report.subcategories_created,
            "imported categories"
        );
        report
    }

    /// Finds or creates the category (and optional subcategory) by trimmed,
    /// case-insensitive name. Returns the ids plus which of them were created, or
    /// `None` when the category name is blank.
    pub(crate) fn resolve(
        data: &mut DashboardData,
        category: &str,
        subcategory: Option<&str>,
    ) -> Option<(ResolvedCategory, bool, bool)> {
        let category_name = category.trim();
        if category_name.is_empty() {
            return None;
        }
        let mut created_category = false;
        let index = match data
            .categories
            .iter()
            .position(|existing| names_match(&existing.name, category_name))
        {
            Some(index) => index,
            None => {
                data.categories.push(Category::new(category_name));
                created_category = true;
                data.categories.len() - 1
            }
        };
        let target = &mut data.categories[index];

        let mut created_sub = false;
        let sub_id = match subcategory.map(str::trim).filter(|name| !name.is_empty()) {
            Some(sub_name) => match target.subcategory_named(sub_name) {
                Some(existing) => Some(existing.id.clone()),
                None => {
                    let sub = SubCategory::new(sub_name);
                    let id = sub.id.clone();
                    target.subcategories.push(sub);
                    created_sub = true;
                    Some(id)
                }
            },
            None => None,
        };
        let resolved = ResolvedCategory {
            category_id: target.id.clone(),
            sub_category_id: sub_id,
        };
        Some((resolved, created_category, created_sub))
    }

    fn validate_name(data: &DashboardData, exclude: Option<&str>, candidate: &str) -> CoreResult<String> {
        let trimmed = candidate.trim();
        if trimmed.is_empty() {
            return Err(CoreError::Validation("category name is required".into()));
        }
        let duplicate = data
            .categories
            .iter()
            .any(|category| names_match(&category.name, trimmed) && exclude != Some(category.id.as_str()));
        if duplicate {
            Err(CoreError::Validation(format!(
                "Category `{trimmed}` already exists"
            )))
        } else {
            Ok(trimmed.to_string())
        }
    }
}

/// Ids produced by a match-or-create lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedCategory {
    pub category_id: String,
    pub sub_category_id: Option<String>,
}

fn swap_with_neighbour<T>(items: &mut [T], index: usize, direction: Direction) -> bool {
    let neighbour = match direction {
        Direction::Up => index.checked_sub(1),
        Direction::Down => Some(index + 1).filter(|next| *next < items.len()),
    };
    match neighbour {
        Some(other) => {
            items.swap(index, other);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use homefin_domain::{Budget, BudgetPeriod, Transaction, TrashedTransaction};

    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
    }

    fn names(data: &DashboardData) -> Vec<&str> {
        data.categories.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn add_rejects_case_insensitive_duplicates() {
        let mut data = DashboardData::default();
        CategoryService::add_category(&mut data, "Groceries").unwrap();
        let err = CategoryService::add_category(&mut data, "  groceries ").unwrap_err();
        assert!(
            matches!(err, CoreError::Validation(ref message) if message.contains("already exists")),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn rename_allows_same_name_for_same_category() {
        let mut data = DashboardData::default();
        let id = CategoryService::add_category(&mut data, "Food").unwrap();
        CategoryService::add_category(&mut data, "Fuel").unwrap();
        CategoryService::rename_category(&mut data, &id, "FOOD").unwrap();
        assert_eq!(data.categories[0].name, "FOOD");
        assert!(CategoryService::rename_category(&mut data, &id, "fuel").is_err());
    }

    #[test]
    fn delete_category_clears_references_but_keeps_transactions() {
        let mut data = DashboardData::default();
        let id = CategoryService::add_category(&mut data, "Food").unwrap();
        let sub = CategoryService::add_subcategory(&mut data, &id, "Snacks").unwrap();
        data.transactions.push(
            Transaction::new("a", date(), "chips", -3.0)
                .with_category(&id)
                .with_subcategory(&sub),
        );
        data.trash.push(TrashedTransaction {
            transaction: Transaction::new("a", date(), "old", -1.0).with_category(&id),
            deleted_at: chrono::Utc::now(),
        });
        data.budgets
            .push(Budget::new("Food", 50.0, BudgetPeriod::Monthly).with_category(&id, 50.0));

        CategoryService::delete_category(&mut data, &id).unwrap();

        assert!(data.categories.is_empty());
        assert_eq!(data.transactions.len(), 1);
        assert_eq!(data.transactions[0].category_id, None);
        assert_eq!(data.transactions[0].sub_category_id, None);
        assert_eq!(data.trash[0].transaction.category_id, None);
        assert!(data.budgets[0].categories.is_empty());
    }

    #[test]
    fn delete_subcategory_keeps_category_link() {
        let mut data = DashboardData::default();
        let id = CategoryService::add_category(&mut data, "Food").unwrap();
        let sub = CategoryService::add_subcategory(&mut data, &id, "Snacks").unwrap();
        data.transactions.push(
            Transaction::new("a", date(), "chips", -3.0)
                .with_category(&id)
                .with_subcategory(&sub),
        );
        CategoryService::delete_subcategory(&mut data, &id, &sub).unwrap();
        assert_eq!(data.transactions[0].category_id.as_deref(), Some(id.as_str()));
        assert_eq!(data.transactions[0].sub_category_id, None);
        assert!(data.categories[0].subcategories.is_empty());
    }

    #[test]
    fn reorder_swaps_and_stops_at_boundaries() {
        let mut data = DashboardData::default();
        let a = CategoryService::add_category(&mut data, "A").unwrap();
        CategoryService::add_category(&mut data, "B").unwrap();
        let c = CategoryService::add_category(&mut data, "C").unwrap();

        assert!(!CategoryService::reorder_category(&mut data, &a, Direction::Up).unwrap());
        assert!(!CategoryService::reorder_category(&mut data, &c, Direction::Down).unwrap());
        assert_eq!(names(&data), ["A", "B", "C"]);

        assert!(CategoryService::reorder_category(&mut data, &a, Direction::Down).unwrap());
        assert_eq!(names(&data), ["B", "A", "C"]);
        assert!(CategoryService::reorder_category(&mut data, &c, Direction::Up).unwrap());
        assert_eq!(names(&data), ["B", "C", "A"]);
    }

    #[test]
    fn import_matches_existing_names_and_counts_new_ones() {
        let mut data = DashboardData::default();
        data.categories
            .push(Category::new("Food").with_subcategory("Groceries"));
        let rows = vec![
            CategoryImportRow::new(" food ", Some("GROCERIES")),
            CategoryImportRow::new("Food", Some("Dining")),
            CategoryImportRow::new("Transport", None),
            CategoryImportRow::new("transport", Some("Fuel")),
            CategoryImportRow::new("   ", Some("Ignored")),
        ];
        let report = CategoryService::import(&mut data, &rows);
        assert_eq!(
            report,
            CategoryImportReport {
                categories_created: 1,
                subcategories_created: 2,
            }
        );
        assert_eq!(names(&data), ["Food", "Transport"]);
        assert_eq!(data.categories[0].subcategories.len(), 2);

        let again = CategoryService::import(&mut data, &rows);
        assert_eq!(again, CategoryImportReport::default());
    }
}
