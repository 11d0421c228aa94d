//! Catalog Validation
//!
//! Checks that every category has a unique, non-blank name and a
//! non-empty list of unique package names.

use std::collections::HashSet;
use std::path::PathBuf;

use log::{debug, info, warn};
use thiserror::Error;

use super::model::{PackageCatalog, PackageCategory};

/// Errors raised while loading or validating a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog has no categories")]
    EmptyCatalog,

    #[error("Category has empty or whitespace-only name")]
    EmptyCategoryName,

    #[error("Duplicate category name: '{0}'")]
    DuplicateCategory(String),

    #[error("Category '{0}' has no packages")]
    EmptyCategory(String),

    #[error("Category '{0}' contains a blank package name")]
    BlankPackage(String),

    #[error("Category '{category}' lists '{package}', which would be read as a command-line option")]
    OptionLikePackage { category: String, package: String },

    #[error("Category '{category}' lists package '{package}' more than once")]
    DuplicatePackage { category: String, package: String },

    #[error("Could not read catalog '{}': {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not parse catalog: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Validates a single category's fields.
fn validate_category(category: &PackageCategory) -> Vec<CatalogError> {
    let mut errors = Vec::new();

    if category.name.trim().is_empty() {
        errors.push(CatalogError::EmptyCategoryName);
        return errors;
    }

    if category.is_empty() {
        errors.push(CatalogError::EmptyCategory(category.name.clone()));
        return errors;
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for package in &category.packages {
        if package.trim().is_empty() {
            errors.push(CatalogError::BlankPackage(category.name.clone()));
            continue;
        }

        if package.trim_start().starts_with('-') {
            errors.push(CatalogError::OptionLikePackage {
                category: category.name.clone(),
                package: package.clone(),
            });
            continue;
        }

        if !seen.insert(package.as_str()) {
            errors.push(CatalogError::DuplicatePackage {
                category: category.name.clone(),
                package: package.clone(),
            });
        }
    }

    debug!(
        "Category '{}': {} packages via {}",
        category.name,
        category.len(),
        category.install_method
    );

    errors
}

/// Validates the entire catalog.
///
/// Every problem is logged; the first one is returned.
pub fn validate_catalog(catalog: &PackageCatalog) -> Result<(), CatalogError> {
    info!("Validating catalog with {} categories", catalog.len());

    if catalog.is_empty() {
        return Err(CatalogError::EmptyCatalog);
    }

    let mut errors = Vec::new();
    let mut seen_names: HashSet<&str> = HashSet::new();

    for category in catalog.categories() {
        if !category.name.trim().is_empty() && !seen_names.insert(category.name.as_str()) {
            errors.push(CatalogError::DuplicateCategory(category.name.clone()));
        }
        errors.extend(validate_category(category));
    }

    for error in &errors {
        warn!("Catalog problem: {}", error);
    }

    match errors.into_iter().next() {
        Some(first) => Err(first),
        None => Ok(()),
    }
}
