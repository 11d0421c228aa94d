//! Catalog Parser
//!
//! Loads a custom package catalog from YAML so a distribution can be
//! tailored without rebuilding.
//!
//! ```yaml
//! categories:
//!   - name: core_geospatial
//!     install_method: package_manager_native
//!     packages: [gdal, proj]
//!   - name: python_geospatial
//!     packages: [geopandas]   # install_method defaults to pip_fallback
//! ```

use std::fs;
use std::path::Path;

use log::{error, info};

use super::model::PackageCatalog;
use super::validator::{validate_catalog, CatalogError};

/// Parses and validates a catalog from YAML text.
pub fn parse_catalog(yaml_content: &str) -> Result<PackageCatalog, CatalogError> {
    let catalog: PackageCatalog = serde_yaml::from_str(yaml_content).map_err(|e| {
        error!("YAML parse error: {}", e);
        CatalogError::Parse(e)
    })?;

    validate_catalog(&catalog)?;
    Ok(catalog)
}

/// Loads a catalog from a YAML file.
pub fn load_catalog(path: impl AsRef<Path>) -> Result<PackageCatalog, CatalogError> {
    let path = path.as_ref();
    info!("Loading catalog: {}", path.display());

    let yaml_content = fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let catalog = parse_catalog(&yaml_content)?;

    info!(
        "Catalog loaded: {} categories, {} packages",
        catalog.len(),
        catalog.total_packages()
    );

    Ok(catalog)
}

/// Serializes a catalog to YAML (usable as a template for `load_catalog`).
pub fn catalog_to_yaml(catalog: &PackageCatalog) -> Result<String, CatalogError> {
    Ok(serde_yaml::to_string(catalog)?)
}
