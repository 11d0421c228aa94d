//! Package Catalog Module
//!
//! Defines which packages make up the distribution and how each group
//! is installed.
//!
//! - [`model`]: Categories, install methods and the built-in catalog
//! - [`parser`]: YAML loading for custom catalogs
//! - [`validator`]: Structural checks on a catalog

pub mod model;
pub mod parser;
pub mod validator;

pub use model::{InstallMethod, PackageCatalog, PackageCategory};
pub use parser::{catalog_to_yaml, load_catalog, parse_catalog};
pub use validator::{validate_catalog, CatalogError};
