//! Package Catalog Data Model
//!
//! Categories of packages installed together, and the built-in
//! geospatial distribution.

use serde::{Deserialize, Serialize};

/// Compiled native libraries and their Python bindings (from conda-forge).
const CORE_GEOSPATIAL: &[&str] = &[
    "gdal", "geos", "proj", "geotiff", "libspatialindex", "rasterio", "fiona", "shapely",
    "pyproj", "cartopy",
];

const PYTHON_GEOSPATIAL: &[&str] = &[
    "geopandas", "contextily", "folium", "ipyleaflet", "mapclassify", "movingpandas", "osmnx",
    "pyogrio", "rasterstats", "rioxarray", "sentinelsat", "whitebox", "xyzservices",
];

const WEB_MAPPING: &[&str] = &["plotly", "keplergl", "dash", "dash-leaflet", "voila"];

const ADVANCED_ANALYTICS: &[&str] = &[
    "scikit-learn", "scikit-image", "pysal", "esda", "splot", "libpysal", "mgwr", "spaghetti",
    "pointpats",
];

const GOOGLE_MAPS: &[&str] = &["googlemaps", "gmaps", "geopy"];

const DEV_TOOLS: &[&str] = &[
    "jupyter", "jupyterlab", "jupyter-server-proxy", "jupyterlab-git", "jupyterlab-geojson",
    "black", "flake8", "pytest", "ipywidgets",
];

/// How packages of a category are installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InstallMethod {
    /// Package-manager install from the configured channel, pip as fallback
    PackageManagerNative,
    /// Pip install inside the environment
    #[default]
    PipFallback,
}

impl std::fmt::Display for InstallMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PackageManagerNative => write!(f, "package manager"),
            Self::PipFallback => write!(f, "pip"),
        }
    }
}

/// A named group of packages installed with one method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageCategory {
    /// Unique category name
    pub name: String,

    /// How the packages are installed (defaults to pip)
    #[serde(default)]
    pub install_method: InstallMethod,

    /// Package names, installed in this order
    pub packages: Vec<String>,
}

impl PackageCategory {
    pub fn new(name: impl Into<String>, install_method: InstallMethod, packages: &[&str]) -> Self {
        Self {
            name: name.into(),
            install_method,
            packages: packages.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

/// Ordered list of categories making up a distribution.
///
/// Built once at startup and handed to the installer by reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageCatalog {
    categories: Vec<PackageCategory>,
}

impl PackageCatalog {
    /// Creates a catalog without validating it.
    ///
    /// Use [`PackageCatalog::from_categories`] for untrusted input.
    pub(crate) fn new_unchecked(categories: Vec<PackageCategory>) -> Self {
        Self { categories }
    }

    /// Creates a validated catalog.
    pub fn from_categories(
        categories: Vec<PackageCategory>,
    ) -> Result<Self, super::validator::CatalogError> {
        let catalog = Self { categories };
        super::validator::validate_catalog(&catalog)?;
        Ok(catalog)
    }

    /// Categories in declaration (install) order.
    pub fn categories(&self) -> &[PackageCategory] {
        &self.categories
    }

    /// Looks up a category by name.
    pub fn get(&self, name: &str) -> Option<&PackageCategory> {
        self.categories.iter().find(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Number of package entries across all categories.
    pub fn total_packages(&self) -> usize {
        self.categories.iter().map(PackageCategory::len).sum()
    }
}

impl Default for PackageCatalog {
    /// The built-in geospatial distribution.
    fn default() -> Self {
        use InstallMethod::{PackageManagerNative, PipFallback};

        Self::new_unchecked(vec![
            PackageCategory::new("core_geospatial", PackageManagerNative, CORE_GEOSPATIAL),
            PackageCategory::new("python_geospatial", PipFallback, PYTHON_GEOSPATIAL),
            PackageCategory::new("web_mapping", PipFallback, WEB_MAPPING),
            PackageCategory::new("advanced_analytics", PipFallback, ADVANCED_ANALYTICS),
            PackageCategory::new("google_maps", PipFallback, GOOGLE_MAPS),
            PackageCategory::new("dev_tools", PipFallback, DEV_TOOLS),
        ])
    }
}
