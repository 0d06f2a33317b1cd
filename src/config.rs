use std::env;
use std::path::PathBuf;

/// Environment variable naming an explicit OpenCL library to open.
pub const LIBRARY_ENV: &str = "OPENCL_LIBRARY";

#[cfg(target_os = "macos")]
const DEFAULT_LIBRARIES: &[&str] = &[
    "/System/Library/Frameworks/OpenCL.framework/OpenCL",
    "libOpenCL.dylib",
];

#[cfg(target_os = "windows")]
const DEFAULT_LIBRARIES: &[&str] = &["OpenCL.dll"];

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const DEFAULT_LIBRARIES: &[&str] = &["libOpenCL.so.1", "libOpenCL.so"];

/// Decides which shared library provides the OpenCL entry points.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Tried before the platform defaults.
    pub library: Option<PathBuf>,
    /// Skip the platform defaults entirely.
    pub no_defaults: bool,
}

impl LoaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `OPENCL_LIBRARY`; an empty value is ignored.
    pub fn from_env() -> Self {
        let library = env::var_os(LIBRARY_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        Self {
            library,
            no_defaults: false,
        }
    }

    pub fn with_library(mut self, library: impl Into<PathBuf>) -> Self {
        self.library = Some(library.into());
        self
    }

    pub fn without_defaults(mut self) -> Self {
        self.no_defaults = true;
        self
    }

    /// Library names in the order they should be tried.
    pub fn candidates(&self) -> Vec<PathBuf> {
        let mut candidates: Vec<PathBuf> = self.library.iter().cloned().collect();
        if !self.no_defaults {
            candidates.extend(DEFAULT_LIBRARIES.iter().map(PathBuf::from));
        }
        candidates
    }
}
