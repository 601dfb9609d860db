//! Path normalization onto the `/api` namespace.
//!
//! # Design
//! Every path handed to the client falls into one of three shapes: an
//! absolute URL (anything starting with `http`), a path already under
//! `/api`, or a bare path. Classification is pure prefix matching; no URL
//! parsing happens here, so `"httpbin"` counts as absolute and `"/apiary"`
//! counts as namespaced.

const ABSOLUTE_PREFIX: &str = "http";
const API_PREFIX: &str = "/api";

/// The shape of a path as seen by the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiPath {
    /// Starts with `http`; passed through untouched.
    Absolute,
    /// Starts with `/api`; passed through untouched.
    Namespaced,
    /// Anything else; gets the `/api` prefix.
    Bare,
}

impl ApiPath {
    pub fn classify(path: &str) -> Self {
        if path.starts_with(ABSOLUTE_PREFIX) {
            ApiPath::Absolute
        } else if path.starts_with(API_PREFIX) {
            ApiPath::Namespaced
        } else {
            ApiPath::Bare
        }
    }
}

/// Map a raw path to its API path.
///
/// Bare paths get `/api` prepended, with a separating `/` only when the
/// path does not already start with one.
pub fn api_url(path: &str) -> String {
    match ApiPath::classify(path) {
        ApiPath::Absolute | ApiPath::Namespaced => path.to_string(),
        ApiPath::Bare if path.starts_with('/') => format!("{API_PREFIX}{path}"),
        ApiPath::Bare => format!("{API_PREFIX}/{path}"),
    }
}
