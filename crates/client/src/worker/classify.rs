//! Request classification.

use serde::Serialize;
use url::Url;

/// Which strategy serves a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequestClass {
    /// Stylesheets and scripts: cache-first.
    Static,
    /// Pages and everything else: network-first with cache fallback.
    Dynamic,
}

/// Classify a URL by its path suffix.
///
/// Query string and fragment never affect the result, and suffixes are
/// compared case-insensitively.
pub fn classify(url: &Url, static_suffixes: &[String]) -> RequestClass {
    let path = url.path().to_ascii_lowercase();
    if static_suffixes
        .iter()
        .any(|suffix| path.ends_with(&suffix.to_ascii_lowercase()))
    {
        RequestClass::Static
    } else {
        RequestClass::Dynamic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suffixes() -> Vec<String> {
        vec![".css".into(), ".js".into()]
    }

    fn class_of(url: &str) -> RequestClass {
        classify(&Url::parse(url).unwrap(), &suffixes())
    }

    #[test]
    fn test_stylesheet_and_script_are_static() {
        assert_eq!(class_of("http://localhost:8000/static/css/main.css"), RequestClass::Static);
        assert_eq!(class_of("http://localhost:8000/static/js/main.js"), RequestClass::Static);
        assert_eq!(class_of("http://localhost:8000/static/js/gallery-3d.js"), RequestClass::Static);
    }

    #[test]
    fn test_query_string_ignored() {
        assert_eq!(class_of("http://localhost:8000/static/css/main.css?v=3"), RequestClass::Static);
        assert_eq!(class_of("http://localhost:8000/catalog/?format=.css"), RequestClass::Dynamic);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(class_of("http://localhost:8000/static/CSS/MAIN.CSS"), RequestClass::Static);
    }

    #[test]
    fn test_pages_and_other_assets_are_dynamic() {
        assert_eq!(class_of("http://localhost:8000/"), RequestClass::Dynamic);
        assert_eq!(class_of("http://localhost:8000/catalog/"), RequestClass::Dynamic);
        assert_eq!(class_of("http://localhost:8000/static/images/favicon.ico"), RequestClass::Dynamic);
        assert_eq!(class_of("http://localhost:8000/static/js/data.json"), RequestClass::Dynamic);
        assert_eq!(class_of("http://localhost:8000/static/css/main.css.map"), RequestClass::Dynamic);
    }
}
