//! Compiles filesystem route paths into URL patterns.
//!
//! A route file's relative path becomes its URL: `a/[id]/edit.rs` compiles
//! to `/a/:id/edit`, `a/[...rest].rs` to `/a/:rest*`, and `index.rs` to `/`.
//! The same patterns are matched against concrete request paths to extract
//! named parameters.

use crate::error::{ServerError, ServerResult};
use std::collections::HashMap;
use std::fmt;

/// Source extensions stripped before a path is compiled.
const SOURCE_EXTENSIONS: [&str; 5] = ["rs", "js", "ts", "jsx", "tsx"];

/// One segment of a compiled URL pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Matches its literal text only.
    Static(String),
    /// Matches any single path segment, binding it to the parameter name.
    Dynamic(String),
    /// Matches one or more trailing segments, bound joined by `/`.
    CatchAll(String),
}

impl Segment {
    fn parse(raw: &str) -> ServerResult<Segment> {
        if !raw.contains('[') && !raw.contains(']') {
            return Ok(Segment::Static(raw.to_string()));
        }
        if !raw.starts_with('[') || !raw.ends_with(']') || raw.len() < 3 {
            return Err(ServerError::InvalidPattern(format!(
                "malformed bracket segment `{}`",
                raw
            )));
        }
        let inner = &raw[1..raw.len() - 1];
        let (name, catch_all) = match inner.strip_prefix("...") {
            Some(rest) => (rest, true),
            None => (inner, false),
        };
        if name.is_empty() || name.contains('[') || name.contains(']') {
            return Err(ServerError::InvalidPattern(format!(
                "malformed bracket segment `{}`",
                raw
            )));
        }
        if catch_all {
            Ok(Segment::CatchAll(name.to_string()))
        } else {
            Ok(Segment::Dynamic(name.to_string()))
        }
    }
}

/// An ordered sequence of segments compiled from a route file path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    segments: Vec<Segment>,
}

impl Pattern {
    /// Compiles a filesystem-relative route path into a pattern.
    ///
    /// Rules, in order: strip the source extension, drop a trailing
    /// `index` segment (the directory's own path), `[...name]` becomes a
    /// catch-all, `[name]` becomes a dynamic segment, anything else is
    /// static. Only malformed bracket syntax fails.
    pub fn compile(path: &str) -> ServerResult<Pattern> {
        let mut parts: Vec<&str> = split_path(path);
        if let Some(last) = parts.last_mut() {
            *last = strip_extension(last);
        }
        if parts.last().copied() == Some("index") {
            parts.pop();
        }

        let mut segments = Vec::with_capacity(parts.len());
        for part in parts {
            segments.push(Segment::parse(part)?);
        }
        for (i, segment) in segments.iter().enumerate() {
            if matches!(segment, Segment::CatchAll(_)) && i + 1 != segments.len() {
                return Err(ServerError::InvalidPattern(format!(
                    "catch-all segment must be last in `{}`",
                    path
                )));
            }
        }
        Ok(Pattern { segments })
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// True when any segment binds a parameter. Patterns for which this
    /// is false sort ahead of all others during matching.
    pub fn is_dynamic(&self) -> bool {
        self.segments
            .iter()
            .any(|s| !matches!(s, Segment::Static(_)))
    }

    fn has_catch_all(&self) -> bool {
        matches!(self.segments.last(), Some(Segment::CatchAll(_)))
    }

    /// Matches a concrete request path, binding named parameters.
    ///
    /// Segment counts must be equal, except that a trailing catch-all
    /// absorbs one or more remaining segments as a single `/`-joined
    /// value. Returns `None` on the first mismatch; not matching is a
    /// normal outcome, not an error.
    pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let parts = split_path(path);
        if self.has_catch_all() {
            if parts.len() < self.segments.len() {
                return None;
            }
        } else if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Static(lit) => {
                    if lit != parts[i] {
                        return None;
                    }
                }
                Segment::Dynamic(name) => {
                    params.insert(name.clone(), parts[i].to_string());
                }
                Segment::CatchAll(name) => {
                    params.insert(name.clone(), parts[i..].join("/"));
                }
            }
        }
        Some(params)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "/");
        }
        for segment in &self.segments {
            match segment {
                Segment::Static(lit) => write!(f, "/{}", lit)?,
                Segment::Dynamic(name) => write!(f, "/:{}", name)?,
                Segment::CatchAll(name) => write!(f, "/:{}*", name)?,
            }
        }
        Ok(())
    }
}

/// True when any segment of the path is literally `404`: the file is the
/// designated fallback and is excluded from normal matching.
pub fn is_fallback_path(path: &str) -> bool {
    split_path(path)
        .iter()
        .map(|part| strip_extension(part))
        .any(|part| part.eq_ignore_ascii_case("404"))
}

/// True when the path sits under an `api` subtree. Such pages are excluded
/// from the client table; the server owns that URL space.
pub fn is_api_path(path: &str) -> bool {
    split_path(path)
        .first()
        .map(|part| strip_extension(part).eq_ignore_ascii_case("api"))
        .unwrap_or(false)
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn strip_extension(part: &str) -> &str {
    for ext in SOURCE_EXTENSIONS {
        if let Some(stem) = part.strip_suffix(ext) {
            if let Some(stem) = stem.strip_suffix('.') {
                if !stem.is_empty() {
                    return stem;
                }
            }
        }
    }
    part
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_paths_compile_verbatim() {
        assert_eq!(Pattern::compile("users/settings.rs").unwrap().to_string(), "/users/settings");
        assert!(!Pattern::compile("a/b/c.ts").unwrap().is_dynamic());
    }

    #[test]
    fn index_collapses_to_directory_path() {
        assert_eq!(Pattern::compile("index.rs").unwrap().to_string(), "/");
        assert_eq!(Pattern::compile("blog/index.jsx").unwrap().to_string(), "/blog");
    }

    #[test]
    fn bracket_segments_compile_to_params() {
        assert_eq!(Pattern::compile("a/[id]/edit.rs").unwrap().to_string(), "/a/:id/edit");
        assert_eq!(Pattern::compile("a/[...rest].rs").unwrap().to_string(), "/a/:rest*");
    }

    #[test]
    fn malformed_brackets_are_rejected() {
        for bad in ["a/[id", "a/id]", "a/[].rs", "a/[...].rs", "a/[[id]].rs"] {
            assert!(matches!(
                Pattern::compile(bad),
                Err(ServerError::InvalidPattern(_))
            ));
        }
    }

    #[test]
    fn catch_all_must_be_trailing() {
        assert!(matches!(
            Pattern::compile("a/[...rest]/b.rs"),
            Err(ServerError::InvalidPattern(_))
        ));
    }

    #[test]
    fn dynamic_segments_bind_values() {
        let pattern = Pattern::compile("users/[id].rs").unwrap();
        let params = pattern.matches("/users/42").unwrap();
        assert_eq!(params["id"], "42");
        assert!(pattern.matches("/users").is_none());
    }

    #[test]
    fn segment_counts_must_match_exactly() {
        let pattern = Pattern::compile("a/[id].rs").unwrap();
        assert!(pattern.matches("/a/b/c").is_none());
    }

    #[test]
    fn catch_all_absorbs_trailing_segments() {
        let pattern = Pattern::compile("files/[...path].rs").unwrap();
        assert_eq!(pattern.matches("/files/a/b/c").unwrap()["path"], "a/b/c");
        assert_eq!(pattern.matches("/files/a").unwrap()["path"], "a");
        // At least one trailing segment is required.
        assert!(pattern.matches("/files").is_none());
    }

    #[test]
    fn reserved_segments_are_detected() {
        assert!(is_fallback_path("404.jsx"));
        assert!(is_fallback_path("shop/404.tsx"));
        assert!(!is_fallback_path("shop/index.tsx"));
        assert!(is_api_path("api/widgets/[id].ts"));
        assert!(!is_api_path("shop/api.ts"));
    }
}
