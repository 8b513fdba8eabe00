//! Field path types
//!
//! A [`ConcretePath`] addresses exactly one node of one document
//! (`addresses[1].city`). A [`FieldPath`] addresses a class of leaves with every
//! array index collapsed to a wildcard (`addresses.*.city`).

use std::fmt;

/// Marker used for the array wildcard when a field path is rendered
pub const WILDCARD: &str = "*";

/// Rendering of the document root
pub const ROOT: &str = "$";

/// One step of a concrete path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// One step of a normalized field path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldSegment {
    Key(String),
    AnyIndex,
}

impl From<&PathSegment> for FieldSegment {
    fn from(segment: &PathSegment) -> Self {
        match segment {
            PathSegment::Key(key) => FieldSegment::Key(key.clone()),
            PathSegment::Index(_) => FieldSegment::AnyIndex,
        }
    }
}

/// Fully indexed location of one node in a specific document
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConcretePath {
    segments: Vec<PathSegment>,
}

impl ConcretePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Path of the child reached by `segment`
    pub fn child(&self, segment: PathSegment) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend_from_slice(&self.segments);
        segments.push(segment);
        Self { segments }
    }

    /// Collapse array indices into wildcards
    pub fn normalize(&self) -> FieldPath {
        FieldPath {
            segments: self.segments.iter().map(FieldSegment::from).collect(),
        }
    }
}

impl From<Vec<PathSegment>> for ConcretePath {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }
}

impl fmt::Display for ConcretePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str(ROOT);
        }
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if i == 0 => write!(f, "{key}")?,
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// Array-index-agnostic path identifying a class of leaf locations
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath {
    segments: Vec<FieldSegment>,
}

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[FieldSegment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Parse the dotted rendering back into segments.
    ///
    /// A `*` segment is read as the array wildcard and `$` as the root, so keys
    /// that are literally `*` or contain dots do not survive a round trip.
    pub fn parse(path: &str) -> Self {
        if path.is_empty() || path == ROOT {
            return Self::root();
        }
        let segments = path
            .split('.')
            .map(|part| {
                if part == WILDCARD {
                    FieldSegment::AnyIndex
                } else {
                    FieldSegment::Key(part.to_string())
                }
            })
            .collect();
        Self { segments }
    }

    /// Name of this field as understood by the policy authority.
    ///
    /// Each `.*.` run is replaced by a single dot, scanning left to right
    /// without overlap: `items.*.v` becomes `items.v` and `a.*.*.b` becomes
    /// `a.*.b`. Leading and trailing wildcards are kept.
    pub fn resource_name(&self) -> String {
        if self.segments.is_empty() {
            return ROOT.to_string();
        }
        self.to_string().replace(".*.", ".")
    }
}

impl From<Vec<FieldSegment>> for FieldPath {
    fn from(segments: Vec<FieldSegment>) -> Self {
        Self { segments }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str(ROOT);
        }
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match segment {
                FieldSegment::Key(key) => f.write_str(key)?,
                FieldSegment::AnyIndex => f.write_str(WILDCARD)?,
            }
        }
        Ok(())
    }
}
