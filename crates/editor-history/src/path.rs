//! Structural paths.
//!
//! A [`StructuralPath`] locates an element by position instead of identity: each entry is the
//! 0-based index among the **element** children of the previous step, starting at
//! [`DocumentModel::root`]. Paths survive node destruction/re-creation as long as the tree
//! keeps the same shape along the path, and they survive replacement of unrelated sibling
//! subtrees.
//!
//! The textual form is a bracketed comma list, e.g. `[0,3,1]`; the empty path is `[]`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::document::{DocumentModel, element_of};
use crate::error::PathResolutionError;

/// Root-relative sequence of element sibling indices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuralPath(Vec<usize>);

impl StructuralPath {
    /// The path of the root itself.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Create a path from raw indices (root to node order).
    pub fn new(indices: Vec<usize>) -> Self {
        Self(indices)
    }

    /// Indices in root-to-node order.
    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    /// Number of steps below the root.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for the root path.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compute the path of `node`.
    ///
    /// Text leaves are addressed through their parent element. Fails with
    /// [`PathResolutionError::Detached`] when `node` is not under the root.
    pub fn encode<D: DocumentModel + ?Sized>(
        doc: &D,
        node: D::Node,
    ) -> Result<Self, PathResolutionError> {
        let root = doc.root();
        let mut current = element_of(doc, node).ok_or(PathResolutionError::Detached)?;
        let mut reversed = Vec::new();

        while current != root {
            let parent = doc.parent(current).ok_or(PathResolutionError::Detached)?;
            let index = doc
                .children(parent)
                .iter()
                .position(|child| *child == current)
                .ok_or(PathResolutionError::Detached)?;
            reversed.push(index);
            current = parent;
        }

        reversed.reverse();
        Ok(Self(reversed))
    }

    /// Follow the path from the root. Never creates nodes.
    pub fn resolve<D: DocumentModel + ?Sized>(
        &self,
        doc: &D,
    ) -> Result<D::Node, PathResolutionError> {
        let mut node = doc.root();
        for (depth, &index) in self.0.iter().enumerate() {
            let children = doc.children(node);
            node = *children
                .get(index)
                .ok_or(PathResolutionError::IndexOutOfRange {
                    depth,
                    index,
                    len: children.len(),
                })?;
        }
        Ok(node)
    }
}

impl From<Vec<usize>> for StructuralPath {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl fmt::Display for StructuralPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, index) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{index}")?;
        }
        f.write_str("]")
    }
}

/// The textual form was not a bracketed list of non-negative integers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid structural path '{0}'")]
pub struct ParsePathError(pub String);

impl FromStr for StructuralPath {
    type Err = ParsePathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(|| ParsePathError(s.to_string()))?;

        if inner.is_empty() {
            return Ok(Self::root());
        }

        inner
            .split(',')
            .map(|part| part.parse::<usize>())
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
            .map_err(|_| ParsePathError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        let path = StructuralPath::new(vec![0, 12, 3]);
        assert_eq!(path.to_string(), "[0,12,3]");
        assert_eq!("[0,12,3]".parse::<StructuralPath>().unwrap(), path);
    }

    #[test]
    fn test_empty_path_text() {
        assert_eq!(StructuralPath::root().to_string(), "[]");
        assert!("[]".parse::<StructuralPath>().unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("0,1".parse::<StructuralPath>().is_err());
        assert!("[0,,1]".parse::<StructuralPath>().is_err());
        assert!("[-1]".parse::<StructuralPath>().is_err());
        assert!("[a]".parse::<StructuralPath>().is_err());
        assert!("[1".parse::<StructuralPath>().is_err());
    }
}
