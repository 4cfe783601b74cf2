//! Slash-separated tree paths

use serde::{Deserialize, Serialize};
use std::fmt;

/// Address of a node in the store tree, e.g. `groups/g1/members/u9`.
///
/// Leading, trailing, and repeated slashes are normalized away on
/// construction, so two paths naming the same node always compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StorePath(String);

impl StorePath {
    pub fn new(path: impl AsRef<str>) -> Self {
        let normalized = path
            .as_ref()
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("/");
        StorePath(normalized)
    }

    /// Extend the path by one segment.
    pub fn child(&self, segment: impl AsRef<str>) -> Self {
        if self.0.is_empty() {
            StorePath::new(segment.as_ref())
        } else {
            StorePath::new(format!("{}/{}", self.0, segment.as_ref()))
        }
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|segment| !segment.is_empty())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_normalization() {
        assert_eq!(StorePath::new("/groups/g1/"), StorePath::new("groups/g1"));
        assert_eq!(StorePath::new("groups//g1"), StorePath::new("groups/g1"));
    }

    #[test]
    fn test_child_extends_path() {
        let path = StorePath::new("groups").child("g1").child("info");
        assert_eq!(path.as_str(), "groups/g1/info");
    }

    #[test]
    fn test_segments() {
        let path = StorePath::new("users/u9/chats");
        let segments: Vec<_> = path.segments().collect();
        assert_eq!(segments, vec!["users", "u9", "chats"]);
    }
}
