use serde::{Deserialize, Serialize};

use crate::layout::names;

/// Which class names make it into a snapshot.
///
/// Matching is by substring. An empty include list admits everything not
/// excluded. The sentinel name is always rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassFilter {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl ClassFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include<S: Into<String>>(mut self, pattern: S) -> Self {
        self.include.push(pattern.into());
        self
    }

    pub fn exclude<S: Into<String>>(mut self, pattern: S) -> Self {
        self.exclude.push(pattern.into());
        self
    }

    pub fn admits(&self, class_name: &str) -> bool {
        if class_name.is_empty() || class_name == names::SENTINEL {
            return false;
        }
        if self.exclude.iter().any(|p| class_name.contains(p.as_str())) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|p| class_name.contains(p.as_str()))
    }
}
