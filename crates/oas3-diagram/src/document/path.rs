use std::{convert::Infallible, fmt, str::FromStr};

use serde::{Serialize, Serializer};

/// Location of a node inside the document, as a list of raw segments.
///
/// Renders as a slash-joined JSON pointer body (`paths/~1pets/get/responses/200`), with `~` and `/`
/// escaped inside segments so the string form parses back to the same segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclarationPath(Vec<String>);

impl DeclarationPath {
  #[must_use]
  pub fn root() -> Self {
    Self::default()
  }

  #[must_use]
  pub fn from_segments<I, S>(segments: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self(segments.into_iter().map(Into::into).collect())
  }

  /// Returns a new path with `segment` appended.
  #[must_use]
  pub fn child(&self, segment: impl Into<String>) -> Self {
    let mut segments = self.0.clone();
    segments.push(segment.into());
    Self(segments)
  }

  #[must_use]
  pub fn parent(&self) -> Option<Self> {
    self.0.split_last().map(|(_, rest)| Self(rest.to_vec()))
  }

  #[must_use]
  pub fn segments(&self) -> &[String] {
    &self.0
  }

  #[must_use]
  pub fn last(&self) -> Option<&str> {
    self.0.last().map(String::as_str)
  }

  #[must_use]
  pub fn len(&self) -> usize {
    self.0.len()
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// Returns true if `prefix` is an ancestor of, or equal to, this path.
  #[must_use]
  pub fn starts_with(&self, prefix: &DeclarationPath) -> bool {
    self.0.starts_with(&prefix.0)
  }
}

pub(crate) fn escape_segment(segment: &str) -> String {
  segment.replace('~', "~0").replace('/', "~1")
}

fn unescape_segment(segment: &str) -> String {
  segment.replace("~1", "/").replace("~0", "~")
}

impl fmt::Display for DeclarationPath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (index, segment) in self.0.iter().enumerate() {
      if index > 0 {
        f.write_str("/")?;
      }
      f.write_str(&escape_segment(segment))?;
    }
    Ok(())
  }
}

impl FromStr for DeclarationPath {
  type Err = Infallible;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let trimmed = s.trim_start_matches('#').trim_matches('/');
    if trimmed.is_empty() {
      return Ok(Self::root());
    }
    Ok(Self(trimmed.split('/').map(unescape_segment).collect()))
  }
}

impl Serialize for DeclarationPath {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}
