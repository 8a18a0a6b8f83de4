//! Transition selection and output quality.
//!
//! The service applies a transition between consecutive slides. The client
//! only tracks *which* effects the user picked, as an ordered set of string
//! identifiers, and sends them comma-joined in selection order.
//!
//! The set is never empty: `"none"` is the sentinel for "hard cut" and is
//! what the set falls back to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sentinel identifier meaning "no transition".
pub const NO_TRANSITION: &str = "none";

/// Effects offered by the service, in display order.
pub const KNOWN_TRANSITIONS: &[&str] = &[
    "crossfade",
    "fadeinout",
    "zoom_in",
    "zoom_out",
    "slide_left",
    "slide_right",
];

/// Ordered, non-empty set of transition identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct TransitionSet {
    ids: Vec<String>,
}

impl Default for TransitionSet {
    fn default() -> Self {
        Self {
            ids: vec![NO_TRANSITION.to_string()],
        }
    }
}

impl TransitionSet {
    /// Build a set from identifiers, keeping the first occurrence of each.
    ///
    /// Returns the default `{"none"}` set when `ids` is empty.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self { ids: Vec::new() };
        for id in ids {
            let id = id.as_ref().trim();
            if !id.is_empty() && !set.contains(id) {
                set.ids.push(id.to_string());
            }
        }
        if set.ids.is_empty() {
            return Self::default();
        }
        set.drop_redundant_sentinel();
        set
    }

    /// Toggle `id`: add it when absent, remove it when present.
    ///
    /// Removing the sole remaining member is a no-op. Picking an effect while
    /// only the sentinel is selected replaces the sentinel, and toggling the
    /// sentinel itself resets the selection to `{"none"}`.
    pub fn toggle(&mut self, id: &str) {
        let id = id.trim();
        if id.is_empty() {
            return;
        }
        if id == NO_TRANSITION {
            self.clear_all();
            return;
        }
        if let Some(pos) = self.ids.iter().position(|s| s == id) {
            if self.ids.len() > 1 {
                self.ids.remove(pos);
            }
            return;
        }
        if self.is_none() {
            self.ids.clear();
        }
        self.ids.push(id.to_string());
    }

    /// Replace the selection with every known effect.
    pub fn select_all(&mut self) {
        self.ids = KNOWN_TRANSITIONS.iter().map(|s| s.to_string()).collect();
    }

    /// Replace the selection with `{"none"}`.
    pub fn clear_all(&mut self) {
        self.ids = vec![NO_TRANSITION.to_string()];
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|s| s == id)
    }

    /// True when the selection is exactly the sentinel.
    pub fn is_none(&self) -> bool {
        self.ids.len() == 1 && self.ids[0] == NO_TRANSITION
    }

    /// True when any member other than the sentinel is selected; the
    /// transition duration only matters then.
    pub fn has_effect(&self) -> bool {
        self.ids.iter().any(|s| s != NO_TRANSITION)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Always false; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    /// Wire form sent in the `transition` form field.
    pub fn to_wire(&self) -> String {
        self.ids.join(",")
    }

    fn drop_redundant_sentinel(&mut self) {
        if self.ids.len() > 1 {
            self.ids.retain(|s| s != NO_TRANSITION);
        }
    }
}

impl fmt::Display for TransitionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

impl FromStr for TransitionSet {
    type Err = std::convert::Infallible;

    /// Parse the comma-joined wire form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_ids(s.split(',')))
    }
}

impl TryFrom<Vec<String>> for TransitionSet {
    type Error = std::convert::Infallible;

    fn try_from(ids: Vec<String>) -> Result<Self, Self::Error> {
        Ok(Self::from_ids(ids))
    }
}

impl From<TransitionSet> for Vec<String> {
    fn from(set: TransitionSet) -> Self {
        set.ids
    }
}

/// Output quality tier requested from the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Smaller file, faster encode.
    Low,
    /// Full resolution. (default)
    #[default]
    High,
}

impl Quality {
    /// Wire form sent in the `quality` form field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Low => "low",
            Quality::High => "high",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
