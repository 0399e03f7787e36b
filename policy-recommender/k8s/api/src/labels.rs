use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, sync::Arc};

/// An equality-based label selector, as configured by a policy's match labels.
#[derive(Clone, Debug, Eq, PartialEq, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Labels(Arc<Map>);

pub type Map = BTreeMap<String, String>;

// === impl Labels ===

impl Labels {
    /// Renders the selector in the `key=value,key=value` form accepted by the
    /// Kubernetes list API.
    ///
    /// Pairs are emitted in key order so the rendering is deterministic.
    pub fn to_selector(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Labels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{k}={v}")?;
        }
        Ok(())
    }
}

impl From<Map> for Labels {
    #[inline]
    fn from(labels: Map) -> Self {
        Self(Arc::new(labels))
    }
}

impl std::iter::FromIterator<(String, String)> for Labels {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(Arc::new(iter.into_iter().collect()))
    }
}

impl std::iter::FromIterator<(&'static str, &'static str)> for Labels {
    fn from_iter<T: IntoIterator<Item = (&'static str, &'static str)>>(iter: T) -> Self {
        iter.into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector() {
        for (labels, selector, msg) in &[
            (Labels::default(), "", "empty selector"),
            (Labels::from_iter(Some(("app", "web"))), "app=web", "single pair"),
            (
                Labels::from_iter(vec![("tier", "frontend"), ("app", "web")]),
                "app=web,tier=frontend",
                "sorted pairs",
            ),
        ] {
            assert_eq!(labels.to_selector(), *selector, "{}", msg);
        }
    }

    #[test]
    fn deserializes_from_map() {
        let labels: Labels =
            serde_json::from_value(serde_json::json!({"tier": "frontend", "app": "web"}))
                .unwrap();
        assert_eq!(labels.to_selector(), "app=web,tier=frontend");
    }
}
