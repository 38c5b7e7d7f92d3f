use std::collections::BTreeMap;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OverrideChainError {
    #[error(
        "cannot override '{frag_id}' with '{new_frag_id}': '{new_frag_id}' is itself overridden \
         and overrides must not form chains"
    )]
    TargetOverridden {
        frag_id: String,
        new_frag_id: String,
    },

    #[error(
        "cannot override '{frag_id}': it is already the target of another override and \
         overrides must not form chains"
    )]
    SourceIsTarget { frag_id: String },
}

/// Per-document table of fragment id replacements set by `overrideFrag`.
///
/// The first override for an id wins. An empty replacement suppresses the fragment.
#[derive(Debug, Clone, Default)]
pub struct FragmentOverrides {
    overrides: BTreeMap<String, String>,
}

impl FragmentOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, frag_id: &str, new_frag_id: &str) -> Result<(), OverrideChainError> {
        if self.overrides.contains_key(new_frag_id) {
            return Err(OverrideChainError::TargetOverridden {
                frag_id: frag_id.to_string(),
                new_frag_id: new_frag_id.to_string(),
            });
        }
        if self.overrides.values().any(|target| target == frag_id) {
            return Err(OverrideChainError::SourceIsTarget {
                frag_id: frag_id.to_string(),
            });
        }
        self.overrides
            .entry(frag_id.to_string())
            .or_insert_with(|| new_frag_id.to_string());
        Ok(())
    }

    /// The id to load instead of `frag_id`, or `frag_id` itself.
    pub fn get<'a>(&'a self, frag_id: &'a str) -> &'a str {
        self.overrides.get(frag_id).map_or(frag_id, String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_first_override_wins() {
        let mut overrides = FragmentOverrides::new();

        overrides.set("Header", "HeaderA").unwrap();
        overrides.set("Header", "HeaderB").unwrap();

        assert_eq!(overrides.get("Header"), "HeaderA");
        assert_eq!(overrides.get("Footer"), "Footer");
    }

    #[test]
    fn test_empty_override_suppresses() {
        let mut overrides = FragmentOverrides::new();
        overrides.set("Footer", "").unwrap();

        assert_eq!(overrides.get("Footer"), "");
    }

    #[test]
    fn test_chain_through_overridden_target_is_rejected() {
        let mut overrides = FragmentOverrides::new();
        overrides.set("B", "C").unwrap();

        assert_eq!(
            overrides.set("A", "B"),
            Err(OverrideChainError::TargetOverridden {
                frag_id: "A".into(),
                new_frag_id: "B".into()
            })
        );
    }

    #[test]
    fn test_overriding_a_target_is_rejected() {
        let mut overrides = FragmentOverrides::new();
        overrides.set("A", "B").unwrap();

        assert_eq!(
            overrides.set("B", "C"),
            Err(OverrideChainError::SourceIsTarget {
                frag_id: "B".into()
            })
        );
        assert_eq!(overrides.get("B"), "B");
    }
}
