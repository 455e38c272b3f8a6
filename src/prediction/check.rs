//! Declarative postcondition checks.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Which snapshot a leaf check reads its field from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Source {
    /// The snapshot taken before the batch executed.
    Before,
    /// The refreshed snapshot taken after the batch executed.
    #[default]
    After,
}

/// Leaf comparison performed by a check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Comparator {
    Eq,
    Gte,
    Lte,
    Subset,
    Includes,
    Exists,
    StartsWith,
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Eq => "eq",
            Self::Gte => "gte",
            Self::Lte => "lte",
            Self::Subset => "subset",
            Self::Includes => "includes",
            Self::Exists => "exists",
            Self::StartsWith => "startsWith",
        };
        f.write_str(name)
    }
}

/// A single declarative check, or a group of nested checks.
///
/// Serialized with the comparator name as tag, so a check reads the same as
/// it would in a JSON rule file:
///
/// ```rust
/// use foresight::prediction::Check;
///
/// let check: Check = serde_json::from_str(
///     r#"{"comparator":"subset","field":"labels","expected":["a","b"]}"#,
/// )
/// .unwrap();
/// assert_eq!(check, Check::subset("labels", vec!["a".into(), "b".into()]));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "comparator", rename_all = "camelCase")]
pub enum Check {
    Eq {
        field: String,
        expected: Value,
        #[serde(default)]
        from: Source,
    },
    Gte {
        field: String,
        expected: f64,
        #[serde(default)]
        from: Source,
    },
    Lte {
        field: String,
        expected: f64,
        #[serde(default)]
        from: Source,
    },
    Subset {
        field: String,
        expected: Vec<Value>,
        #[serde(default)]
        from: Source,
    },
    Includes {
        field: String,
        expected: Value,
        #[serde(default)]
        from: Source,
    },
    Exists {
        field: String,
        #[serde(default)]
        from: Source,
    },
    StartsWith {
        field: String,
        expected: String,
        #[serde(default)]
        from: Source,
    },
    All {
        checks: Vec<Check>,
    },
    Any {
        checks: Vec<Check>,
    },
}

impl Check {
    pub fn eq(field: impl Into<String>, expected: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            expected: expected.into(),
            from: Source::After,
        }
    }

    pub fn gte(field: impl Into<String>, expected: f64) -> Self {
        Self::Gte {
            field: field.into(),
            expected,
            from: Source::After,
        }
    }

    pub fn lte(field: impl Into<String>, expected: f64) -> Self {
        Self::Lte {
            field: field.into(),
            expected,
            from: Source::After,
        }
    }

    pub fn subset(field: impl Into<String>, expected: Vec<Value>) -> Self {
        Self::Subset {
            field: field.into(),
            expected,
            from: Source::After,
        }
    }

    pub fn includes(field: impl Into<String>, expected: impl Into<Value>) -> Self {
        Self::Includes {
            field: field.into(),
            expected: expected.into(),
            from: Source::After,
        }
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Self::Exists {
            field: field.into(),
            from: Source::After,
        }
    }

    pub fn starts_with(field: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::StartsWith {
            field: field.into(),
            expected: expected.into(),
            from: Source::After,
        }
    }

    pub fn all(checks: Vec<Check>) -> Self {
        Self::All { checks }
    }

    pub fn any(checks: Vec<Check>) -> Self {
        Self::Any { checks }
    }

    /// Read this leaf's field from the pre-execution snapshot.
    ///
    /// Groups are returned unchanged; set the source on their leaves instead.
    pub fn before(self) -> Self {
        self.with_source(Source::Before)
    }

    fn with_source(mut self, source: Source) -> Self {
        match &mut self {
            Self::Eq { from, .. }
            | Self::Gte { from, .. }
            | Self::Lte { from, .. }
            | Self::Subset { from, .. }
            | Self::Includes { from, .. }
            | Self::Exists { from, .. }
            | Self::StartsWith { from, .. } => *from = source,
            Self::All { .. } | Self::Any { .. } => {}
        }
        self
    }
}

/// Declared expected postconditions of one action.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub checks: Vec<Check>,
}

impl Prediction {
    pub fn new(checks: Vec<Check>) -> Self {
        Self {
            description: None,
            checks,
        }
    }

    /// A prediction that only describes the expected outcome.
    pub fn described(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            checks: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn source_defaults_to_after_when_omitted() {
        let check: Check =
            serde_json::from_value(json!({"comparator": "eq", "field": "status", "expected": "open"}))
                .unwrap();

        assert_eq!(check, Check::eq("status", "open"));
    }

    #[test]
    fn before_sets_source_on_leaves_only() {
        assert!(matches!(
            Check::gte("count", 1.0).before(),
            Check::Gte {
                from: Source::Before,
                ..
            }
        ));

        let group = Check::all(vec![Check::exists("x")]).before();
        assert_eq!(group, Check::all(vec![Check::exists("x")]));
    }

    #[test]
    fn groups_deserialize_nested_checks() {
        let check: Check = serde_json::from_value(json!({
            "comparator": "any",
            "checks": [
                {"comparator": "startsWith", "field": "branch", "expected": "fix/"},
                {"comparator": "exists", "field": "pr.number", "from": "before"}
            ]
        }))
        .unwrap();

        assert_eq!(
            check,
            Check::any(vec![
                Check::starts_with("branch", "fix/"),
                Check::exists("pr.number").before(),
            ])
        );
    }

    #[test]
    fn prediction_builder_collects_checks() {
        let prediction = Prediction::default()
            .with_description("issue is closed")
            .check(Check::eq("status", "closed"));

        assert_eq!(prediction.description.as_deref(), Some("issue is closed"));
        assert_eq!(prediction.checks.len(), 1);
    }

    #[test]
    fn comparator_displays_wire_name() {
        assert_eq!(Comparator::StartsWith.to_string(), "startsWith");
        assert_eq!(Comparator::Gte.to_string(), "gte");
    }
}
