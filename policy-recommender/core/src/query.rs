use crate::Error;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;

/// A compiled predicate evaluated against a single object's input document.
///
/// Queries are compiled and validated before they are registered in a
/// catalog. Evaluation must be free of side effects so that a query may be
/// shared across concurrent lookups.
pub trait Query: fmt::Debug + Send + Sync {
    /// Evaluates the query, returning one [`ResultSet`] per solution.
    fn eval(&self, input: &Value) -> anyhow::Result<Vec<ResultSet>>;
}

/// The expression values produced by one solution of a query, in order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultSet {
    pub expressions: Vec<Value>,
}

/// The structured output of a policy query.
///
/// Missing and null fields decode to their empty values; fields of the wrong
/// type fail to decode.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RawQueryResult {
    #[serde(rename = "ALLOW", deserialize_with = "null_as_default")]
    pub allow: bool,

    #[serde(rename = "POLICY_ID", deserialize_with = "null_as_default")]
    pub policy_id: String,

    #[serde(rename = "POLICY_VERSION", deserialize_with = "null_as_default")]
    pub policy_version: String,

    #[serde(rename = "POLICY_SEVERITY", deserialize_with = "null_as_default")]
    pub policy_severity: String,

    #[serde(rename = "POLICY_TITLE", deserialize_with = "null_as_default")]
    pub policy_title: String,

    #[serde(rename = "POLICY_SUCCESS_MESSAGE", deserialize_with = "null_as_default")]
    pub success_message: String,

    #[serde(rename = "FAILURE_MESSAGE", deserialize_with = "null_as_default")]
    pub failure_messages: Vec<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

// === impl ResultSet ===

impl From<Vec<Value>> for ResultSet {
    fn from(expressions: Vec<Value>) -> Self {
        Self { expressions }
    }
}

impl std::iter::FromIterator<Value> for ResultSet {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        Self {
            expressions: iter.into_iter().collect(),
        }
    }
}

/// Evaluates `query` against `input`.
///
/// Yields a result only when the query produces exactly one result set.
/// Queries that produce no result sets, or more than one, yield `None`; this
/// is not treated as an error.
pub fn evaluate(query: &dyn Query, input: &Value) -> Result<Option<RawQueryResult>, Error> {
    let mut results = query.eval(input).map_err(Error::Eval)?;
    if results.len() != 1 {
        tracing::debug!(results = results.len(), ?query, "Skipping ambiguous query result");
        return Ok(None);
    }

    let value = results
        .pop()
        .and_then(|set| set.expressions.into_iter().next())
        .ok_or(Error::EmptyResultSet)?;
    let raw = serde_json::from_value(value).map_err(Error::Decode)?;
    Ok(Some(raw))
}
