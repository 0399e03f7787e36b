#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Policy queries written in Rego.

use anyhow::{Context, Result};
use parking_lot::Mutex;
use policy_recommender_core::{Query, ResultSet};
use regorus::{Engine, Value};
use std::fmt;

/// A Rego query over a set of parsed policy modules.
///
/// Modules are parsed when the query is compiled. Each evaluation runs on a
/// copy of the compiled engine, so evaluations never observe one another's
/// input.
pub struct RegoQuery {
    engine: Mutex<Engine>,
    query: String,
    packages: Vec<String>,
}

/// A Rego module's source and the path it was loaded from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Module {
    pub path: String,
    pub source: String,
}

// === impl RegoQuery ===

impl RegoQuery {
    /// Parses `modules` and prepares `query` (e.g. `data.example.result`) for
    /// evaluation.
    pub fn compile(
        modules: impl IntoIterator<Item = Module>,
        query: impl Into<String>,
    ) -> Result<Self> {
        let query = query.into();
        anyhow::ensure!(!query.trim().is_empty(), "query must not be empty");

        let mut engine = Engine::new();
        let mut packages = Vec::new();
        for Module { path, source } in modules {
            let package = engine
                .add_policy(path.clone(), source)
                .with_context(|| format!("failed to parse {path}"))?;
            tracing::debug!(%path, %package, "Parsed module");
            packages.push(package);
        }
        anyhow::ensure!(!packages.is_empty(), "query {query} has no modules");

        Ok(Self {
            engine: Mutex::new(engine),
            query,
            packages,
        })
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// The packages declared by the query's modules.
    pub fn packages(&self) -> &[String] {
        &self.packages
    }
}

impl Query for RegoQuery {
    fn eval(&self, input: &serde_json::Value) -> Result<Vec<ResultSet>> {
        // Evaluation mutates the engine's input and caches, so each call runs
        // on its own copy of the parsed modules.
        let mut engine = self.engine.lock().clone();
        engine.set_input(Value::from_json_str(&input.to_string())?);

        let results = engine
            .eval_query(self.query.clone(), false)
            .with_context(|| format!("failed to evaluate {}", self.query))?;

        results
            .result
            .into_iter()
            .map(|result| {
                result
                    .expressions
                    .into_iter()
                    .map(|expr| serde_json::to_value(&expr.value).map_err(Into::into))
                    .collect::<Result<ResultSet>>()
            })
            .collect()
    }
}

impl fmt::Debug for RegoQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegoQuery")
            .field("query", &self.query)
            .field("packages", &self.packages)
            .finish()
    }
}
