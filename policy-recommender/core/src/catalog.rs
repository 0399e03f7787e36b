use crate::{Error, Kind, MatchParameters, Query};
use ahash::AHashMap as HashMap;
use std::sync::Arc;

/// The queries registered under a policy name and the objects they target.
#[derive(Clone, Debug)]
pub struct QueryCollection {
    pub kind: Kind,
    pub match_params: MatchParameters,
    pub queries: Vec<Arc<dyn Query>>,
}

/// An immutable mapping of policy names to their query collections.
///
/// Catalogs are built once and shared by all lookups; clones share the
/// underlying map.
#[derive(Clone, Debug, Default)]
pub struct Catalog(Arc<HashMap<String, QueryCollection>>);

// === impl QueryCollection ===

impl QueryCollection {
    /// Builds a collection, checking that the match parameters are complete
    /// for `kind`.
    pub fn new(
        kind: Kind,
        match_params: MatchParameters,
        queries: Vec<Arc<dyn Query>>,
    ) -> Result<Self, Error> {
        match_params.validate(kind)?;
        Ok(Self {
            kind,
            match_params,
            queries,
        })
    }
}

// === impl Catalog ===

impl Catalog {
    /// Builds a catalog, rejecting duplicate policy names.
    pub fn try_from_iter(
        policies: impl IntoIterator<Item = (String, QueryCollection)>,
    ) -> Result<Self, Error> {
        let mut map = HashMap::new();
        for (name, collection) in policies {
            if map.contains_key(&name) {
                return Err(Error::DuplicatePolicy(name));
            }
            map.insert(name, collection);
        }
        Ok(Self(Arc::new(map)))
    }

    pub fn lookup(&self, name: &str) -> Option<&QueryCollection> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over registered policy names in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}
