use crate::{query, Candidate, Catalog, Error, Recommendation, Resolvers};

/// Produces recommendations for registered policies.
#[derive(Clone)]
pub struct Runner {
    catalog: Catalog,
    resolvers: Resolvers,
}

// === impl Runner ===

impl Runner {
    pub fn new(catalog: Catalog, resolvers: Resolvers) -> Self {
        Self { catalog, resolvers }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Evaluates every query of the named policy against every object it
    /// targets.
    ///
    /// Recommendations are ordered by object and then by query. Any
    /// resolution or evaluation failure fails the whole lookup.
    #[tracing::instrument(skip(self))]
    pub async fn get_recommendations_by_name(
        &self,
        name: &str,
    ) -> Result<Vec<Recommendation>, Error> {
        let collection = self
            .catalog
            .lookup(name)
            .ok_or_else(|| Error::NotRegistered(name.to_string()))?;

        let candidates = self
            .resolvers
            .resolve(collection.kind, &collection.match_params)
            .await?;

        let mut recommendations =
            Vec::with_capacity(candidates.len() * collection.queries.len());
        for Candidate { object, input } in &candidates {
            for q in &collection.queries {
                if let Some(raw) = query::evaluate(q.as_ref(), input)? {
                    let object_id = object.id(&raw.policy_id);
                    recommendations.push(Recommendation::normalize(raw, object_id, name));
                }
            }
        }

        tracing::debug!(
            objects = candidates.len(),
            recommendations = recommendations.len(),
            "Evaluated"
        );
        Ok(recommendations)
    }
}
