use crate::RawQueryResult;
use policy_recommender_k8s_api::GroupVersionResource;
use serde::Serialize;

/// The outcome of evaluating one policy query against one object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub allow: bool,

    /// The name of the policy that produced this recommendation.
    pub category_name: String,

    pub object_id: String,

    pub policy_version: String,
    pub policy_severity: String,
    pub policy_title: String,

    /// The success message when allowed; otherwise, the failure reasons.
    pub policy_message: String,
}

/// Identifies the object a recommendation was produced for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ObjectRef {
    HelmRelease { namespace: String, name: String },
    Pod { namespace: String, name: String },
    CustomResource(GroupVersionResource),
}

const FAILURE_SEPARATOR: &str = ". ";

// === impl Recommendation ===

impl Recommendation {
    pub fn normalize(raw: RawQueryResult, object_id: String, category_name: &str) -> Self {
        let RawQueryResult {
            allow,
            policy_id: _,
            policy_version,
            policy_severity,
            policy_title,
            success_message,
            failure_messages,
        } = raw;

        let policy_message = if allow {
            success_message
        } else {
            failure_messages.join(FAILURE_SEPARATOR)
        };

        Self {
            allow,
            category_name: category_name.to_string(),
            object_id,
            policy_version,
            policy_severity,
            policy_title,
            policy_message,
        }
    }
}

// === impl ObjectRef ===

impl ObjectRef {
    /// Formats a stable identifier for the object.
    ///
    /// Pods are identified by name alone; releases and custom resource lists
    /// are qualified by the ID of the policy that was evaluated.
    pub fn id(&self, policy_id: &str) -> String {
        match self {
            Self::HelmRelease { namespace, name } => {
                format!("helm_release/{namespace}/{name}/{policy_id}")
            }
            Self::Pod { namespace, name } => format!("pod/{namespace}/{name}"),
            Self::CustomResource(gvr) => format!("{gvr}/{policy_id}"),
        }
    }
}
