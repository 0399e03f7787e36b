#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod catalog;
mod error;
pub mod query;
pub mod recommendation;
pub mod resolve;
mod runner;
mod target;

pub use self::{
    catalog::{Catalog, QueryCollection},
    error::Error,
    query::{Query, RawQueryResult, ResultSet},
    recommendation::{ObjectRef, Recommendation},
    resolve::{Candidate, ClusterObjects, Releases, Resolvers},
    runner::Runner,
    target::{Kind, MatchParameters, ReleaseSelector},
};
pub use policy_recommender_k8s_api as k8s;
