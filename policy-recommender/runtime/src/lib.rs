#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use policy_recommender_core as core;
pub use policy_recommender_k8s_client as k8s;
pub use policy_recommender_rego as rego;

mod args;
pub mod config;
mod output;

pub use self::{args::Args, output::Output};
