#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod helm;
pub mod labels;
mod resource;

pub use self::{labels::Labels, resource::GroupVersionResource};
pub use k8s_openapi::{
    api::core::v1::{Pod, PodSpec, PodStatus, Secret},
    ByteString,
};
pub use kube::core::{ApiResource, DynamicObject, ObjectMeta, ResourceExt};
