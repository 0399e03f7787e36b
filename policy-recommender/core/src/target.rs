use crate::Error;
use policy_recommender_k8s_api::{GroupVersionResource, Labels};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The kind of object a policy's queries are evaluated against.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    HelmRelease,
    Pod,
    CrdList,
}

/// Describes which live objects a policy targets.
///
/// The fields that apply depend on the policy's [`Kind`]:
///
/// - `helm_release`: exactly one of `name` or `chart_name`, and `namespace`;
/// - `pod`: `labels` and `namespace`;
/// - `crd_list`: `group`, `version`, `resource`, and `namespace`.
///
/// An empty namespace selects objects in all namespaces.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct MatchParameters {
    pub name: String,
    pub namespace: String,
    pub chart_name: String,
    pub labels: Labels,
    pub group: String,
    pub version: String,
    pub resource: String,
}

/// How a release-targeting policy selects releases.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReleaseSelector<'m> {
    Name(&'m str),
    ChartName(&'m str),
}

// === impl Kind ===

impl Kind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::HelmRelease => "helm_release",
            Self::Pod => "pod",
            Self::CrdList => "crd_list",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "helm_release" => Ok(Self::HelmRelease),
            "pod" => Ok(Self::Pod),
            "crd_list" => Ok(Self::CrdList),
            s => Err(Error::UnsupportedKind(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for Kind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// === impl MatchParameters ===

impl MatchParameters {
    /// Returns the release selector, failing unless exactly one of `name` or
    /// `chart_name` is set.
    pub fn release_selector(&self) -> Result<ReleaseSelector<'_>, Error> {
        match (self.name.as_str(), self.chart_name.as_str()) {
            ("", "") => Err(Error::InvalidMatch(
                "one of name or chart_name must be set",
            )),
            (name, "") => Ok(ReleaseSelector::Name(name)),
            ("", chart_name) => Ok(ReleaseSelector::ChartName(chart_name)),
            _ => Err(Error::InvalidMatch(
                "name and chart_name are mutually exclusive",
            )),
        }
    }

    /// Returns the custom resource type to list, failing if any part is unset.
    pub fn group_version_resource(&self) -> Result<GroupVersionResource, Error> {
        // The core API group is legitimately empty.
        if self.version.is_empty() || self.resource.is_empty() {
            return Err(Error::InvalidMatch("version and resource must be set"));
        }
        Ok(GroupVersionResource::new(
            self.group.clone(),
            self.version.clone(),
            self.resource.clone(),
        ))
    }

    /// Checks that the parameters are complete for `kind`.
    pub fn validate(&self, kind: Kind) -> Result<(), Error> {
        match kind {
            Kind::HelmRelease => self.release_selector().map(|_| ()),
            Kind::Pod => Ok(()),
            Kind::CrdList => self.group_version_resource().map(|_| ()),
        }
    }
}
