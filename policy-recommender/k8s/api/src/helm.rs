//! Helm release records as persisted by Helm's `secret` storage driver.
//!
//! Each revision of a release is stored in a Secret labelled `owner=helm`. The
//! Secret's `release` key holds the JSON-encoded release, gzipped and then
//! base64-encoded (on top of the base64 encoding applied to all Secret data).

use crate::{ResourceExt, Secret};
use base64::prelude::*;
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, io::Read};

/// Selects Secrets written by Helm's storage driver.
pub const OWNER_SELECTOR: &str = "owner=helm";

/// The Secret data key holding the encoded release.
pub const RELEASE_KEY: &str = "release";

const GZIP_MAGIC: [u8; 3] = [0x1f, 0x8b, 0x08];

/// A single revision of a Helm release.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Release {
    pub name: String,

    #[serde(default)]
    pub namespace: String,

    /// The release revision.
    #[serde(default)]
    pub version: i32,

    #[serde(default)]
    pub info: Info,

    #[serde(default)]
    pub chart: Chart,

    /// User-supplied values overriding the chart's defaults.
    #[serde(default)]
    pub config: serde_json::Value,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Info {
    #[serde(default)]
    pub status: Status,

    #[serde(default)]
    pub last_deployed: Option<DateTime<Utc>>,

    #[serde(default)]
    pub description: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Chart {
    #[serde(default)]
    pub metadata: ChartMetadata,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub app_version: String,
}

/// The lifecycle state of a release revision.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Deployed,
    Uninstalled,
    Superseded,
    Failed,
    Uninstalling,
    Pending,
    PendingInstall,
    PendingUpgrade,
    PendingRollback,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("secret {0} has no {RELEASE_KEY} data")]
    MissingData(String),

    #[error("invalid base64 release payload")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid gzip release payload")]
    Gzip(#[from] std::io::Error),

    #[error("invalid release json")]
    Json(#[from] serde_json::Error),
}

// === impl Release ===

impl Release {
    /// Decodes a release from a Helm storage Secret.
    pub fn from_secret(secret: &Secret) -> Result<Self, DecodeError> {
        let data = secret
            .data
            .as_ref()
            .and_then(|data| data.get(RELEASE_KEY))
            .ok_or_else(|| DecodeError::MissingData(secret.name_any()))?;
        Self::decode(&data.0)
    }

    /// Decodes a release from the payload of a storage Secret's `release` key.
    ///
    /// Payloads that are not gzipped are accepted as plain JSON.
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let bytes = BASE64_STANDARD.decode(payload)?;
        if bytes.starts_with(&GZIP_MAGIC) {
            let mut json = Vec::new();
            GzDecoder::new(bytes.as_slice()).read_to_end(&mut json)?;
            return Ok(serde_json::from_slice(&json)?);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    #[inline]
    pub fn chart_name(&self) -> &str {
        &self.chart.metadata.name
    }

    #[inline]
    pub fn chart_version(&self) -> &str {
        &self.chart.metadata.version
    }

    #[inline]
    pub fn status(&self) -> Status {
        self.info.status
    }
}

/// Collapses release revisions so that only the highest revision of each
/// release (by namespace and name) remains.
pub fn latest_revisions(releases: impl IntoIterator<Item = Release>) -> Vec<Release> {
    let mut latest = BTreeMap::<(String, String), Release>::new();
    for release in releases {
        let key = (release.namespace.clone(), release.name.clone());
        match latest.get(&key) {
            Some(current) if current.version >= release.version => {}
            _ => {
                latest.insert(key, release);
            }
        }
    }
    latest.into_values().collect()
}

/// Orders releases by their last deployment time, oldest first.
///
/// Releases that were never deployed sort first; ties are broken by name.
pub fn sort_by_date(releases: &mut [Release]) {
    releases.sort_by(|a, b| {
        a.info
            .last_deployed
            .cmp(&b.info.last_deployed)
            .then_with(|| a.name.cmp(&b.name))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ByteString, ObjectMeta};
    use flate2::{write::GzEncoder, Compression};
    use maplit::btreemap;
    use std::io::Write;

    fn mk_release(name: &str, version: i32, status: &str) -> serde_json::Value {
        serde_json::json!({
            "name": name,
            "namespace": "default",
            "version": version,
            "info": {
                "status": status,
                "last_deployed": "2023-03-01T10:20:30.123456789-05:00",
                "description": "Install complete",
            },
            "chart": {
                "metadata": {
                    "name": "cert-manager",
                    "version": "v1.11.0",
                    "appVersion": "v1.11.0",
                },
                "templates": [],
            },
            "config": {"installCRDs": true},
            "manifest": "---\n",
        })
    }

    fn encode(release: &serde_json::Value, gzip: bool) -> Vec<u8> {
        let json = serde_json::to_vec(release).unwrap();
        let bytes = if gzip {
            let mut enc = GzEncoder::new(Vec::new(), Compression::default());
            enc.write_all(&json).unwrap();
            enc.finish().unwrap()
        } else {
            json
        };
        BASE64_STANDARD.encode(bytes).into_bytes()
    }

    #[test]
    fn decodes_gzipped_release() {
        let release = Release::decode(&encode(&mk_release("cm", 3, "deployed"), true)).unwrap();
        assert_eq!(release.name, "cm");
        assert_eq!(release.namespace, "default");
        assert_eq!(release.version, 3);
        assert_eq!(release.status(), Status::Deployed);
        assert_eq!(release.chart_name(), "cert-manager");
        assert_eq!(release.chart_version(), "v1.11.0");
        assert_eq!(release.config, serde_json::json!({"installCRDs": true}));
        assert!(release.info.last_deployed.is_some());
    }

    #[test]
    fn decodes_plain_release() {
        let release =
            Release::decode(&encode(&mk_release("cm", 1, "pending-upgrade"), false)).unwrap();
        assert_eq!(release.status(), Status::PendingUpgrade);
    }

    #[test]
    fn unknown_status() {
        let release =
            Release::decode(&encode(&mk_release("cm", 1, "something-new"), false)).unwrap();
        assert_eq!(release.status(), Status::Unknown);

        let release = Release::decode(&encode(&mk_release("cm", 1, "unknown"), false)).unwrap();
        assert_eq!(release.status(), Status::Unknown);
        assert_eq!(Info::default().status, Status::Unknown);
        assert_eq!(
            serde_json::to_value(Status::PendingRollback).unwrap(),
            "pending-rollback"
        );
    }

    #[test]
    fn rejects_invalid_payloads() {
        assert!(matches!(
            Release::decode(b"not base64!"),
            Err(DecodeError::Base64(_))
        ));
        let garbage = BASE64_STANDARD.encode(b"{not json").into_bytes();
        assert!(matches!(
            Release::decode(&garbage),
            Err(DecodeError::Json(_))
        ));
    }

    #[test]
    fn from_secret() {
        let secret = Secret {
            metadata: ObjectMeta {
                name: Some("sh.helm.release.v1.cm.v2".to_string()),
                namespace: Some("default".to_string()),
                ..Default::default()
            },
            data: Some(btreemap! {
                RELEASE_KEY.to_string() => ByteString(encode(&mk_release("cm", 2, "deployed"), true)),
            }),
            ..Default::default()
        };
        assert_eq!(Release::from_secret(&secret).unwrap().version, 2);

        let empty = Secret {
            metadata: ObjectMeta {
                name: Some("sh.helm.release.v1.cm.v3".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            Release::from_secret(&empty),
            Err(DecodeError::MissingData(name)) if name == "sh.helm.release.v1.cm.v3"
        ));
    }

    #[test]
    fn keeps_latest_revisions() {
        let mk = |name: &str, namespace: &str, version: i32| Release {
            name: name.to_string(),
            namespace: namespace.to_string(),
            version,
            ..Default::default()
        };
        let releases = latest_revisions(vec![
            mk("a", "ns-0", 1),
            mk("a", "ns-0", 3),
            mk("a", "ns-0", 2),
            mk("a", "ns-1", 1),
            mk("b", "ns-0", 5),
        ]);
        let versions = releases
            .iter()
            .map(|r| (r.namespace.as_str(), r.name.as_str(), r.version))
            .collect::<Vec<_>>();
        assert_eq!(
            versions,
            vec![("ns-0", "a", 3), ("ns-0", "b", 5), ("ns-1", "a", 1)]
        );
    }

    #[test]
    fn sorts_by_last_deployed() {
        let mk = |name: &str, deployed: Option<&str>| Release {
            name: name.to_string(),
            info: Info {
                last_deployed: deployed.map(|d| d.parse().unwrap()),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut releases = vec![
            mk("late", Some("2024-01-01T00:00:00Z")),
            mk("early", Some("2022-01-01T00:00:00Z")),
            mk("never", None),
        ];
        sort_by_date(&mut releases);
        let names = releases.iter().map(|r| r.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["never", "early", "late"]);
    }
}
