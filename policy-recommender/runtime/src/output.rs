use crate::core::Recommendation;
use anyhow::{bail, Result};
use std::{collections::BTreeMap, io::Write, str::FromStr};

/// Recommendations keyed by policy name.
pub type Report = BTreeMap<String, Vec<Recommendation>>;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Output {
    #[default]
    Json,
    Yaml,
}

// === impl Output ===

impl Output {
    pub fn write<W: Write>(self, mut out: W, report: &Report) -> Result<()> {
        match self {
            Self::Json => {
                serde_json::to_writer_pretty(&mut out, report)?;
                writeln!(out)?;
            }
            Self::Yaml => serde_yaml::to_writer(&mut out, report)?,
        }
        Ok(())
    }
}

impl FromStr for Output {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(Self::Json),
            "yaml" => Ok(Self::Yaml),
            s => bail!("invalid output format: {s}"),
        }
    }
}
