use serde::Deserialize;

use crate::error::MatchError;
use crate::project::StatusFilter;
use crate::session::MAX_SOURCES;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// A matching job: which files to load, how to key them, what to write.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub master: MasterConfig,
    pub sources: Vec<SourceConfig>,
    #[serde(default = "default_skip_confirmed")]
    pub skip_confirmed: bool,
    /// Master key values to treat as already confirmed for this session.
    #[serde(default)]
    pub confirmed: Vec<String>,
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_skip_confirmed() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MasterConfig {
    pub file: String,
    /// Key column; the first column when omitted.
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub file: String,
    #[serde(default)]
    pub key: Option<String>,
    /// Columns copied into the output when this source supplies the match.
    #[serde(default)]
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default)]
    pub filter: Option<StatusFilter>,
    #[serde(default)]
    pub mapping: Option<String>,
    #[serde(default)]
    pub updated_master: Option<String>,
    #[serde(default)]
    pub previous_master: Option<String>,
    #[serde(default)]
    pub merged: Option<String>,
}

impl JobConfig {
    pub fn from_toml(s: &str) -> Result<Self, MatchError> {
        let config: JobConfig =
            toml::from_str(s).map_err(|e| MatchError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        let invalid = |msg: String| Err(MatchError::ConfigValidation(msg));

        if self.master.file.trim().is_empty() {
            return invalid("master.file must not be empty".into());
        }
        if self.sources.is_empty() {
            return invalid("at least one [[sources]] entry is required".into());
        }
        if self.sources.len() > MAX_SOURCES {
            return invalid(format!(
                "{} sources configured, at most {MAX_SOURCES} are supported",
                self.sources.len()
            ));
        }
        if matches!(&self.master.key, Some(k) if k.trim().is_empty()) {
            return invalid("master.key must not be empty when given".into());
        }
        for (i, src) in self.sources.iter().enumerate() {
            let n = i + 1;
            if src.file.trim().is_empty() {
                return invalid(format!("source {n}: file must not be empty"));
            }
            if matches!(&src.key, Some(k) if k.trim().is_empty()) {
                return invalid(format!("source {n}: key must not be empty when given"));
            }
            if src.fields.iter().any(|f| f.trim().is_empty()) {
                return invalid(format!("source {n}: field names must not be empty"));
            }
        }
        match (&self.output.previous_master, &self.output.merged) {
            (Some(_), None) => invalid("output.previous_master requires output.merged".into()),
            (None, Some(_)) => invalid("output.merged requires output.previous_master".into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MatchStatus;

    const FULL: &str = r#"
name = "Vendor cleanup"
confirmed = ["ACME CORP"]

[master]
file = "master.xlsx"
key = "Vendor Name"

[[sources]]
file = "erp.csv"
key = "Supplier"
fields = ["Supplier ID", "Terms"]

[[sources]]
file = "crm.xlsx"
fields = ["Owner"]

[output]
filter = "review"
mapping = "Mapping_Results.xlsx"
previous_master = "old.xlsx"
merged = "Merged_Master.xlsx"
"#;

    #[test]
    fn parses_full_job() {
        let cfg = JobConfig::from_toml(FULL).unwrap();
        assert_eq!(cfg.name.as_deref(), Some("Vendor cleanup"));
        assert!(cfg.skip_confirmed);
        assert_eq!(cfg.confirmed, vec!["ACME CORP"]);
        assert_eq!(cfg.sources.len(), 2);
        assert_eq!(cfg.sources[1].key, None);
        assert_eq!(cfg.output.filter, Some(StatusFilter::Status(MatchStatus::Review)));
    }

    #[test]
    fn minimal_job_uses_defaults() {
        let cfg = JobConfig::from_toml(
            "[master]\nfile = \"m.csv\"\n[[sources]]\nfile = \"s.csv\"\nfields = [\"Id\"]\n",
        )
        .unwrap();
        assert!(cfg.skip_confirmed);
        assert!(cfg.master.key.is_none());
        assert!(cfg.output.mapping.is_none());
    }

    #[test]
    fn rejects_too_many_sources() {
        let mut toml = String::from("[master]\nfile = \"m.csv\"\n");
        for i in 0..=MAX_SOURCES {
            toml.push_str(&format!("[[sources]]\nfile = \"s{i}.csv\"\n"));
        }
        let err = JobConfig::from_toml(&toml).unwrap_err();
        assert!(matches!(err, MatchError::ConfigValidation(_)));
    }

    #[test]
    fn merge_outputs_come_in_pairs() {
        let toml = "[master]\nfile = \"m.csv\"\n[[sources]]\nfile = \"s.csv\"\n[output]\nmerged = \"out.xlsx\"\n";
        let err = JobConfig::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("previous_master"));
    }

    #[test]
    fn unknown_filter_is_a_parse_error() {
        let toml = "[master]\nfile = \"m.csv\"\n[[sources]]\nfile = \"s.csv\"\n[output]\nfilter = \"maybe\"\n";
        assert!(matches!(JobConfig::from_toml(toml), Err(MatchError::ConfigParse(_))));
    }
}
