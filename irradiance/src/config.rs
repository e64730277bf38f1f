use std::{fmt, fs, path::Path, str::FromStr};

use serde::Deserialize;

use crate::Result;

/// The non-linear transform applied to the EVE targets before training.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "Option<String>")]
pub enum EveTransform {
    None,
    Sqrt,
    Log,
    /// Not a transform this crate knows; unscaling leaves the values untouched.
    Unknown(String),
}

impl From<Option<String>> for EveTransform {
    fn from(value: Option<String>) -> Self {
        match value.as_deref() {
            None | Some("") | Some("none") => Self::None,
            Some("sqrt") => Self::Sqrt,
            Some("log") => Self::Log,
            Some(other) => Self::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for EveTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EveTransform::None => write!(f, "none"),
            EveTransform::Sqrt => write!(f, "sqrt"),
            EveTransform::Log => write!(f, "log"),
            EveTransform::Unknown(name) => write!(f, "{name}"),
        }
    }
}

/// How a model's targets were pre-processed during training.
///
/// Read from the experiment's JSON file, every other key in it is ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RunConfig {
    pub zscore: bool,
    pub eve_transform: EveTransform,
    pub eve_sigmoid: bool,
}

impl RunConfig {
    /// Parses a configuration from its JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads a configuration file.
    ///
    /// # Arguments
    /// * `path` - A JSON experiment file.
    ///
    /// # Returns
    /// The configuration or an error if the file can't be read or lacks a required key.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let cfg = Self::from_json(&fs::read_to_string(path)?)?;

        if let EveTransform::Unknown(name) = &cfg.eve_transform {
            log::warn!(
                "{}: unknown eve_transform '{name}', predictions will not be inverted for it",
                path.display()
            );
        }

        Ok(cfg)
    }
}

impl fmt::Display for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "zscore={} eve_transform={} eve_sigmoid={}",
            self.zscore, self.eve_transform, self.eve_sigmoid
        )
    }
}

/// The dataset split a run works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    Train,
    Val,
    #[default]
    Test,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Train => "train",
            Phase::Val => "val",
            Phase::Test => "test",
        }
    }

    /// The suffix used for this split's feature matrix, e.g. `XTe`.
    pub fn abbrev(self) -> &'static str {
        match self {
            Phase::Train => "Tr",
            Phase::Val => "Va",
            Phase::Test => "Te",
        }
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "train" => Ok(Phase::Train),
            "val" => Ok(Phase::Val),
            "test" => Ok(Phase::Test),
            other => Err(format!("unknown phase '{other}', expected train, val or test")),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IrradianceErr;

    #[test]
    fn parses_known_transforms_and_ignores_extra_keys() {
        let cfg = RunConfig::from_json(
            r#"{"zscore": true, "eve_transform": "sqrt", "eve_sigmoid": false, "lr": 0.001}"#,
        )
        .unwrap();

        assert_eq!(
            cfg,
            RunConfig {
                zscore: true,
                eve_transform: EveTransform::Sqrt,
                eve_sigmoid: false,
            }
        );
    }

    #[test]
    fn unknown_and_null_transforms_are_permissive() {
        let cfg = RunConfig::from_json(
            r#"{"zscore": false, "eve_transform": "cbrt", "eve_sigmoid": true}"#,
        )
        .unwrap();
        assert_eq!(cfg.eve_transform, EveTransform::Unknown("cbrt".into()));

        let cfg = RunConfig::from_json(
            r#"{"zscore": false, "eve_transform": null, "eve_sigmoid": true}"#,
        )
        .unwrap();
        assert_eq!(cfg.eve_transform, EveTransform::None);
    }

    #[test]
    fn missing_key_is_an_error() {
        let err = RunConfig::from_json(r#"{"eve_transform": "log", "eve_sigmoid": false}"#)
            .unwrap_err();
        assert!(matches!(err, IrradianceErr::Json(_)));
    }

    #[test]
    fn phase_abbreviations() {
        assert_eq!("train".parse::<Phase>().unwrap().abbrev(), "Tr");
        assert_eq!("val".parse::<Phase>().unwrap().abbrev(), "Va");
        assert_eq!(Phase::default().abbrev(), "Te");
        assert!("dev".parse::<Phase>().is_err());
    }
}
