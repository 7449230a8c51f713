//! Typed agent configuration parsed from whitespace-separated `key=value`
//! tokens.
//!
//! Later tokens override earlier ones, so callers prepend their defaults. A
//! token without `=` sets a key named after itself to itself. Keys this
//! module does not know are kept as raw strings and read back through
//! [`AgentConfig::float`], [`AgentConfig::flag`] and [`AgentConfig::get`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::agent::learner::{TraceMode, UpdateTransform};
use crate::engine::MAX_EXPONENT;
use crate::ntuple::Symmetry;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for `{key}`: {value:?}")]
    InvalidValue { key: String, value: String },
    #[error("invalid list for `{key}`: {value:?}")]
    InvalidList { key: String, value: String },
    #[error("unknown symmetry {0:?}")]
    UnknownSymmetry(String),
}

const KNOWN_KEYS: [&str; 16] = [
    "name",
    "role",
    "seed",
    "init",
    "load",
    "save",
    "alpha",
    "lambda",
    "decay",
    "learning",
    "penalty",
    "bonus",
    "trace",
    "update",
    "target",
    "target_count",
];

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AgentConfig {
    pub name: String,
    pub role: String,
    pub seed: Option<u64>,
    /// Weight table sizes to allocate before any load.
    pub init: Option<Vec<usize>>,
    pub load: Option<PathBuf>,
    pub save: Option<PathBuf>,
    pub alpha: Option<f32>,
    pub lambda: Option<f32>,
    pub decay: Option<f32>,
    pub learning: Option<bool>,
    pub penalty: Option<f32>,
    pub bonus: Option<f32>,
    pub trace: Option<TraceMode>,
    pub update: Option<Vec<UpdateTransform>>,
    /// Exponent of the tile the win rule counts.
    pub target: Option<u8>,
    pub target_count: Option<usize>,
    raw: BTreeMap<String, String>,
}

impl AgentConfig {
    /// Parse `args`, on top of `name=unknown role=unknown`.
    ///
    /// ```
    /// use td_2048::config::AgentConfig;
    /// let cfg = AgentConfig::parse("role=slider alpha=0.1 init=65536,65536 alpha=0.05").unwrap();
    /// assert_eq!(cfg.name, "unknown");
    /// assert_eq!(cfg.alpha, Some(0.05));
    /// assert_eq!(cfg.init.as_deref(), Some(&[65536, 65536][..]));
    /// ```
    pub fn parse(args: &str) -> Result<Self, ConfigError> {
        let mut raw = BTreeMap::new();
        for token in "name=unknown role=unknown".split_whitespace().chain(args.split_whitespace()) {
            let (key, value) = token.split_once('=').unwrap_or((token, token));
            raw.insert(key.to_string(), value.to_string());
        }

        let mut cfg = AgentConfig {
            name: raw.get("name").cloned().unwrap_or_default(),
            role: raw.get("role").cloned().unwrap_or_default(),
            ..AgentConfig::default()
        };
        cfg.raw = raw;
        cfg.seed = cfg.typed("seed")?;
        cfg.init = cfg.raw.get("init").map(|v| parse_sizes("init", v)).transpose()?;
        cfg.load = cfg.raw.get("load").map(PathBuf::from);
        cfg.save = cfg.raw.get("save").map(PathBuf::from);
        cfg.alpha = cfg.typed("alpha")?;
        cfg.lambda = cfg.typed("lambda")?;
        cfg.decay = cfg.typed("decay")?;
        cfg.learning = cfg.raw.get("learning").map(|v| parse_flag("learning", v)).transpose()?;
        cfg.penalty = cfg.typed("penalty")?;
        cfg.bonus = cfg.typed("bonus")?;
        cfg.trace = cfg.typed("trace")?;
        cfg.update = cfg.raw.get("update").map(|v| parse_transforms("update", v)).transpose()?;
        cfg.target = cfg.typed("target")?;
        if let Some(target) = cfg.target.filter(|&t| t > MAX_EXPONENT) {
            return Err(invalid("target", &target.to_string()));
        }
        cfg.target_count = cfg.typed("target_count")?;
        Ok(cfg)
    }

    fn typed<T: FromStr>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        self.raw.get(key).map(|v| v.parse::<T>().map_err(|_| invalid(key, v))).transpose()
    }

    /// Raw value of any key, known or not.
    pub fn get(&self, key: &str) -> Option<&str> { self.raw.get(key).map(String::as_str) }

    pub fn contains(&self, key: &str) -> bool { self.raw.contains_key(key) }

    pub fn float(&self, key: &str, default: f32) -> Result<f32, ConfigError> {
        Ok(self.typed(key)?.unwrap_or(default))
    }

    pub fn flag(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        self.raw.get(key).map_or(Ok(default), |v| parse_flag(key, v))
    }

    /// Keys outside the recognized set.
    pub fn extra(&self) -> impl Iterator<Item = (&str, &str)> {
        self.raw
            .iter()
            .filter(|(key, _)| !KNOWN_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

impl FromStr for AgentConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> { Self::parse(s) }
}

/// Back to `key=value` tokens, sorted by key.
impl fmt::Display for AgentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.raw.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue { key: key.to_string(), value: value.to_string() }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}

/// Any run of non-digits separates sizes, so `65536,65536` and
/// `(65536 65536)` read the same.
fn parse_sizes(key: &str, value: &str) -> Result<Vec<usize>, ConfigError> {
    let malformed = || ConfigError::InvalidList { key: key.to_string(), value: value.to_string() };
    let sizes = value
        .split(|c: char| !c.is_ascii_digit())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>().map_err(|_| malformed()))
        .collect::<Result<Vec<_>, _>>()?;
    if sizes.is_empty() {
        return Err(malformed());
    }
    Ok(sizes)
}

/// `all`, `default`, or a comma list of `symmetry[:scale]` (scale 1 when
/// omitted).
fn parse_transforms(key: &str, value: &str) -> Result<Vec<UpdateTransform>, ConfigError> {
    match value {
        "all" => return Ok(UpdateTransform::all()),
        "default" => return Ok(UpdateTransform::default_set()),
        _ => {}
    }
    let transforms = value
        .split(',')
        .filter(|s| !s.is_empty())
        .map(|item| -> Result<UpdateTransform, ConfigError> {
            let (name, scale) = match item.split_once(':') {
                Some((name, scale)) => (name, scale.parse::<f32>().map_err(|_| invalid(key, value))?),
                None => (item, 1.0),
            };
            let symmetry = name.parse::<Symmetry>().map_err(ConfigError::UnknownSymmetry)?;
            Ok(UpdateTransform::new(symmetry, scale))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if transforms.is_empty() {
        return Err(ConfigError::InvalidList { key: key.to_string(), value: value.to_string() });
    }
    Ok(transforms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_tokens_override() {
        let cfg = AgentConfig::parse("name=learner role=slider name=td seed=7").unwrap();
        assert_eq!(cfg.name, "td");
        assert_eq!(cfg.role, "slider");
        assert_eq!(cfg.seed, Some(7));
        assert_eq!(cfg.alpha, None);
    }

    #[test]
    fn bare_token_names_itself() {
        let cfg = AgentConfig::parse("verbose").unwrap();
        assert_eq!(cfg.get("verbose"), Some("verbose"));
        assert_eq!(cfg.extra().collect::<Vec<_>>(), vec![("verbose", "verbose")]);
    }

    #[test]
    fn typed_fields() {
        let cfg = AgentConfig::parse(
            "alpha=0.0025 lambda=0.5 decay=0.7 learning=0 penalty=0.3 bonus=10 \
             trace=accumulate target=11 target_count=1 load=w.bin save=out.bin",
        )
        .unwrap();
        assert_eq!(cfg.alpha, Some(0.0025));
        assert_eq!(cfg.lambda, Some(0.5));
        assert_eq!(cfg.decay, Some(0.7));
        assert_eq!(cfg.learning, Some(false));
        assert_eq!(cfg.penalty, Some(0.3));
        assert_eq!(cfg.bonus, Some(10.0));
        assert_eq!(cfg.trace, Some(TraceMode::Accumulating));
        assert_eq!(cfg.target, Some(11));
        assert_eq!(cfg.target_count, Some(1));
        assert_eq!(cfg.load, Some(PathBuf::from("w.bin")));
        assert_eq!(cfg.save, Some(PathBuf::from("out.bin")));
        assert_eq!(cfg.extra().count(), 0);
    }

    #[test]
    fn size_lists() {
        let cfg = AgentConfig::parse("init=(65536,65536,4096)").unwrap();
        assert_eq!(cfg.init, Some(vec![65536, 65536, 4096]));
        assert_eq!(
            AgentConfig::parse("init=none"),
            Err(ConfigError::InvalidList { key: "init".into(), value: "none".into() })
        );
    }

    #[test]
    fn update_transforms() {
        let cfg = AgentConfig::parse("update=identity:1,rotate_180:0.5,transpose").unwrap();
        assert_eq!(
            cfg.update,
            Some(vec![
                UpdateTransform::new(Symmetry::Identity, 1.0),
                UpdateTransform::new(Symmetry::Rotate180, 0.5),
                UpdateTransform::new(Symmetry::Transpose, 1.0),
            ])
        );
        assert_eq!(AgentConfig::parse("update=all").unwrap().update.map(|u| u.len()), Some(8));
        assert_eq!(AgentConfig::parse("update=spin:1"), Err(ConfigError::UnknownSymmetry("spin".into())));
        assert!(matches!(AgentConfig::parse("update=identity:x"), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn malformed_values_are_typed() {
        assert_eq!(
            AgentConfig::parse("alpha=fast"),
            Err(ConfigError::InvalidValue { key: "alpha".into(), value: "fast".into() })
        );
        assert!(matches!(AgentConfig::parse("learning=maybe"), Err(ConfigError::InvalidValue { .. })));
        assert!(matches!(AgentConfig::parse("target=16"), Err(ConfigError::InvalidValue { .. })));
        assert!(matches!(AgentConfig::parse("trace=sticky"), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn extra_accessors() {
        let cfg = AgentConfig::parse("temperature=0.5 greedy=true").unwrap();
        assert_eq!(cfg.float("temperature", 1.0), Ok(0.5));
        assert_eq!(cfg.float("missing", 1.0), Ok(1.0));
        assert_eq!(cfg.flag("greedy", false), Ok(true));
        assert_eq!(cfg.flag("missing", true), Ok(true));
        assert!(cfg.float("greedy", 0.0).is_err());
    }

    #[test]
    fn displays_sorted_tokens() {
        let cfg: AgentConfig = "role=placer seed=1".parse().unwrap();
        assert_eq!(cfg.to_string(), "name=unknown role=placer seed=1");
    }
}
