use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! named_choice {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ConfigError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s))
                    .ok_or_else(|| ConfigError::UnknownValue {
                        kind: $kind,
                        value: s.to_string(),
                        expected: $name::ALL
                            .iter()
                            .map(|v| v.as_str())
                            .collect::<Vec<_>>()
                            .join(", "),
                    })
            }
        }
    };
}

/// Where results are persisted after a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    None,
    #[default]
    Sqlite,
    Csv,
    Json,
}

named_choice!(StorageBackend, "storage backend", {
    None => "none",
    Sqlite => "sqlite",
    Csv => "csv",
    Json => "json",
});

/// How results are presented at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

named_choice!(OutputFormat, "output format", {
    Table => "table",
    Json => "json",
    Csv => "csv",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotType {
    Bar,
    Scatter,
    Line,
    Radar,
}

named_choice!(PlotType, "plot type", {
    Bar => "bar",
    Scatter => "scatter",
    Line => "line",
    Radar => "radar",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("SQLite".parse::<StorageBackend>().unwrap(), StorageBackend::Sqlite);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("Radar".parse::<PlotType>().unwrap(), PlotType::Radar);
    }

    #[test]
    fn unknown_plot_type_lists_choices() {
        let err = "pie".parse::<PlotType>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown plot type: 'pie' (expected one of: bar, scatter, line, radar)"
        );
    }

    #[test]
    fn defaults() {
        assert_eq!(StorageBackend::default(), StorageBackend::Sqlite);
        assert_eq!(OutputFormat::default().to_string(), "table");
    }
}
