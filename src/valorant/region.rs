use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Shards served by the rank API.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    #[default]
    Ap,
    Na,
    Eu,
    Kr,
    Latam,
    Br,
}

impl Region {
    pub fn label(&self) -> &'static str {
        match self {
            Region::Ap => "Asia Pacific",
            Region::Na => "North America",
            Region::Eu => "Europe",
            Region::Kr => "Korea",
            Region::Latam => "Latin America",
            Region::Br => "Brazil",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(Region::from_str("AP").unwrap(), Region::Ap);
        assert_eq!(Region::from_str("latam").unwrap(), Region::Latam);
        assert_eq!(Region::from_str("Eu").unwrap(), Region::Eu);
        assert!(Region::from_str("mars").is_err());
    }

    #[test]
    fn displays_lowercase() {
        assert_eq!(Region::Kr.to_string(), "kr");
        assert_eq!(serde_json::to_string(&Region::Br).unwrap(), "\"br\"");
    }
}
