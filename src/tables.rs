// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Target-table name validation.
//!
//! Tables served by the chain follow the `prefix_chainId[_tokenId]`
//! naming scheme. This module decomposes such names and rejects anything
//! that does not fit the scheme.

use core::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

static TARGET_TABLE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z]+[A-Za-z0-9_]*)*(_[0-9]+){1,2}$").expect("valid regex"));

static MAPPED_TABLE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z]+[A-Za-z0-9_.]*)*$").expect("valid regex"));

/// A table name that does not fit the naming scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrongFormatError {
    pub name: String,
}

impl WrongFormatError {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        WrongFormatError { name: name.into() }
    }
}

impl fmt::Display for WrongFormatError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "table name '{}' has wrong format", self.name)
    }
}

impl std::error::Error for WrongFormatError {}

/// A decomposed `prefix_chainId_tokenId` table name.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ValidatedTable {
    pub prefix: String,
    pub chain_id: i64,
    /// Absent when the name carries no token id, e.g. `healthbot_1` or
    /// the consecutive-underscore form `t_1__1`.
    pub token_id: Option<i64>,
}

/// A decomposed creation-time `prefix_chainId` table name.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ValidatedCreateTable {
    pub prefix: String,
    pub chain_id: i64,
}

/// Validates and decomposes the name of a table referenced by a query.
pub fn validate_target_table(name: &str) -> Result<ValidatedTable, WrongFormatError> {
    let (prefix, chain_id, token_id) = decompose(name)?;
    Ok(ValidatedTable {
        prefix,
        chain_id,
        token_id,
    })
}

/// Validates and decomposes a creation-time table name, which may omit
/// the token id (it is assigned after creation).
pub fn validate_create_target_table(name: &str) -> Result<ValidatedCreateTable, WrongFormatError> {
    let (prefix, chain_id, _) = decompose(name)?;
    Ok(ValidatedCreateTable { prefix, chain_id })
}

fn decompose(name: &str) -> Result<(String, i64, Option<i64>), WrongFormatError> {
    let (raw, _) = strip_enclosure(name);
    if !TARGET_TABLE_NAME.is_match(raw) {
        return Err(WrongFormatError::new(name));
    }

    let mut parts: Vec<&str> = raw.split('_').collect();
    // Two-part names carry no token id; so do names whose second-to-last
    // part is empty (consecutive underscores, e.g. `t_1__1`). Pad with an
    // empty placeholder so the last two slots are always token and chain.
    if parts.len() == 2 || parts[parts.len() - 2].is_empty() {
        parts.push("");
    }

    let token_part = parts[parts.len() - 1];
    let token_id = if token_part.is_empty() {
        None
    } else {
        Some(
            token_part
                .parse::<i64>()
                .map_err(|_| WrongFormatError::new(name))?,
        )
    };
    let chain_id = parts[parts.len() - 2]
        .parse::<i64>()
        .map_err(|_| WrongFormatError::new(name))?;
    let prefix = parts[..parts.len() - 2].join("_");
    Ok((prefix, chain_id, token_id))
}

/// Splits an enclosed identifier into its body and enclosure character.
pub(crate) fn strip_enclosure(name: &str) -> (&str, Option<char>) {
    let bytes = name.as_bytes();
    if bytes.len() >= 2 {
        match (bytes[0], bytes[bytes.len() - 1]) {
            (b'"', b'"') => return (&name[1..name.len() - 1], Some('"')),
            (b'`', b'`') => return (&name[1..name.len() - 1], Some('`')),
            (b'[', b']') => return (&name[1..name.len() - 1], Some('[')),
            _ => {}
        }
    }
    (name, None)
}

/// The pattern a mapped replacement name must satisfy.
pub(crate) fn is_valid_mapped_name(name: &str) -> bool {
    MAPPED_TABLE_NAME.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_decomposes() {
        assert_eq!(
            validate_target_table("healthbot_31337_5").unwrap(),
            ValidatedTable {
                prefix: "healthbot".to_string(),
                chain_id: 31337,
                token_id: Some(5),
            }
        );
    }

    #[test]
    fn missing_token_id_becomes_none() {
        assert_eq!(
            validate_target_table("healthbot_31337").unwrap(),
            ValidatedTable {
                prefix: "healthbot".to_string(),
                chain_id: 31337,
                token_id: None,
            }
        );
    }

    #[test]
    fn consecutive_underscores_shift_the_token_id() {
        assert_eq!(
            validate_target_table("t_1__1").unwrap(),
            ValidatedTable {
                prefix: "t_1_".to_string(),
                chain_id: 1,
                token_id: None,
            }
        );
    }

    #[test]
    fn enclosed_names_are_unwrapped() {
        assert_eq!(
            validate_target_table("\"foo_1337_100\"").unwrap().prefix,
            "foo"
        );
    }

    #[test]
    fn create_form_accepts_prefix_and_chain_only() {
        assert_eq!(
            validate_create_target_table("foo_1337").unwrap(),
            ValidatedCreateTable {
                prefix: "foo".to_string(),
                chain_id: 1337,
            }
        );
    }

    #[test]
    fn wrong_formats_are_rejected() {
        for name in ["t", "t_", "t_1_", "1t_1", "foo_bar_12", "foo-1_1", ""] {
            assert!(
                validate_target_table(name).is_err(),
                "expected '{name}' to be rejected"
            );
        }
    }

    #[test]
    fn mapped_name_pattern() {
        assert!(is_valid_mapped_name("registry.t_1_2"));
        assert!(is_valid_mapped_name("t_1_2"));
        assert!(!is_valid_mapped_name("1bad"));
        assert!(!is_valid_mapped_name("has space"));
    }
}
