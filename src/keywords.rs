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

//! Static tables for the dialect: the keyword table, the set of keywords
//! that may never appear as identifiers, and the function allow-list.
//!
//! This module defines
//! 1) a list of constants for every keyword:
//!    `pub const KEYWORD = "KEYWORD"`
//! 2) an `ALL_KEYWORDS` array with every keyword in it, and a parallel
//!    `ALL_KEYWORDS_INDEX` array of `Keyword` values. `ALL_KEYWORDS` is
//!    sorted so lookups can use binary search.

/// Defines a string constant for a single keyword: `kw_def!(SELECT);`
/// expands to `pub const SELECT = "SELECT";`
macro_rules! kw_def {
    ($ident:ident = $string_keyword:expr) => {
        pub const $ident: &'static str = $string_keyword;
    };
    ($ident:ident) => {
        kw_def!($ident = stringify!($ident));
    };
}

/// Expands to a list of `kw_def!()` invocations for each keyword
/// and defines an ALL_KEYWORDS array of the defined constants.
macro_rules! define_keywords {
    ($(
        $ident:ident $(= $string_keyword:expr)?
    ),*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[allow(non_camel_case_types)]
        pub enum Keyword {
            NoKeyword,
            $($ident),*
        }

        pub const ALL_KEYWORDS_INDEX: &[Keyword] = &[
            $(Keyword::$ident),*
        ];

        $(kw_def!($ident $(= $string_keyword)?);)*

        pub const ALL_KEYWORDS: &[&str] = &[
            $($ident),*
        ];
    }
}

// The following keywords should be sorted to be able to match using binary search
define_keywords!(
    ALL,
    ALWAYS,
    AND,
    ANY,
    AS,
    ASC,
    BETWEEN,
    BLOB,
    BY,
    CASE,
    CAST,
    CHECK,
    COLLATE,
    CONSTRAINT,
    CREATE,
    CROSS,
    CURRENT_DATE,
    CURRENT_TIME,
    CURRENT_TIMESTAMP,
    DEFAULT,
    DELETE,
    DESC,
    DISTINCT,
    ELSE,
    END,
    ESCAPE,
    EXCEPT,
    EXISTS,
    FALSE,
    FILTER,
    FROM,
    FULL,
    GENERATED,
    GLOB,
    GRANT,
    GROUP,
    HAVING,
    IN,
    INNER,
    INSERT,
    INT,
    INTEGER,
    INTERSECT,
    INTO,
    IS,
    ISNULL,
    JOIN,
    KEY,
    LEFT,
    LIKE,
    LIMIT,
    MATCH,
    NATURAL,
    NONE,
    NOT,
    NOTNULL,
    NULL,
    NUMERIC,
    OFFSET,
    ON,
    OR,
    ORDER,
    OUTER,
    PRIMARY,
    REAL,
    REGEXP,
    RETURNING,
    REVOKE,
    RIGHT,
    SELECT,
    SET,
    STORED,
    TABLE,
    TEXT,
    THEN,
    TO,
    TRUE,
    UNION,
    UNIQUE,
    UPDATE,
    USING,
    VALUES,
    VIRTUAL,
    WHEN,
    WHERE
);

/// Looks a word up in the keyword table, case-insensitively.
///
/// Returns [`Keyword::NoKeyword`] for plain identifiers.
pub fn lookup(word: &str) -> Keyword {
    let upper = word.to_uppercase();
    match ALL_KEYWORDS.binary_search(&upper.as_str()) {
        Ok(idx) => ALL_KEYWORDS_INDEX[idx],
        Err(_) => Keyword::NoKeyword,
    }
}

/// Keywords that must not appear as identifiers anywhere in a statement.
/// Producing one attaches a semantic error to the enclosing statement.
pub const KEYWORDS_NOT_ALLOWED: &[Keyword] = &[
    Keyword::CURRENT_DATE,
    Keyword::CURRENT_TIME,
    Keyword::CURRENT_TIMESTAMP,
];

pub(crate) fn is_keyword_not_allowed(keyword: Keyword) -> bool {
    KEYWORDS_NOT_ALLOWED.contains(&keyword)
}

/// Returns the canonical (uppercase) spelling of a banned keyword.
pub(crate) fn banned_keyword_name(keyword: Keyword) -> &'static str {
    match keyword {
        Keyword::CURRENT_DATE => CURRENT_DATE,
        Keyword::CURRENT_TIME => CURRENT_TIME,
        Keyword::CURRENT_TIMESTAMP => CURRENT_TIMESTAMP,
        _ => unreachable!("not a banned keyword"),
    }
}

/// The functions callable from this dialect. SQLite core scalar functions,
/// the math group, the JSON group, the aggregates, and the two chain
/// extensions. Date/time and admin functions are deliberately absent.
///
/// Sorted to be able to match using binary search. Lookups are
/// case-sensitive against these lowercase spellings.
pub const ALLOWED_FUNCTIONS: &[&str] = &[
    "abs",
    "acos",
    "acosh",
    "asin",
    "asinh",
    "atan",
    "atan2",
    "atanh",
    "avg",
    "block_num",
    "ceil",
    "ceiling",
    "char",
    "coalesce",
    "cos",
    "cosh",
    "count",
    "degrees",
    "exp",
    "floor",
    "format",
    "glob",
    "group_concat",
    "hex",
    "ifnull",
    "iif",
    "instr",
    "json",
    "json_array",
    "json_array_length",
    "json_extract",
    "json_group_array",
    "json_group_object",
    "json_insert",
    "json_object",
    "json_patch",
    "json_quote",
    "json_remove",
    "json_replace",
    "json_set",
    "json_type",
    "json_valid",
    "length",
    "like",
    "ln",
    "log",
    "log10",
    "log2",
    "lower",
    "ltrim",
    "max",
    "min",
    "mod",
    "nullif",
    "pi",
    "pow",
    "power",
    "printf",
    "quote",
    "radians",
    "replace",
    "round",
    "rtrim",
    "sign",
    "sin",
    "sinh",
    "sqrt",
    "substr",
    "substring",
    "sum",
    "tan",
    "tanh",
    "total",
    "trim",
    "trunc",
    "txn_hash",
    "typeof",
    "unicode",
    "upper",
];

/// Whether `name`, exactly as written, is a callable function.
pub fn is_allowed_function(name: &str) -> bool {
    ALLOWED_FUNCTIONS.binary_search(&name).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_tables_are_sorted() {
        let mut sorted = ALL_KEYWORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, ALL_KEYWORDS);

        let mut sorted = ALLOWED_FUNCTIONS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, ALLOWED_FUNCTIONS);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(lookup("select"), Keyword::SELECT);
        assert_eq!(lookup("SeLeCt"), Keyword::SELECT);
        assert_eq!(lookup("current_time"), Keyword::CURRENT_TIME);
        assert_eq!(lookup("autoincrement"), Keyword::NoKeyword);
    }

    #[test]
    fn function_lookup_is_case_sensitive() {
        assert!(is_allowed_function("count"));
        assert!(is_allowed_function("txn_hash"));
        assert!(!is_allowed_function("COUNT"));
        assert!(!is_allowed_function("datetime"));
    }
}
