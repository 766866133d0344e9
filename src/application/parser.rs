//! Parameter parsing for mutation commands.
//!
//! A raw parameter string such as
//! `name=fallthrough args='in-addr.arpa ip6.arpa' zone=. plugin=kubernetes`
//! is split into shell-style words, each word into `key=value`, then defaults are
//! filled in and values converted to their typed form.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{instrument, trace};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::Corefile;

/// Defaults shared by every mutation command.
pub const GENERIC_DEFAULTS: [(&str, &str); 2] = [("args", ""), ("replace", "true")];

/// Conversions applied by `parse_args`.
pub const DEFAULT_CONVERSIONS: [(&str, Conversion); 3] = [
    ("args", Conversion::Split),
    ("port", Conversion::Integer),
    ("replace", Conversion::Bool),
];

fn key_pattern() -> &'static Regex {
    static KEY: OnceLock<Regex> = OnceLock::new();
    KEY.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("key pattern is valid"))
}

// ============================================================
// Values
// ============================================================

/// Parameter value, raw (`Text`) or converted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Text(String),
    Integer(i64),
    Flag(bool),
    List(Vec<String>),
}

impl ParamValue {
    fn kind(&self) -> &'static str {
        match self {
            ParamValue::Text(_) => "text",
            ParamValue::Integer(_) => "integer",
            ParamValue::Flag(_) => "boolean",
            ParamValue::List(_) => "list",
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Text(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Text(s)
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        ParamValue::Integer(n)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Flag(b)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(v: Vec<String>) -> Self {
        ParamValue::List(v)
    }
}

/// Named parameters of one command invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    values: BTreeMap<String, ParamValue>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn value(&self, key: &str) -> ApplicationResult<&ParamValue> {
        self.values
            .get(key)
            .ok_or_else(|| ApplicationError::RequiredFieldsMissing(vec![key.to_string()]))
    }

    fn mismatch(key: &str, expected: &str, found: &ParamValue) -> ApplicationError {
        ApplicationError::InvalidValue {
            key: key.to_string(),
            message: format!("expected {}, found {}", expected, found.kind()),
        }
    }

    pub fn text(&self, key: &str) -> ApplicationResult<&str> {
        match self.value(key)? {
            ParamValue::Text(s) => Ok(s),
            other => Err(Self::mismatch(key, "text", other)),
        }
    }

    pub fn list(&self, key: &str) -> ApplicationResult<&[String]> {
        match self.value(key)? {
            ParamValue::List(v) => Ok(v),
            other => Err(Self::mismatch(key, "list", other)),
        }
    }

    pub fn flag(&self, key: &str) -> ApplicationResult<bool> {
        match self.value(key)? {
            ParamValue::Flag(b) => Ok(*b),
            other => Err(Self::mismatch(key, "boolean", other)),
        }
    }

    pub fn integer(&self, key: &str) -> ApplicationResult<i64> {
        match self.value(key)? {
            ParamValue::Integer(n) => Ok(*n),
            other => Err(Self::mismatch(key, "integer", other)),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Params
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

// ============================================================
// Conversion
// ============================================================

/// Conversion from a raw text value to a typed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// Whitespace split into a list.
    Split,
    Integer,
    /// `true`/`yes` (any case) is true, anything else false.
    Bool,
}

impl Conversion {
    /// Convert a `Text` value; values that are already typed pass through.
    pub fn apply(self, key: &str, value: &ParamValue) -> ApplicationResult<ParamValue> {
        let ParamValue::Text(raw) = value else {
            return Ok(value.clone());
        };
        match self {
            Conversion::Split => Ok(ParamValue::List(
                raw.split_whitespace().map(String::from).collect(),
            )),
            Conversion::Integer => raw.trim().parse::<i64>().map(ParamValue::Integer).map_err(|e| {
                ApplicationError::InvalidValue {
                    key: key.to_string(),
                    message: format!("'{}' is not an integer: {}", raw, e),
                }
            }),
            Conversion::Bool => Ok(ParamValue::Flag(str2bool(raw))),
        }
    }
}

pub fn str2bool(s: &str) -> bool {
    matches!(s.to_lowercase().as_str(), "true" | "yes")
}

/// Apply `conversions` to every listed key that is present.
pub fn convert_params(
    params: &mut Params,
    conversions: &[(&str, Conversion)],
) -> ApplicationResult<()> {
    for (key, conversion) in conversions {
        if let Some(value) = params.values.get_mut(*key) {
            *value = conversion.apply(key, value)?;
        }
    }
    Ok(())
}

/// Fill absent keys from `defaults`, then apply `conversions`.
pub fn default_params(
    params: &mut Params,
    defaults: &[(&str, &str)],
    conversions: &[(&str, Conversion)],
) -> ApplicationResult<()> {
    for (key, raw) in defaults {
        if !params.contains(key) {
            params.insert(*key, *raw);
        }
    }
    convert_params(params, conversions)
}

// ============================================================
// Tokenizing
// ============================================================

fn malformed(message: impl Into<String>) -> ApplicationError {
    ApplicationError::MalformedInput(message.into())
}

/// Split `input` into shell-style words.
///
/// Single quotes are literal, double quotes honour `\"` and `\\`, a backslash
/// outside quotes escapes the next character, and an unquoted `#` at the start
/// of a word ends the line.
pub fn tokenize(input: &str) -> ApplicationResult<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(ch) => current.push(ch),
                        None => return Err(malformed("unterminated single quote")),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(ch @ ('"' | '\\')) => current.push(ch),
                            Some(ch) => {
                                current.push('\\');
                                current.push(ch);
                            }
                            None => return Err(malformed("unterminated double quote")),
                        },
                        Some(ch) => current.push(ch),
                        None => return Err(malformed("unterminated double quote")),
                    }
                }
            }
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some(ch) => current.push(ch),
                    None => return Err(malformed("trailing backslash")),
                }
            }
            '#' if !in_word => break,
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }
    if in_word {
        words.push(current);
    }

    Ok(words)
}

/// Parse a raw `key=value ...` string into converted parameters.
///
/// Absent `args` becomes an empty list and absent `replace` becomes true.
#[instrument(level = "debug")]
pub fn parse_args(raw: &str) -> ApplicationResult<Params> {
    let mut params = Params::new();
    for word in tokenize(raw)? {
        let (key, value) = word
            .split_once('=')
            .ok_or_else(|| malformed(format!("expected key=value, found '{}'", word)))?;
        if !key_pattern().is_match(key) {
            return Err(malformed(format!("invalid parameter name '{}'", key)));
        }
        params.insert(key, value);
    }

    default_params(&mut params, &GENERIC_DEFAULTS, &DEFAULT_CONVERSIONS)?;
    trace!(?params, "parsed");
    Ok(params)
}

// ============================================================
// Validation
// ============================================================

/// Fail with every key of `keys` that is absent from `params`.
pub fn require(params: &Params, keys: &[&str]) -> ApplicationResult<()> {
    let missing: Vec<String> = keys
        .iter()
        .filter(|key| !params.contains(key))
        .map(|key| key.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ApplicationError::RequiredFieldsMissing(missing))
    }
}

pub fn validate_zone_exists(corefile: &Corefile, zone: &str) -> ApplicationResult<()> {
    if corefile.zone(zone).is_none() {
        return Err(ApplicationError::validation(format!(
            "Could not find given zone {}",
            zone
        )));
    }
    Ok(())
}

/// Zone check first, then the plugin under that zone.
pub fn validate_plugin_exists(
    corefile: &Corefile,
    plugin: &str,
    zone: &str,
) -> ApplicationResult<()> {
    validate_zone_exists(corefile, zone)?;
    let found = corefile
        .zone(zone)
        .is_some_and(|z| z.get_plugin(plugin).is_some());
    if !found {
        return Err(ApplicationError::validation(format!(
            "Could not find given plugin {}",
            plugin
        )));
    }
    Ok(())
}
