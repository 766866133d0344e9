//! DNS zone file model: a flat set of resource records keyed by name.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Resource record type tag.
///
/// Common types are named; anything else is carried verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordType {
    A,
    Aaaa,
    Caa,
    Cname,
    Mx,
    Ns,
    Ptr,
    Soa,
    Srv,
    Txt,
    Other(String),
}

impl RecordType {
    pub fn as_str(&self) -> &str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Caa => "CAA",
            RecordType::Cname => "CNAME",
            RecordType::Mx => "MX",
            RecordType::Ns => "NS",
            RecordType::Ptr => "PTR",
            RecordType::Soa => "SOA",
            RecordType::Srv => "SRV",
            RecordType::Txt => "TXT",
            RecordType::Other(s) => s,
        }
    }
}

impl FromStr for RecordType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_uppercase().as_str() {
            "A" => RecordType::A,
            "AAAA" => RecordType::Aaaa,
            "CAA" => RecordType::Caa,
            "CNAME" => RecordType::Cname,
            "MX" => RecordType::Mx,
            "NS" => RecordType::Ns,
            "PTR" => RecordType::Ptr,
            "SOA" => RecordType::Soa,
            "SRV" => RecordType::Srv,
            "TXT" => RecordType::Txt,
            _ => RecordType::Other(s.to_string()),
        })
    }
}

impl From<&str> for RecordType {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(t) => t,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Plain, serializable form of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlainRecord {
    pub hostname: String,
    pub record_type: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Plain form of a zone file: record name to record.
pub type PlainZoneFile = IndexMap<String, PlainRecord>;

/// Single resource record line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub hostname: String,
    pub record_type: RecordType,
    pub args: Vec<String>,
}

impl Record {
    pub fn new<I, S>(hostname: impl Into<String>, record_type: impl Into<RecordType>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hostname: hostname.into(),
            record_type: record_type.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `<hostname>.\tIN\t<type>\t<args>`
    pub fn render(&self) -> String {
        format!(
            "{}.\tIN\t{}\t{}",
            self.hostname,
            self.record_type,
            self.args.join(" ")
        )
    }

    pub fn to_plain(&self) -> PlainRecord {
        PlainRecord {
            hostname: self.hostname.clone(),
            record_type: self.record_type.to_string(),
            args: self.args.clone(),
        }
    }

    pub fn from_plain(plain: &PlainRecord) -> Self {
        Self::new(
            plain.hostname.clone(),
            plain.record_type.as_str(),
            plain.args.iter().cloned(),
        )
    }
}

/// Flat record store. Keys default to the record's hostname, so several
/// records for one hostname need explicit distinct names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneFile {
    records: IndexMap<String, Record>,
}

impl ZoneFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &IndexMap<String, Record> {
        &self.records
    }

    pub fn record(&self, name: &str) -> Option<&Record> {
        self.records.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Build a record and store it under `name`, or its hostname when `name` is `None`.
    ///
    /// Returns `None` if the key exists and `replace` is false.
    pub fn add_record<I, S>(
        &mut self,
        name: Option<&str>,
        hostname: impl Into<String>,
        record_type: impl Into<RecordType>,
        args: I,
        replace: bool,
    ) -> Option<&Record>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_record_from_instance(Record::new(hostname, record_type, args), name, replace)
    }

    pub fn add_record_from_instance(
        &mut self,
        record: Record,
        name: Option<&str>,
        replace: bool,
    ) -> Option<&Record> {
        let key = name.unwrap_or(&record.hostname).to_string();
        if !replace && self.records.contains_key(&key) {
            return None;
        }
        let (index, _) = self.records.insert_full(key, record);
        self.records.get_index(index).map(|(_, r)| r)
    }

    pub fn remove_record(&mut self, name: &str) -> Option<Record> {
        self.records.shift_remove(name)
    }

    /// One line per record, in insertion order.
    pub fn render(&self) -> String {
        self.records.values().map(Record::render).join("\n")
    }

    pub fn to_plain(&self) -> PlainZoneFile {
        self.records
            .iter()
            .map(|(name, record)| (name.clone(), record.to_plain()))
            .collect()
    }

    pub fn from_plain(plain: &PlainZoneFile) -> Self {
        let mut zonefile = Self::new();
        for (name, record) in plain {
            zonefile.add_record_from_instance(Record::from_plain(record), Some(name), true);
        }
        zonefile
    }
}

impl fmt::Display for ZoneFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_record_when_rendering_then_tab_separated_line() {
        let record = Record::new("www.example.io", "A", ["10.0.0.1"]);
        assert_eq!(record.render(), "www.example.io.\tIN\tA\t10.0.0.1");
    }

    #[test]
    fn given_record_type_text_when_parsing_then_case_insensitive() {
        assert_eq!(RecordType::from("aaaa"), RecordType::Aaaa);
        assert_eq!(RecordType::from("Mx"), RecordType::Mx);
        assert_eq!(
            RecordType::from("HINFO"),
            RecordType::Other("HINFO".to_string())
        );
        assert_eq!(RecordType::from("cname").to_string(), "CNAME");
    }

    #[test]
    fn given_no_name_when_adding_record_then_keyed_by_hostname() {
        let mut zonefile = ZoneFile::new();
        zonefile.add_record(None, "ns1", "A", ["10.0.0.53"], true);
        zonefile.add_record(Some("ns1-v6"), "ns1", "AAAA", ["fd00::53"], true);

        assert_eq!(zonefile.records().len(), 2);
        assert_eq!(zonefile.record("ns1").unwrap().record_type, RecordType::A);
        assert_eq!(zonefile.record("ns1-v6").unwrap().hostname, "ns1");
    }

    #[test]
    fn given_existing_key_when_adding_without_replace_then_unchanged() {
        let mut zonefile = ZoneFile::new();
        zonefile.add_record(None, "host", "A", ["1.1.1.1"], true);

        assert!(zonefile
            .add_record(None, "host", "A", ["2.2.2.2"], false)
            .is_none());
        assert_eq!(zonefile.record("host").unwrap().args, ["1.1.1.1"]);
    }
}
