//! Column schema model, YAML persistence, and the built-in earthquake schema.
//!
//! A [`Schema`] is an ordered list of [`ColumnMeta`] entries, each naming a
//! column and its [`ColumnType`]. Order is significant: reconciliation walks
//! the expected schema front to back. Names are unique within a schema;
//! [`Schema::validate`] enforces this for schemas loaded from YAML.
//!
//! Two schemas meet during ingestion:
//!
//! - the *extracted* schema, inferred from a batch by [`crate::infer`]
//! - the *expected* schema, either [`earthquake_schema()`] or a YAML file

use std::{collections::HashSet, fmt, fs::File, io::BufReader, path::Path, str::FromStr};

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// Primitive column types, ordered from narrowest to widest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Integer,
    Float,
    String,
}

impl Serialize for ColumnType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ColumnType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let token = String::deserialize(deserializer)?;
        ColumnType::from_str(&token).map_err(|err| de::Error::custom(err.to_string()))
    }
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Integer => "int64",
            ColumnType::Float => "float64",
            ColumnType::String => "string",
        }
    }

    pub fn variants() -> &'static [&'static str] {
        &["int64", "float64", "string"]
    }

    /// True for the single conversion applied without a mismatch warning.
    pub fn widens_to(&self, target: &ColumnType) -> bool {
        matches!((self, target), (ColumnType::Integer, ColumnType::Float))
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "int64" | "integer" | "int" => Ok(ColumnType::Integer),
            "float64" | "float" | "double" => Ok(ColumnType::Float),
            "string" | "str" => Ok(ColumnType::String),
            _ => Err(anyhow!(
                "Unknown column type '{value}'. Supported types: {}",
                ColumnType::variants().join(", ")
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: String,
    pub datatype: ColumnType,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, datatype: ColumnType) -> Self {
        Self {
            name: name.into(),
            datatype,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Schema {
    pub columns: Vec<ColumnMeta>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, ColumnType)>,
        S: Into<String>,
    {
        let mut schema = Schema::new();
        for (name, datatype) in pairs {
            schema.set(name, datatype);
        }
        schema
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<ColumnType> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.datatype)
    }

    /// Replaces the type of an existing column in place, or appends a new one.
    pub fn set(&mut self, name: impl Into<String>, datatype: ColumnType) {
        let name = name.into();
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(column) => column.datatype = datatype,
            None => self.columns.push(ColumnMeta::new(name, datatype)),
        }
    }

    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ColumnType)> {
        self.columns.iter().map(|c| (c.name.as_str(), c.datatype))
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for (idx, column) in self.columns.iter().enumerate() {
            if column.name.trim().is_empty() {
                bail!("Column at position {} has an empty name", idx + 1);
            }
            if !seen.insert(column.name.as_str()) {
                bail!("Duplicate column name '{}' in schema", column.name);
            }
        }
        Ok(())
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let schema: Schema = serde_yaml::from_str(text).context("Parsing schema YAML")?;
        schema.validate()?;
        Ok(schema)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Serializing schema to YAML string")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening schema file {path:?}"))?;
        let reader = BufReader::new(file);
        let schema: Schema = serde_yaml::from_reader(reader).context("Parsing schema YAML")?;
        schema
            .validate()
            .with_context(|| format!("Validating schema file {path:?}"))?;
        Ok(schema)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Creating schema file {path:?}"))?;
        serde_yaml::to_writer(file, self).context("Writing schema YAML")
    }
}

/// Column layout of the seismic event feed, in feed order.
pub const EARTHQUAKE_COLUMNS: &[(&str, ColumnType)] = &[
    ("time", ColumnType::String),
    ("latitude", ColumnType::Float),
    ("longitude", ColumnType::Float),
    ("depth", ColumnType::Float),
    ("mag", ColumnType::Float),
    ("magType", ColumnType::String),
    ("nst", ColumnType::Float),
    ("gap", ColumnType::Integer),
    ("dmin", ColumnType::Float),
    ("rms", ColumnType::Float),
    ("net", ColumnType::String),
    ("id", ColumnType::String),
    ("updated", ColumnType::String),
    ("place", ColumnType::String),
    ("type", ColumnType::String),
    ("horizontalError", ColumnType::Float),
    ("depthError", ColumnType::Float),
    ("magError", ColumnType::Float),
    ("magNst", ColumnType::Integer),
    ("status", ColumnType::String),
    ("locationSource", ColumnType::String),
    ("magSource", ColumnType::String),
];

pub fn earthquake_schema() -> Schema {
    Schema::from_pairs(EARTHQUAKE_COLUMNS.iter().copied())
}
