use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

/// Key prefix every persisted workspace record lives under.
pub const STORAGE_PREFIX: &str = "json-";

pub const DEFAULT_WORKSPACE: &str = "default";

pub const DEFAULT_CODE: &str = "local out = array()
for i, item in ipairs(json) do
  out[i] = item
end
return out";

pub const DEFAULT_DOCUMENT: &str = "[]";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WorkspaceNameError {
    #[error("workspace name must not be empty")]
    Empty,
}

/// Non-empty identifier of a workspace.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct WorkspaceName(String);

impl WorkspaceName {
    pub fn new(name: impl Into<String>) -> Result<Self, WorkspaceNameError> {
        let name = name.into();
        if name.is_empty() {
            return Err(WorkspaceNameError::Empty);
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Storage key holding this workspace's record.
    pub fn storage_key(&self) -> String {
        format!("{STORAGE_PREFIX}{}", self.0)
    }

    /// Inverse of [`WorkspaceName::storage_key`]; `None` for keys outside the prefix.
    pub fn from_storage_key(key: &str) -> Option<Self> {
        key.strip_prefix(STORAGE_PREFIX)
            .and_then(|name| Self::new(name).ok())
    }
}

impl Default for WorkspaceName {
    fn default() -> Self {
        Self(DEFAULT_WORKSPACE.to_string())
    }
}

impl fmt::Display for WorkspaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for WorkspaceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for WorkspaceName {
    type Error = WorkspaceNameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    AsRefStr,
    Display,
    EnumIter,
    EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum Flag {
    /// Evaluate only on explicit request.
    Slow,
    /// Render results as compact single-line JSON.
    Simple,
}

impl Flag {
    pub fn all() -> impl Iterator<Item = Flag> {
        Flag::iter()
    }
}

/// Every known flag with its value; unknown names are dropped on read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Flags {
    pub slow: bool,
    pub simple: bool,
}

impl Flags {
    pub fn get(&self, flag: Flag) -> bool {
        match flag {
            Flag::Slow => self.slow,
            Flag::Simple => self.simple,
        }
    }

    pub fn set(&mut self, flag: Flag, value: bool) {
        match flag {
            Flag::Slow => self.slow = value,
            Flag::Simple => self.simple = value,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Flag, bool)> + '_ {
        Flag::all().map(|flag| (flag, self.get(flag)))
    }
}

/// The persisted shape of a workspace.
///
/// Reads accept the legacy `{code, json, slow}` layout as well as records
/// missing any field; writes always emit the full current layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawRecord")]
pub struct WorkspaceRecord {
    pub code: String,
    pub json: String,
    pub flags: Flags,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gist: Option<String>,
}

impl Default for WorkspaceRecord {
    fn default() -> Self {
        Self {
            code: DEFAULT_CODE.to_string(),
            json: DEFAULT_DOCUMENT.to_string(),
            flags: Flags::default(),
            gist: None,
        }
    }
}

#[derive(Deserialize)]
struct RawRecord {
    #[serde(default)]
    code: Value,
    #[serde(default)]
    json: Value,
    #[serde(default)]
    flags: Value,
    #[serde(default)]
    slow: Value,
    #[serde(default)]
    gist: Value,
}

/// Non-empty string content; anything else counts as missing.
fn text(value: Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text),
        _ => None,
    }
}

/// Loose truthiness for flag values written by older or foreign writers.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn flag_value(flags: &Value, key: &str) -> Option<bool> {
    flags.get(key).map(truthy)
}

impl From<RawRecord> for WorkspaceRecord {
    fn from(raw: RawRecord) -> Self {
        let legacy_slow = (!raw.slow.is_null()).then(|| truthy(&raw.slow));
        Self {
            flags: Flags {
                slow: flag_value(&raw.flags, "slow")
                    .or(legacy_slow)
                    .unwrap_or(false),
                simple: flag_value(&raw.flags, "simple").unwrap_or(false),
            },
            code: text(raw.code).unwrap_or_else(|| DEFAULT_CODE.to_string()),
            json: text(raw.json).unwrap_or_else(|| DEFAULT_DOCUMENT.to_string()),
            gist: match raw.gist {
                Value::String(id) => Some(id),
                _ => None,
            },
        }
    }
}

/// Explicit partial update of a [`WorkspaceRecord`].
///
/// Fields left unset keep the base record's value; a missing base record is
/// replaced by the defaults first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkspacePatch {
    pub code: Option<String>,
    pub json: Option<String>,
    pub flags: BTreeMap<Flag, bool>,
    pub gist: Option<Option<String>>,
}

impl WorkspacePatch {
    #[must_use]
    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    #[must_use]
    pub fn json(mut self, json: impl Into<String>) -> Self {
        self.json = Some(json.into());
        self
    }

    #[must_use]
    pub fn flag(mut self, flag: Flag, value: bool) -> Self {
        self.flags.insert(flag, value);
        self
    }

    #[must_use]
    pub fn link(mut self, remote_ref: impl Into<String>) -> Self {
        let id = remote_ref.into();
        self.gist = Some(if id.is_empty() { None } else { Some(id) });
        self
    }

    #[must_use]
    pub fn unlink(mut self) -> Self {
        self.gist = Some(None);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_none() && self.json.is_none() && self.flags.is_empty() && self.gist.is_none()
    }

    pub fn apply(self, base: Option<WorkspaceRecord>) -> WorkspaceRecord {
        let mut record = base.unwrap_or_default();
        if let Some(code) = self.code {
            record.code = code;
        }
        if let Some(json) = self.json {
            record.json = json;
        }
        for (flag, value) in self.flags {
            record.flags.set(flag, value);
        }
        if let Some(gist) = self.gist {
            record.gist = gist;
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_names_are_rejected() {
        assert_eq!(WorkspaceName::new(""), Err(WorkspaceNameError::Empty));
        assert_eq!(WorkspaceName::new("scratch").unwrap().as_str(), "scratch");
    }

    #[test]
    fn storage_keys_carry_the_prefix() {
        let name = WorkspaceName::new("orders").unwrap();
        assert_eq!(name.storage_key(), "json-orders");
        assert_eq!(WorkspaceName::from_storage_key("json-orders"), Some(name));
        assert_eq!(WorkspaceName::from_storage_key("other-orders"), None);
        assert_eq!(WorkspaceName::from_storage_key("json-"), None);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let record: WorkspaceRecord = serde_json::from_value(json!({})).unwrap();
        assert_eq!(record, WorkspaceRecord::default());
        assert!(Flag::all().all(|flag| !record.flags.get(flag)));
    }

    #[test]
    fn legacy_top_level_slow_seeds_the_flag() {
        let record: WorkspaceRecord = serde_json::from_value(json!({
            "code": "return json",
            "json": "[1]",
            "slow": true
        }))
        .unwrap();
        assert!(record.flags.slow);
        assert!(!record.flags.simple);

        let record: WorkspaceRecord = serde_json::from_value(json!({
            "slow": true,
            "flags": { "slow": false }
        }))
        .unwrap();
        assert!(!record.flags.slow, "explicit flags win over the legacy field");
    }

    #[test]
    fn empty_script_and_document_read_as_defaults() {
        let record: WorkspaceRecord = serde_json::from_value(json!({
            "code": "",
            "json": "",
            "flags": { "simple": true, "turbo": true }
        }))
        .unwrap();
        assert_eq!(record.code, DEFAULT_CODE);
        assert_eq!(record.json, DEFAULT_DOCUMENT);
        assert!(record.flags.simple);
        assert_eq!(record.gist, None);
    }

    #[test]
    fn odd_flag_values_keep_the_rest_of_the_record() {
        let record: WorkspaceRecord = serde_json::from_value(json!({
            "code": "return 7",
            "json": "[1]",
            "slow": 1
        }))
        .unwrap();
        assert_eq!(record.code, "return 7");
        assert_eq!(record.json, "[1]");
        assert!(record.flags.slow);

        let record: WorkspaceRecord = serde_json::from_value(json!({
            "code": 42,
            "flags": { "slow": "", "simple": "yes" },
            "slow": true
        }))
        .unwrap();
        assert_eq!(record.code, DEFAULT_CODE);
        assert!(!record.flags.slow, "explicit flags win over the legacy field");
        assert!(record.flags.simple);

        let record: WorkspaceRecord =
            serde_json::from_value(json!({ "slow": null, "flags": "broken" })).unwrap();
        assert_eq!(record.flags, Flags::default());
    }

    #[test]
    fn gist_round_trips_as_stored() {
        let record = WorkspaceRecord {
            gist: Some(String::new()),
            ..WorkspaceRecord::default()
        };
        let text = serde_json::to_string(&record).unwrap();
        let back: WorkspaceRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(back, record);
        assert_eq!(WorkspacePatch::default().link("").gist, Some(None));
    }

    #[test]
    fn serialized_record_uses_the_persisted_layout() {
        let record = WorkspaceRecord {
            code: "return json".into(),
            json: "[]".into(),
            flags: Flags {
                slow: true,
                simple: false,
            },
            gist: Some("abc123".into()),
        };
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "code": "return json",
                "json": "[]",
                "flags": { "slow": true, "simple": false },
                "gist": "abc123"
            })
        );
        let unlinked = WorkspaceRecord {
            gist: None,
            ..record
        };
        assert!(serde_json::to_value(&unlinked).unwrap().get("gist").is_none());
    }

    #[test]
    fn patch_only_touches_named_fields() {
        let base = WorkspaceRecord {
            code: "return 1".into(),
            json: "[2]".into(),
            flags: Flags::default(),
            gist: Some("g".into()),
        };
        let patched = WorkspacePatch::default()
            .flag(Flag::Slow, true)
            .apply(Some(base.clone()));
        assert_eq!(patched.code, base.code);
        assert_eq!(patched.json, base.json);
        assert!(patched.flags.slow);
        assert_eq!(patched.gist.as_deref(), Some("g"));

        let unlinked = WorkspacePatch::default().unlink().apply(Some(base));
        assert_eq!(unlinked.gist, None);
    }

    #[test]
    fn patch_on_missing_record_starts_from_defaults() {
        let record = WorkspacePatch::default().json("{}").apply(None);
        assert_eq!(record.code, DEFAULT_CODE);
        assert_eq!(record.json, "{}");
    }

    #[test]
    fn flag_names_parse_from_lowercase() {
        assert_eq!("slow".parse::<Flag>().unwrap(), Flag::Slow);
        assert_eq!(Flag::Simple.to_string(), "simple");
        assert!("fast".parse::<Flag>().is_err());
    }
}
