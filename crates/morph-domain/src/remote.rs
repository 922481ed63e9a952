use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::workspace::{WorkspacePatch, WorkspaceRecord};

/// Logical filename of the script inside a remote bundle.
pub const SCRIPT_FILE: &str = "code.js";
/// Logical filename of the document inside a remote bundle.
pub const DOCUMENT_FILE: &str = "data.json";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GistFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Request and response body of the gist API; only `files` matters here.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GistPayload {
    #[serde(default)]
    pub files: BTreeMap<String, Option<GistFile>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BundleField {
    Script,
    Document,
}

impl BundleField {
    pub fn as_str(self) -> &'static str {
        match self {
            BundleField::Script => "code",
            BundleField::Document => "json",
        }
    }
}

/// A remote script/document pair; either side may be missing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RemoteBundle {
    pub script: Option<String>,
    pub document: Option<String>,
}

impl RemoteBundle {
    pub fn from_record(record: &WorkspaceRecord) -> Self {
        Self {
            script: Some(record.code.clone()),
            document: Some(record.json.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.script.is_none() && self.document.is_none()
    }

    /// Fields the bundle carries whose value differs from `record`.
    pub fn overwrites(&self, record: &WorkspaceRecord) -> Vec<BundleField> {
        let mut fields = Vec::new();
        if self
            .script
            .as_ref()
            .is_some_and(|script| *script != record.code)
        {
            fields.push(BundleField::Script);
        }
        if self
            .document
            .as_ref()
            .is_some_and(|document| *document != record.json)
        {
            fields.push(BundleField::Document);
        }
        fields
    }

    pub fn to_patch(&self) -> WorkspacePatch {
        WorkspacePatch {
            code: self.script.clone(),
            json: self.document.clone(),
            ..WorkspacePatch::default()
        }
    }

    pub fn to_payload(&self) -> GistPayload {
        let mut files = BTreeMap::new();
        if let Some(script) = &self.script {
            files.insert(
                SCRIPT_FILE.to_string(),
                Some(GistFile {
                    content: Some(script.clone()),
                }),
            );
        }
        if let Some(document) = &self.document {
            files.insert(
                DOCUMENT_FILE.to_string(),
                Some(GistFile {
                    content: Some(document.clone()),
                }),
            );
        }
        GistPayload { files }
    }
}

impl From<GistPayload> for RemoteBundle {
    fn from(mut payload: GistPayload) -> Self {
        let mut take = |name: &str| {
            payload
                .files
                .remove(name)
                .flatten()
                .and_then(|file| file.content)
        };
        let script = take(SCRIPT_FILE);
        let document = take(DOCUMENT_FILE);
        Self { script, document }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_maps_logical_filenames() {
        let payload: GistPayload = serde_json::from_value(json!({
            "id": "abc",
            "files": {
                "code.js": { "content": "return json", "size": 11 },
                "data.json": { "content": "[1]" },
                "README.md": { "content": "ignored" }
            }
        }))
        .unwrap();
        let bundle = RemoteBundle::from(payload);
        assert_eq!(bundle.script.as_deref(), Some("return json"));
        assert_eq!(bundle.document.as_deref(), Some("[1]"));
    }

    #[test]
    fn missing_files_stay_missing() {
        let payload: GistPayload =
            serde_json::from_value(json!({ "files": { "data.json": null } })).unwrap();
        let bundle = RemoteBundle::from(payload);
        assert!(bundle.is_empty());
    }

    #[test]
    fn overwrites_lists_only_differing_fields() {
        let record = WorkspaceRecord {
            code: "return json".into(),
            json: "[]".into(),
            ..WorkspaceRecord::default()
        };
        let bundle = RemoteBundle {
            script: Some("return json".into()),
            document: Some("[1]".into()),
        };
        assert_eq!(bundle.overwrites(&record), vec![BundleField::Document]);
        assert!(RemoteBundle::default().overwrites(&record).is_empty());
    }

    #[test]
    fn outgoing_payload_has_content_entries() {
        let bundle = RemoteBundle {
            script: Some("return 1".into()),
            document: Some("{}".into()),
        };
        assert_eq!(
            serde_json::to_value(bundle.to_payload()).unwrap(),
            json!({
                "files": {
                    "code.js": { "content": "return 1" },
                    "data.json": { "content": "{}" }
                }
            })
        );
    }
}
