use serde_json::{json, Value};
use strum::AsRefStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum FaultKind {
    /// The document text is not valid JSON.
    DocumentParse,
    /// The script does not compile.
    ScriptCompile,
    /// The script raised an error while running.
    ScriptRuntime,
    /// The script returned something JSON cannot hold (a function, a thread, ...).
    Unrepresentable,
    Timeout,
    MemoryLimit,
}

impl FaultKind {
    /// Prefix used when a fault is rendered as text.
    pub fn label(self) -> &'static str {
        match self {
            FaultKind::DocumentParse => "DocumentParseError",
            FaultKind::ScriptCompile => "SyntaxError",
            FaultKind::ScriptRuntime => "Error",
            FaultKind::Unrepresentable => "TypeError",
            FaultKind::Timeout => "TimeoutError",
            FaultKind::MemoryLimit => "MemoryError",
        }
    }

    /// Document parse failures and script faults are the two legacy error causes;
    /// resource limits and unrepresentable results count as script faults.
    pub fn is_script_fault(self) -> bool {
        !matches!(self, FaultKind::DocumentParse)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvaluationFault {
    pub kind: FaultKind,
    pub message: String,
}

impl EvaluationFault {
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for EvaluationFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.label(), self.message)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderStyle {
    #[default]
    Pretty,
    Compact,
}

impl RenderStyle {
    pub fn from_simple_flag(simple: bool) -> Self {
        if simple {
            RenderStyle::Compact
        } else {
            RenderStyle::Pretty
        }
    }
}

/// Result of running a script against a document.
#[derive(Clone, Debug, PartialEq)]
pub enum EvaluationOutcome {
    /// `None` when the script returned nothing.
    Success(Option<Value>),
    Failure(EvaluationFault),
}

impl EvaluationOutcome {
    pub fn value(value: Value) -> Self {
        EvaluationOutcome::Success(Some(value))
    }

    pub fn fault(kind: FaultKind, message: impl Into<String>) -> Self {
        EvaluationOutcome::Failure(EvaluationFault::new(kind, message))
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, EvaluationOutcome::Success(_))
    }

    pub fn fault_kind(&self) -> Option<FaultKind> {
        match self {
            EvaluationOutcome::Success(_) => None,
            EvaluationOutcome::Failure(fault) => Some(fault.kind),
        }
    }

    pub fn success_value(&self) -> Option<&Value> {
        match self {
            EvaluationOutcome::Success(value) => value.as_ref(),
            EvaluationOutcome::Failure(_) => None,
        }
    }

    /// Tagged form: `{ok: true, value}` or `{ok: false, kind, message}`.
    pub fn to_json(&self) -> Value {
        match self {
            EvaluationOutcome::Success(value) => json!({
                "ok": true,
                "value": value.clone().unwrap_or(Value::Null),
                "returned": value.is_some(),
            }),
            EvaluationOutcome::Failure(fault) => json!({
                "ok": false,
                "kind": fault.kind.as_ref(),
                "message": fault.to_string(),
            }),
        }
    }

    /// Coalesced display text: values as JSON, faults as a quoted JSON string
    /// of their message, nothing at all when no value was returned.
    pub fn render(&self, style: RenderStyle) -> String {
        let display = match self {
            EvaluationOutcome::Success(None) => return String::new(),
            EvaluationOutcome::Success(Some(value)) => value.clone(),
            EvaluationOutcome::Failure(fault) => Value::String(fault.to_string()),
        };
        let rendered = match style {
            RenderStyle::Pretty => serde_json::to_string_pretty(&display),
            RenderStyle::Compact => serde_json::to_string(&display),
        };
        rendered.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_renders_indented_json() {
        let outcome = EvaluationOutcome::value(json!([1, {"a": 2}]));
        assert_eq!(
            outcome.render(RenderStyle::Pretty),
            "[\n  1,\n  {\n    \"a\": 2\n  }\n]"
        );
        assert_eq!(outcome.render(RenderStyle::Compact), "[1,{\"a\":2}]");
    }

    #[test]
    fn absent_value_renders_empty() {
        assert_eq!(
            EvaluationOutcome::Success(None).render(RenderStyle::Pretty),
            ""
        );
    }

    #[test]
    fn fault_renders_as_quoted_message() {
        let outcome = EvaluationOutcome::fault(FaultKind::DocumentParse, "expected value");
        assert_eq!(
            outcome.render(RenderStyle::Pretty),
            "\"DocumentParseError: expected value\""
        );
        assert_eq!(outcome.fault_kind(), Some(FaultKind::DocumentParse));
    }

    #[test]
    fn tagged_json_keeps_the_fault_kind() {
        let outcome = EvaluationOutcome::fault(FaultKind::ScriptCompile, "bad token");
        let payload = outcome.to_json();
        assert_eq!(payload["ok"], json!(false));
        assert_eq!(payload["kind"], json!("script_compile"));
        assert!(FaultKind::ScriptCompile.is_script_fault());
        assert!(!FaultKind::DocumentParse.is_script_fault());
    }
}
