//! Script evaluation: a sandboxed Luau state per run, bounded in time and heap.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use mlua::{Function, Lua, LuaSerdeExt, VmState};
use morph_domain::{EvaluationFault, EvaluationOutcome, FaultKind};
use serde_json::Value;
use tracing::{debug, warn};

const CHUNK_NAME: &str = "=transform";
const TRACEBACK_MARKER: &str = "\nstack traceback:";
const ARRAY_HELPER: &str = "local mt = ...
return function(...) return setmetatable({...}, mt) end";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineLimits {
    pub timeout: Duration,
    pub memory_bytes: usize,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(2_000),
            memory_bytes: 64 * 1024 * 1024,
        }
    }
}

/// Runs transform scripts against JSON documents.
///
/// The engine itself is stateless; every [`EvaluationEngine::compile`] builds
/// a fresh VM so nothing leaks between runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvaluationEngine {
    limits: EngineLimits,
}

impl EvaluationEngine {
    #[must_use]
    pub fn new(limits: EngineLimits) -> Self {
        Self { limits }
    }

    /// Builds a one-parameter callable from `script`, with the parsed
    /// document bound to `json`. Compile failures surface when called.
    #[must_use]
    pub fn compile(&self, script: &str) -> Transform {
        Transform::build(self.limits, script)
    }

    /// Parses `document`, then compiles and calls `script` on it.
    /// Every failure comes back as a failed outcome.
    #[must_use]
    pub fn run(&self, script: &str, document: &str) -> EvaluationOutcome {
        let started = Instant::now();
        let parsed = match serde_json::from_str::<Value>(document) {
            Ok(parsed) => parsed,
            Err(err) => {
                debug!(error = %err, "document is not valid JSON");
                return EvaluationOutcome::fault(FaultKind::DocumentParse, err.to_string());
            }
        };
        let outcome = self.compile(script).call(&parsed);
        debug!(
            ok = outcome.is_ok(),
            kind = outcome.fault_kind().map(FaultKind::label),
            elapsed_ms = started.elapsed().as_millis(),
            "transform evaluated"
        );
        outcome
    }

    /// [`EvaluationEngine::run`] on the blocking pool, for callers that must
    /// not stall their event loop.
    pub async fn run_detached(self, script: String, document: String) -> EvaluationOutcome {
        match tokio::task::spawn_blocking(move || self.run(&script, &document)).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(error = %err, "evaluation task did not complete");
                EvaluationOutcome::fault(
                    FaultKind::ScriptRuntime,
                    format!("evaluation aborted: {err}"),
                )
            }
        }
    }
}

/// A compiled script bound to its own VM.
pub struct Transform {
    lua: Lua,
    function: Result<Function, EvaluationFault>,
    deadline: Arc<Mutex<Option<Instant>>>,
    timed_out: Arc<AtomicBool>,
    limits: EngineLimits,
}

impl Transform {
    fn build(limits: EngineLimits, script: &str) -> Self {
        let lua = Lua::new();
        let deadline = Arc::new(Mutex::new(None));
        let timed_out = Arc::new(AtomicBool::new(false));
        let mut transform = Self {
            lua,
            function: Err(EvaluationFault::new(FaultKind::ScriptCompile, "not compiled")),
            deadline,
            timed_out,
            limits,
        };
        transform.function = transform.prepare(script);
        transform
    }

    fn prepare(&self, script: &str) -> Result<Function, EvaluationFault> {
        self.install_guards().map_err(|err| self.classify(err))?;
        // Keep `local json` on the first line so reported line numbers match the script.
        let source = format!("local json = ...; {script}");
        self.lua
            .load(source)
            .set_name(CHUNK_NAME)
            .into_function()
            .map_err(|err| self.classify(err))
    }

    fn install_guards(&self) -> mlua::Result<()> {
        let globals = self.lua.globals();
        globals.set("null", self.lua.null())?;
        let array: Function = self
            .lua
            .load(ARRAY_HELPER)
            .set_name("=array")
            .call(self.lua.array_metatable())?;
        globals.set("array", array)?;
        self.lua.sandbox(true)?;
        self.lua.set_memory_limit(self.limits.memory_bytes)?;

        let deadline = Arc::clone(&self.deadline);
        let timed_out = Arc::clone(&self.timed_out);
        self.lua.set_interrupt(move |_| {
            let expired = deadline
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .is_some_and(|at| Instant::now() >= at);
            if expired {
                timed_out.store(true, Ordering::SeqCst);
                return Err(mlua::Error::RuntimeError(
                    "script exceeded its time limit".to_string(),
                ));
            }
            Ok(VmState::Continue)
        });
        Ok(())
    }

    /// Calls the transform with `document` as its only argument.
    pub fn call(&self, document: &Value) -> EvaluationOutcome {
        let function = match &self.function {
            Ok(function) => function,
            Err(fault) => return EvaluationOutcome::Failure(fault.clone()),
        };
        self.timed_out.store(false, Ordering::SeqCst);
        let argument = match self.lua.to_value(document) {
            Ok(argument) => argument,
            Err(err) => return EvaluationOutcome::Failure(self.classify(err)),
        };

        self.set_deadline(Some(Instant::now() + self.limits.timeout));
        let returned: mlua::Result<mlua::Value> = function.call(argument);
        self.set_deadline(None);

        match returned {
            Ok(mlua::Value::Nil) => EvaluationOutcome::Success(None),
            Ok(value) => match self.lua.from_value::<Value>(value) {
                Ok(value) => EvaluationOutcome::Success(Some(canonicalize(value))),
                Err(err) => EvaluationOutcome::Failure(self.classify(err)),
            },
            Err(err) => EvaluationOutcome::Failure(self.classify(err)),
        }
    }

    fn set_deadline(&self, at: Option<Instant>) {
        *self.deadline.lock().unwrap_or_else(PoisonError::into_inner) = at;
    }

    fn classify(&self, err: mlua::Error) -> EvaluationFault {
        if self.timed_out.load(Ordering::SeqCst) {
            return EvaluationFault::new(
                FaultKind::Timeout,
                format!(
                    "script exceeded the {} ms time limit",
                    self.limits.timeout.as_millis()
                ),
            );
        }
        classify_error(err)
    }
}

fn classify_error(err: mlua::Error) -> EvaluationFault {
    match err {
        mlua::Error::SyntaxError { message, .. } => {
            EvaluationFault::new(FaultKind::ScriptCompile, first_frame(&message))
        }
        mlua::Error::MemoryError(message) => {
            EvaluationFault::new(FaultKind::MemoryLimit, first_frame(&message))
        }
        mlua::Error::CallbackError { cause, .. } => classify_error(cause.as_ref().clone()),
        mlua::Error::SerializeError(message) | mlua::Error::DeserializeError(message) => {
            EvaluationFault::new(FaultKind::Unrepresentable, message)
        }
        mlua::Error::FromLuaConversionError { .. } | mlua::Error::ToLuaConversionError { .. } => {
            EvaluationFault::new(FaultKind::Unrepresentable, err.to_string())
        }
        mlua::Error::RuntimeError(message) if message.contains("not enough memory") => {
            EvaluationFault::new(FaultKind::MemoryLimit, first_frame(&message))
        }
        mlua::Error::RuntimeError(message) => {
            EvaluationFault::new(FaultKind::ScriptRuntime, first_frame(&message))
        }
        other => EvaluationFault::new(FaultKind::ScriptRuntime, first_frame(&other.to_string())),
    }
}

fn first_frame(message: &str) -> String {
    message
        .split(TRACEBACK_MARKER)
        .next()
        .unwrap_or(message)
        .trim_end()
        .to_string()
}

/// Luau has a single number type; integral floats go back out as integers.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Number(number) if number.is_f64() => match number.as_f64() {
            Some(float)
                if float.is_finite()
                    && float.fract() == 0.0
                    && float >= i64::MIN as f64
                    && float < i64::MAX as f64 =>
            {
                Value::from(float as i64)
            }
            _ => Value::Number(number),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, canonicalize(value)))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use morph_domain::DEFAULT_CODE;
    use serde_json::json;

    fn engine() -> EvaluationEngine {
        EvaluationEngine::default()
    }

    fn success(outcome: EvaluationOutcome) -> Option<Value> {
        match outcome {
            EvaluationOutcome::Success(value) => value,
            EvaluationOutcome::Failure(fault) => panic!("expected success, got {fault}"),
        }
    }

    fn fault(outcome: EvaluationOutcome) -> EvaluationFault {
        match outcome {
            EvaluationOutcome::Failure(fault) => fault,
            EvaluationOutcome::Success(value) => panic!("expected failure, got {value:?}"),
        }
    }

    #[test]
    fn identity_returns_the_document() {
        let value = success(engine().run("return json", "[1,2,3]"));
        assert_eq!(value, Some(json!([1, 2, 3])));
    }

    #[test]
    fn doubling_keeps_integers_integral() {
        let script = "local out = array()
for i, x in ipairs(json) do out[i] = x * 2 end
return out";
        let value = success(engine().run(script, "[1,2,3]"));
        assert_eq!(value, Some(json!([2, 4, 6])));
        assert_eq!(serde_json::to_string(&value).unwrap(), "[2,4,6]");
    }

    #[test]
    fn fractional_numbers_survive() {
        let value = success(engine().run("return json.x / 4", r#"{"x": 2}"#));
        assert_eq!(value, Some(json!(0.5)));
    }

    #[test]
    fn default_script_maps_empty_array_to_empty_array() {
        assert_eq!(success(engine().run(DEFAULT_CODE, "[]")), Some(json!([])));
        assert_eq!(
            success(engine().run(DEFAULT_CODE, r#"[{"a":1},"b"]"#)),
            Some(json!([{ "a": 1 }, "b"]))
        );
    }

    #[test]
    fn syntax_errors_are_compile_faults() {
        let fault = fault(engine().run("retur json", "[]"));
        assert_eq!(fault.kind, FaultKind::ScriptCompile);
        assert!(!fault.message.is_empty());
    }

    #[test]
    fn compile_failure_is_deferred_to_call() {
        let transform = engine().compile("retur json");
        let fault = fault(transform.call(&json!([])));
        assert_eq!(fault.kind, FaultKind::ScriptCompile);
    }

    #[test]
    fn invalid_documents_are_parse_faults() {
        let fault = fault(engine().run("return json", "not json"));
        assert_eq!(fault.kind, FaultKind::DocumentParse);
        assert!(!fault.message.is_empty());
    }

    #[test]
    fn document_is_parsed_before_the_script_compiles() {
        let fault = fault(engine().run("retur json", "not json"));
        assert_eq!(fault.kind, FaultKind::DocumentParse);
    }

    #[test]
    fn raised_errors_are_runtime_faults_without_traceback() {
        let fault = fault(engine().run("error(\"boom\")", "[]"));
        assert_eq!(fault.kind, FaultKind::ScriptRuntime);
        assert!(fault.message.contains("boom"), "{}", fault.message);
        assert!(!fault.message.contains("stack traceback"));
    }

    #[test]
    fn missing_return_is_absent_and_null_is_null() {
        assert_eq!(success(engine().run("local x = 1", "[]")), None);
        assert_eq!(success(engine().run("return null", "[]")), Some(Value::Null));
        assert_eq!(
            success(engine().run("return json", r#"{"a":null,"b":[]}"#)),
            Some(json!({ "a": null, "b": [] }))
        );
    }

    #[test]
    fn nested_results_are_built_from_tables() {
        let script = "return { name = json.name, count = #json.items, first = json.items[1] }";
        let value = success(engine().run(script, r#"{"name":"x","items":[7,8]}"#));
        assert_eq!(value, Some(json!({ "name": "x", "count": 2, "first": 7 })));
    }

    #[test]
    fn functions_are_unrepresentable() {
        let fault = fault(engine().run("return function() end", "[]"));
        assert_eq!(fault.kind, FaultKind::Unrepresentable);
    }

    #[test]
    fn runaway_loops_time_out() {
        let engine = EvaluationEngine::new(EngineLimits {
            timeout: Duration::from_millis(50),
            ..EngineLimits::default()
        });
        let fault = fault(engine.run("while true do end", "[]"));
        assert_eq!(fault.kind, FaultKind::Timeout);
        assert!(fault.message.contains("50 ms"), "{}", fault.message);
    }

    #[test]
    fn heap_is_bounded() {
        let engine = EvaluationEngine::new(EngineLimits {
            memory_bytes: 4 * 1024 * 1024,
            ..EngineLimits::default()
        });
        let fault = fault(engine.run(
            "local s = string.rep(\"x\", 64 * 1024 * 1024) return #s",
            "[]",
        ));
        assert_eq!(fault.kind, FaultKind::MemoryLimit);
    }

    #[test]
    fn builtins_are_read_only_and_runs_are_isolated() {
        let fault = fault(engine().run("string.upper = nil return 1", "[]"));
        assert_eq!(fault.kind, FaultKind::ScriptRuntime);

        let script = "counter = (counter or 0) + 1 return counter";
        assert_eq!(success(engine().run(script, "[]")), Some(json!(1)));
        assert_eq!(success(engine().run(script, "[]")), Some(json!(1)));
    }

    #[test]
    fn no_io_library_is_exposed() {
        assert_eq!(success(engine().run("return io == nil", "[]")), Some(json!(true)));
    }

    #[tokio::test]
    async fn detached_runs_match_inline_runs() {
        let outcome = engine()
            .run_detached("return #json".to_string(), "[1,2]".to_string())
            .await;
        assert_eq!(success(outcome), Some(json!(2)));
    }

    #[test]
    fn canonicalize_only_touches_integral_floats() {
        assert_eq!(canonicalize(json!(2.0)), json!(2));
        assert_eq!(canonicalize(json!(2.5)), json!(2.5));
        assert_eq!(canonicalize(json!({ "a": [1.0, "x"] })), json!({ "a": [1, "x"] }));
    }
}
