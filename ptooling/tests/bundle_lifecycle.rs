use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ptooling::builtins::{builtin_factories, builtin_source};
use ptooling::{
    ManifestDirectorySource, RegisterOutcome, ToolError, ToolExecutionContext, ToolRegistry,
    ToolRuntimeHooks, parse_arguments,
};
use serde_json::json;

#[derive(Default)]
struct RecordingHooks {
    events: Mutex<Vec<String>>,
}

impl RecordingHooks {
    fn events(&self) -> Vec<String> {
        self.events.lock().expect("events lock").clone()
    }
}

impl ToolRuntimeHooks for RecordingHooks {
    fn on_execution_start(&self, tool_name: &str, _context: &ToolExecutionContext) {
        self.events
            .lock()
            .expect("events lock")
            .push(format!("start:{tool_name}"));
    }

    fn on_execution_success(
        &self,
        tool_name: &str,
        _context: &ToolExecutionContext,
        _elapsed: Duration,
    ) {
        self.events
            .lock()
            .expect("events lock")
            .push(format!("success:{tool_name}"));
    }

    fn on_execution_failure(
        &self,
        tool_name: &str,
        _context: &ToolExecutionContext,
        error: &ToolError,
        _elapsed: Duration,
    ) {
        self.events
            .lock()
            .expect("events lock")
            .push(format!("failure:{tool_name}:{:?}", error.kind));
    }
}

#[tokio::test]
async fn get_time_from_builtin_source_returns_timestamp() {
    let hooks = Arc::new(RecordingHooks::default());
    let registry = ToolRegistry::new().with_hooks(hooks.clone());
    registry
        .load(Arc::new(builtin_source()))
        .await
        .expect("builtin bundles should load");

    let context = ToolExecutionContext::new("conversation-1").with_tool_call_id("c1");
    let result = registry
        .dispatch("get_time", parse_arguments("").expect("empty args"), &context)
        .await
        .expect("get_time is registered");

    assert!(result.is_success());
    let payload = result.to_payload();
    assert_eq!(payload["success"], true);
    assert!(payload["data"]["now"].as_str().is_some());
    assert_eq!(hooks.events(), vec!["start:get_time", "success:get_time"]);
}

#[tokio::test]
async fn manifest_directory_drives_loading_and_reload() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(
        dir.path().join("clock.json"),
        json!({"name": "clock"}).to_string(),
    )
    .expect("write clock manifest");
    fs::write(
        dir.path().join("system.json"),
        json!({"name": "system", "enabled": false}).to_string(),
    )
    .expect("write system manifest");
    fs::write(
        dir.path().join("shell.json"),
        json!({"name": "shell"}).to_string(),
    )
    .expect("write shell manifest");

    let source = ManifestDirectorySource::new(dir.path()).with_factories(builtin_factories());
    let registry = ToolRegistry::new();
    let report = registry
        .load(Arc::new(source))
        .await
        .expect("manifest directory should load");

    assert_eq!(report.loaded, vec!["clock".to_string()]);
    assert_eq!(report.disabled, vec!["system".to_string()]);
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].name, "shell");
    assert!(!registry.contains("system_info").expect("lock"));

    fs::write(
        dir.path().join("system.json"),
        json!({"name": "system"}).to_string(),
    )
    .expect("enable system manifest");

    let outcome = registry.reload("system").await.expect("reload system");
    assert_eq!(outcome, RegisterOutcome::Registered { tools: 1 });
    assert!(registry.contains("system_info").expect("lock"));
    assert!(registry.contains("get_time").expect("lock"));

    fs::remove_file(dir.path().join("clock.json")).expect("remove clock manifest");
    let error = registry
        .reload("clock")
        .await
        .expect_err("clock is gone from the source");
    assert_eq!(error.kind, ptooling::ToolErrorKind::NotFound);
    assert!(!registry.contains("get_time").expect("lock"));
}

#[tokio::test]
async fn missing_tool_reports_name_and_skips_hooks() {
    let hooks = Arc::new(RecordingHooks::default());
    let registry = ToolRegistry::new().with_hooks(hooks.clone());

    let error = registry
        .dispatch("missing_tool", json!({}), &ToolExecutionContext::new("c"))
        .await
        .expect_err("missing tool should fail");

    assert!(error.to_string().contains("missing_tool"));
    assert!(hooks.events().is_empty());
}
