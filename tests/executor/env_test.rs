//! Environment layering as seen by the child process.

use serde_json::json;
use tokio_test::assert_ok;
use vibe_executor::backend::ExecutionEnv;

use super::{channel_observer, next_line, script_executor, script_executor_with};

const PRINT_ENV: &str = r#"printf '%s\n' "NO_COLOR=$NO_COLOR" "NPM_CONFIG_LOGLEVEL=$NPM_CONFIG_LOGLEVEL" "MY_VAR=$MY_VAR""#;

async fn child_env(executor: &vibe_executor::Executor, env: &ExecutionEnv) -> Vec<String> {
    let dir = tempfile::tempdir().unwrap();
    let (observer, mut rx) = channel_observer();
    let handle = executor
        .spawn_with_observers(dir.path(), "task", env, [observer])
        .await
        .unwrap();
    assert_ok!(handle.wait().await);

    let mut lines = Vec::new();
    for _ in 0..3 {
        lines.push(next_line(&mut rx).await);
    }
    lines
}

#[tokio::test]
async fn mandated_variables_override_caller() {
    let dir = tempfile::tempdir().unwrap();
    let executor = script_executor(dir.path(), PRINT_ENV);
    let env: ExecutionEnv = [("NO_COLOR", "0"), ("NPM_CONFIG_LOGLEVEL", "silly")]
        .into_iter()
        .collect();

    let lines = child_env(&executor, &env).await;
    assert_eq!(lines[0], "NO_COLOR=1");
    assert_eq!(lines[1], "NPM_CONFIG_LOGLEVEL=error");
}

#[tokio::test]
async fn caller_variables_pass_through() {
    let dir = tempfile::tempdir().unwrap();
    let executor = script_executor(dir.path(), PRINT_ENV);
    let env: ExecutionEnv = [("MY_VAR", "hello world")].into_iter().collect();

    let lines = child_env(&executor, &env).await;
    assert_eq!(lines[2], "MY_VAR=hello world");
}

#[tokio::test]
async fn configured_env_wins_over_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let executor = script_executor_with(
        dir.path(),
        PRINT_ENV,
        json!({ "env": { "NO_COLOR": "custom", "MY_VAR": "from-config" } }),
    );
    let env: ExecutionEnv = [("MY_VAR", "from-caller")].into_iter().collect();

    let lines = child_env(&executor, &env).await;
    assert_eq!(lines[0], "NO_COLOR=custom");
    assert_eq!(lines[2], "MY_VAR=from-config");
}

#[tokio::test]
async fn parent_environment_is_inherited() {
    let dir = tempfile::tempdir().unwrap();
    let executor = script_executor(dir.path(), r#"printf '%s\n' "PATH_SET=${PATH:+yes}""#);
    let (observer, mut rx) = channel_observer();
    let handle = executor
        .spawn_with_observers(dir.path(), "task", &ExecutionEnv::new(), [observer])
        .await
        .unwrap();
    assert_ok!(handle.wait().await);

    assert_eq!(next_line(&mut rx).await, "PATH_SET=yes");
}
