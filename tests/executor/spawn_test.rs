//! Spawn, wait and kill through the executor facade.

use std::sync::Arc;

use serde_json::json;
use tokio_test::assert_ok;
use vibe_executor::backend::ExecutionEnv;
use vibe_executor::process::{ExitStatus, LaunchError, ProcessState};
use vibe_executor::stream::Observer;
use vibe_executor::{Executor, ExecutorError};

use super::{
    channel_observer, next_line, script_executor, script_executor_with, Recorder, TEST_TIMEOUT,
};

#[tokio::test]
async fn gemini_scenario_two_lines_then_exit_zero() {
    let dir = tempfile::tempdir().unwrap();
    let executor = script_executor_with(
        dir.path(),
        r#"printf 'a\nb\n'"#,
        json!({ "model": "gemini-2.0-flash", "yolo": true }),
    );

    let spec = executor.command_for(dir.path(), "say hi", &ExecutionEnv::new());
    assert!(spec.arguments().contains(&"--yolo".to_string()));
    assert!(spec.arguments().contains(&"gemini-2.0-flash".to_string()));

    let recorder = Arc::new(Recorder::default());
    let handle = assert_ok!(
        executor
            .spawn_with_observers(
                dir.path(),
                "say hi",
                &ExecutionEnv::new(),
                [recorder.clone() as Arc<dyn Observer>],
            )
            .await
    );

    let status = tokio::time::timeout(TEST_TIMEOUT, handle.wait())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(status, ExitStatus::Exited { code: 0 });
    assert_eq!(recorder.texts(), ["a", "b"]);
}

#[tokio::test]
async fn wait_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let executor = script_executor(dir.path(), "exit 7");
    let handle = executor
        .spawn(dir.path(), "task", &ExecutionEnv::new())
        .await
        .unwrap();

    let (first, second) = tokio::join!(handle.wait(), handle.wait());
    let third = handle.wait().await;

    assert_eq!(first.unwrap(), ExitStatus::Exited { code: 7 });
    assert_eq!(second.unwrap(), ExitStatus::Exited { code: 7 });
    assert_eq!(third.unwrap(), ExitStatus::Exited { code: 7 });
    assert_eq!(handle.try_status(), Some(ExitStatus::Exited { code: 7 }));
    assert_eq!(handle.state(), ProcessState::Exited { code: 7 });
}

#[tokio::test]
async fn handle_reports_identity() {
    let dir = tempfile::tempdir().unwrap();
    let executor = script_executor(dir.path(), "exit 0");
    let first = executor
        .spawn(dir.path(), "task", &ExecutionEnv::new())
        .await
        .unwrap();
    let second = executor
        .spawn(dir.path(), "task", &ExecutionEnv::new())
        .await
        .unwrap();

    assert_ne!(first.id(), second.id());
    assert!(first.pid().is_some());
    assert_eq!(first.backend(), executor.backend());
    assert_ok!(first.wait().await);
    assert_ok!(second.wait().await);
}

#[tokio::test]
async fn prompt_arrives_as_one_argument() {
    let dir = tempfile::tempdir().unwrap();
    let executor = script_executor(dir.path(), r#"printf '%s\n' "$#" "$@""#);
    let (observer, mut rx) = channel_observer();

    let prompt = "fix it; rm -rf / && echo \"$HOME\"";
    let handle = executor
        .spawn_with_observers(dir.path(), prompt, &ExecutionEnv::new(), [observer])
        .await
        .unwrap();
    assert_ok!(handle.wait().await);

    assert_eq!(next_line(&mut rx).await, "2");
    assert_eq!(next_line(&mut rx).await, "--prompt");
    assert_eq!(next_line(&mut rx).await, prompt);
}

#[tokio::test]
async fn relative_cwd_is_resolved() {
    let dir = tempfile::tempdir().unwrap();
    let executor = script_executor(dir.path(), "pwd");
    let (observer, mut rx) = channel_observer();

    let handle = executor
        .spawn_with_observers(".", "task", &ExecutionEnv::new(), [observer])
        .await
        .unwrap();
    assert_ok!(handle.wait().await);

    let cwd = std::env::current_dir().unwrap().canonicalize().unwrap();
    let reported = std::path::PathBuf::from(next_line(&mut rx).await)
        .canonicalize()
        .unwrap();
    assert_eq!(reported, cwd);
}

#[cfg(unix)]
#[tokio::test]
async fn kill_terminates_running_agent() {
    let dir = tempfile::tempdir().unwrap();
    let executor = script_executor(dir.path(), "echo started\nexec sleep 30");
    let (observer, mut rx) = channel_observer();
    let handle = executor
        .spawn_with_observers(dir.path(), "task", &ExecutionEnv::new(), [observer])
        .await
        .unwrap();

    assert_eq!(next_line(&mut rx).await, "started");
    assert!(matches!(handle.state(), ProcessState::Running { .. }));

    let status = tokio::time::timeout(TEST_TIMEOUT, handle.kill())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(status, ExitStatus::Signaled { signal: Some(15) });
    // Pending and later waits agree.
    assert_eq!(handle.wait().await.unwrap(), status);
}

#[cfg(unix)]
#[tokio::test]
async fn kill_escalates_when_terminate_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let executor = script_executor(dir.path(), "trap '' TERM\necho armed\nsleep 30");
    let (observer, mut rx) = channel_observer();
    let handle = executor
        .spawn_with_observers(dir.path(), "task", &ExecutionEnv::new(), [observer])
        .await
        .unwrap();

    assert_eq!(next_line(&mut rx).await, "armed");
    let status = tokio::time::timeout(TEST_TIMEOUT, handle.kill())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(status, ExitStatus::Signaled { signal: Some(9) });
}

#[cfg(unix)]
#[tokio::test]
async fn dropping_handle_terminates_agent() {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let dir = tempfile::tempdir().unwrap();
    let executor = script_executor(dir.path(), "echo started\nexec sleep 30");
    let (observer, mut rx) = channel_observer();
    let handle = executor
        .spawn_with_observers(dir.path(), "task", &ExecutionEnv::new(), [observer])
        .await
        .unwrap();
    assert_eq!(next_line(&mut rx).await, "started");

    let pid = Pid::from_raw(i32::try_from(handle.pid().unwrap()).unwrap());
    drop(handle);

    let gone = async {
        while kill(pid, None).is_ok() {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
    };
    tokio::time::timeout(TEST_TIMEOUT, gone)
        .await
        .expect("Agent survived its handle");
}

#[cfg(unix)]
#[tokio::test]
async fn background_descendant_does_not_block_wait() {
    let dir = tempfile::tempdir().unwrap();
    let executor = script_executor(dir.path(), "sleep 5 &\necho done\nexit 0");
    let recorder = Arc::new(Recorder::default());
    let handle = executor
        .spawn_with_observers(
            dir.path(),
            "task",
            &ExecutionEnv::new(),
            [recorder.clone() as Arc<dyn Observer>],
        )
        .await
        .unwrap();

    let status = tokio::time::timeout(std::time::Duration::from_secs(3), handle.wait())
        .await
        .expect("Wait pinned by a background descendant")
        .unwrap();
    assert_eq!(status, ExitStatus::Exited { code: 0 });
    assert_eq!(recorder.texts(), ["done"]);
    assert!(handle.try_status().is_some());
}

#[tokio::test]
async fn missing_cwd_fails_before_launch() {
    let executor = Executor::from_config(r#"{"AMP": {}}"#).unwrap();
    let err = executor
        .spawn("/nonexistent/vibe-executor/cwd", "task", &ExecutionEnv::new())
        .await
        .unwrap_err();

    assert!(err.is_pre_launch());
    assert!(matches!(
        err,
        ExecutorError::Launch(LaunchError::WorkingDirectoryInvalid { .. })
    ));
}

#[tokio::test]
async fn missing_program_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let executor = Executor::from_value(&json!({
        "GEMINI": { "base_command_override": "vibe-executor-no-such-agent --flag" }
    }))
    .unwrap();

    let err = executor
        .spawn(dir.path(), "task", &ExecutionEnv::new())
        .await
        .unwrap_err();
    match err {
        ExecutorError::Launch(LaunchError::ExecutableNotFound { program }) => {
            assert_eq!(program, "vibe-executor-no-such-agent");
        }
        other => panic!("Expected ExecutableNotFound, got {other:?}"),
    }
}

#[cfg(unix)]
#[tokio::test]
async fn non_executable_program_is_permission_denied() {
    let dir = tempfile::tempdir().unwrap();
    let program = dir.path().join("not-executable");
    std::fs::write(&program, "#!/bin/sh\necho hi\n").unwrap();

    let executor = Executor::from_value(&json!({
        "AMP": { "base_command_override": program.display().to_string() }
    }))
    .unwrap();

    let err = executor
        .spawn(dir.path(), "task", &ExecutionEnv::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ExecutorError::Launch(LaunchError::PermissionDenied { .. })
    ));
}
