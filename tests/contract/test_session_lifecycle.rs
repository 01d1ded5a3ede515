//! Contract Tests for Scripted Session Lifecycle
//!
//! These tests pin down how a session replays a prompt script: prompts are
//! answered strictly in order, a prompt that never comes times out, a child
//! that leaves early is reported, and a finished script hands the child
//! back to the caller.

#[path = "../test_utils/mock_channel.rs"]
#[allow(dead_code)]
mod mock_channel;

use mock_channel::MockChannel;
use release_verify::error::Error;
use release_verify::expect::{
    PatternMatcher, PromptScript, PromptStep, Session, SessionOptions, SessionState,
};
use release_verify::models::ExitStatus;
use std::time::{Duration, Instant};

fn options(prompt_timeout: Duration) -> SessionOptions {
    SessionOptions {
        prompt_timeout,
        echo_output: false,
        max_diagnostic_bytes: 256,
        exit_grace: Duration::from_millis(100),
    }
}

fn fast() -> SessionOptions {
    options(Duration::from_millis(200))
}

fn setup_script() -> PromptScript {
    PromptScript::new("setup")
        .expect("server name", "my-seafile")
        .expect("ip or domain", "127.0.0.1")
}

#[tokio::test]
async fn test_end_to_end_setup_dialogue() {
    let child = MockChannel::new()
        .prompt("Enter server name: ")
        .prompt("Enter ip or domain: ")
        .exit(0);
    let mut session = Session::with_channel(child, fast());
    assert_eq!(session.state(), SessionState::Spawned);

    let outcome = session.run(&setup_script()).await.unwrap();
    assert_eq!(session.state(), SessionState::Completed);
    assert_eq!(outcome.script, "setup");
    assert_eq!(outcome.responses, vec!["my-seafile", "127.0.0.1"]);

    let status = session.wait().await.unwrap();
    assert_eq!(status, ExitStatus::from_code(0));

    let child = session.hand_off().unwrap();
    assert_eq!(child.sent(), vec!["my-seafile\n", "127.0.0.1\n"]);
}

#[tokio::test]
async fn test_response_log_matches_script_order() {
    let script = PromptScript::new("many")
        .expect("[ENTER]", "")
        .expect("server name", "my-seafile")
        .expect("ip or domain", "127.0.0.1")
        .expect("seafile-data", "")
        .expect("seafile fileserver", "");
    let child = MockChannel::new()
        .prompt("Press [ENTER] to continue\n")
        .prompt("[ server name ] ")
        .prompt("[ ip or domain ] ")
        .prompt("[ default \"/tmp/seafile-data\" ] ")
        .prompt("[ default \"8082\" ] seafile fileserver port ")
        .exit(0);
    let mut session = Session::with_channel(child, fast());

    let outcome = session.run(&script).await.unwrap();
    let expected: Vec<String> = script.responses().into_iter().map(String::from).collect();
    assert_eq!(outcome.responses, expected);
    assert_eq!(session.responses(), expected.as_slice());
}

#[tokio::test]
async fn test_out_of_order_prompt_times_out() {
    // Child asks for the address first and waits for it
    let child = MockChannel::new()
        .prompt("Enter ip or domain: ")
        .prompt("Enter server name: ")
        .exit(0);
    let mut session = Session::with_channel(child, fast());

    let err = session.run(&setup_script()).await.unwrap_err();
    match &err {
        Error::PromptTimeout {
            matcher,
            partial_output,
            ..
        } => {
            assert!(matcher.contains("server name"));
            assert_eq!(partial_output, "Enter ip or domain: ");
        }
        other => panic!("expected PromptTimeout, got {:?}", other),
    }
    assert_eq!(session.state(), SessionState::Failed);
    assert!(session.responses().is_empty());
    assert!(session.channel().unwrap().sent().is_empty());
}

#[tokio::test]
async fn test_consumed_prompt_is_never_matched_again() {
    // Both prompts arrive before the first answer; the later one in the
    // script was printed first and is consumed by the first match
    let child = MockChannel::new()
        .output("Enter ip or domain: Enter server name: ")
        .read_line()
        .stall();
    let mut session = Session::with_channel(child, fast());

    let err = session.run(&setup_script()).await.unwrap_err();
    assert!(matches!(err, Error::PromptTimeout { .. }));
    assert_eq!(session.responses(), ["my-seafile"]);
}

#[tokio::test]
async fn test_exit_before_script_end_is_unexpected() {
    let child = MockChannel::new()
        .prompt("Enter server name: ")
        .output("Error: invalid server name\n")
        .exit(1);
    let mut session = Session::with_channel(child, fast());

    let err = session.run(&setup_script()).await.unwrap_err();
    match &err {
        Error::UnexpectedExit {
            exit_status,
            partial_output,
            ..
        } => {
            assert_eq!(*exit_status, Some(ExitStatus::from_code(1)));
            assert!(partial_output.contains("invalid server name"));
        }
        other => panic!("expected UnexpectedExit, got {:?}", other),
    }
    assert_ne!(session.state(), SessionState::Completed);
    assert_eq!(err.partial_output(), Some(": Error: invalid server name\n"));
}

#[tokio::test]
async fn test_exit_without_any_output() {
    let mut session = Session::with_channel(MockChannel::new().exit(127), fast());
    let err = session.run(&setup_script()).await.unwrap_err();
    assert!(matches!(
        err,
        Error::UnexpectedExit {
            exit_status: Some(status),
            ..
        } if status.code() == 127
    ));
}

#[tokio::test]
async fn test_step_timeout_overrides_default() {
    let script = PromptScript::new("quick").step(
        PromptStep::new(PatternMatcher::literal("never printed"), "x")
            .with_timeout(Duration::from_millis(50)),
    );
    let child = MockChannel::new().output("working...").stall();
    let mut session = Session::with_channel(child, options(Duration::from_secs(30)));

    let started = Instant::now();
    let err = session.run(&script).await.unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(5));
    match err {
        Error::PromptTimeout { timeout, .. } => assert_eq!(timeout, Duration::from_millis(50)),
        other => panic!("expected PromptTimeout, got {:?}", other),
    }
}

#[tokio::test]
async fn test_regex_matcher_in_script() {
    let script = PromptScript::new("regex").step(PromptStep::new(
        PatternMatcher::regex(r"port \[\d+\]").unwrap(),
        "8082",
    ));
    let child = MockChannel::new().prompt("fileserver port [8082]: ").exit(0);
    let mut session = Session::with_channel(child, fast());

    let outcome = session.run(&script).await.unwrap();
    assert_eq!(outcome.responses, vec!["8082"]);
}

#[tokio::test]
async fn test_diagnostic_output_keeps_tail() {
    let noise = "x".repeat(1000);
    let child = MockChannel::new().output(&noise).output("tail end").stall();
    let mut session = Session::with_channel(child, fast());

    let err = session.run(&setup_script()).await.unwrap_err();
    let output = err.partial_output().unwrap();
    assert_eq!(output.len(), 256);
    assert!(output.ends_with("tail end"));
}

#[tokio::test]
async fn test_hand_off_keeps_child_running() {
    let child = MockChannel::new()
        .prompt("admin email: ")
        .output("Seahub is started\n")
        .stall();
    let script = PromptScript::new("start").expect("admin email", "admin@seafiletest.com");
    let mut session = Session::with_channel(child, fast());

    let outcome = session.run(&script).await.unwrap();
    assert!(outcome.child_running());

    let child = session.hand_off().unwrap();
    assert!(!child.was_terminated());
    assert_eq!(child.sent(), vec!["admin@seafiletest.com\n"]);
}

#[tokio::test]
async fn test_abort_stops_child_and_fails_session() {
    let child = MockChannel::new().prompt("Enter server name: ");
    let mut session = Session::with_channel(child, fast());

    session.abort().await.unwrap();
    assert_eq!(session.state(), SessionState::Failed);
    assert!(session.channel().is_none());
    assert!(matches!(
        session.run(&setup_script()).await,
        Err(Error::InvalidSessionState { .. })
    ));
}

#[tokio::test]
async fn test_close_after_completion_terminates() {
    let child = MockChannel::new().prompt("Enter server name: ").stall();
    let script = PromptScript::new("one").expect("server name", "a");
    let mut session = Session::with_channel(child, fast());

    session.run(&script).await.unwrap();
    session.close().await.unwrap();
    assert!(session.channel().is_none());
    assert_eq!(session.state(), SessionState::Completed);
}

#[tokio::test]
async fn test_wait_requires_completed_session() {
    let mut session = Session::with_channel(MockChannel::new().exit(0), fast());
    assert!(matches!(
        session.wait().await,
        Err(Error::InvalidSessionState { .. })
    ));
}

#[tokio::test]
async fn test_empty_script_completes_immediately() {
    let mut session = Session::with_channel(MockChannel::new().stall(), fast());

    let outcome = session.run(&PromptScript::new("empty")).await.unwrap();
    assert!(outcome.responses.is_empty());
    assert!(outcome.child_running());
    assert_eq!(session.state(), SessionState::Completed);
}

#[tokio::test]
async fn test_idle_session_needs_a_child() {
    let mut session: Session<MockChannel> = Session::new(fast());
    assert!(matches!(
        session.run(&setup_script()).await,
        Err(Error::InvalidSessionState { .. })
    ));

    session.attach(MockChannel::new()).unwrap();
    assert_eq!(session.state(), SessionState::Spawned);
    assert!(session.attach(MockChannel::new()).is_err());
}

#[tokio::test]
async fn test_hand_off_requires_completion() {
    let session = Session::with_channel(MockChannel::new(), fast());
    assert!(matches!(
        session.hand_off(),
        Err(Error::InvalidSessionState { .. })
    ));
}

#[tokio::test]
async fn test_cancelled_run_can_be_aborted() {
    let child = MockChannel::new().output("Generating keys...").stall();
    let terminated = child.termination_flag();
    let mut session = Session::with_channel(child, options(Duration::from_secs(30)));

    // Dropping the run future mid-wait, as a Ctrl-C select does
    let script = setup_script();
    let cancelled = tokio::time::timeout(Duration::from_millis(50), session.run(&script)).await;
    assert!(cancelled.is_err());
    assert_eq!(session.state(), SessionState::AwaitingPrompt { step: 0 });

    session.abort().await.unwrap();
    assert_eq!(session.state(), SessionState::Failed);
    assert!(session.channel().is_none());
    assert!(terminated.load(std::sync::atomic::Ordering::SeqCst));
}

#[tokio::test]
async fn test_unreadable_exit_status_fails_session() {
    let child = MockChannel::new()
        .prompt("Enter server name: ")
        .stall()
        .broken_exit_status();
    let script = PromptScript::new("one").expect("server name", "a");
    let mut session = Session::with_channel(child, fast());

    assert!(session.run(&script).await.is_err());
    assert_eq!(session.state(), SessionState::Failed);
    assert!(session.hand_off().is_err());
}

#[tokio::test]
async fn test_wait_success_keeps_output_after_last_prompt() {
    let child = MockChannel::new()
        .prompt("[ admin email ] ")
        .output("Starting seahub at port 8000 ...\n")
        .output("Error: Seahub failed to start.\n")
        .exit(1);
    let script = PromptScript::new("start").expect("admin email", "admin@seafiletest.com");
    let mut session = Session::with_channel(child, fast());

    session.run(&script).await.unwrap();
    let err = session.wait_success().await.unwrap_err();
    match &err {
        Error::ProgramFailed {
            exit_status,
            partial_output,
            ..
        } => {
            assert_eq!(exit_status.code(), 1);
            assert!(partial_output.contains("Error: Seahub failed to start."));
        }
        other => panic!("expected ProgramFailed, got {:?}", other),
    }
    assert!(session.output_tail().contains("port 8000"));
}

#[tokio::test]
async fn test_wait_success_on_clean_exit() {
    let child = MockChannel::new().prompt("[ admin email ] ").output("done\n").exit(0);
    let script = PromptScript::new("start").expect("admin email", "a");
    let mut session = Session::with_channel(child, fast());

    session.run(&script).await.unwrap();
    assert!(session.wait_success().await.unwrap().success());
}
