//! Property-based tests for prompt ordering

#[path = "../test_utils/mock_channel.rs"]
#[allow(dead_code)]
mod mock_channel;

use mock_channel::MockChannel;
use proptest::prelude::*;
use release_verify::error::Error;
use release_verify::expect::{PromptScript, Session, SessionOptions, SessionState};
use std::time::Duration;

fn options() -> SessionOptions {
    SessionOptions {
        prompt_timeout: Duration::from_millis(30),
        echo_output: false,
        max_diagnostic_bytes: 1024,
        exit_grace: Duration::from_millis(30),
    }
}

/// Distinct prompts none of which contains another
fn prompts() -> impl Strategy<Value = Vec<String>> {
    prop::collection::hash_set("[a-z]{3,8}", 1..6)
        .prop_map(|words| words.into_iter().map(|w| format!("<{}>", w)).collect())
}

fn script_for(prompts: &[String]) -> PromptScript {
    prompts
        .iter()
        .enumerate()
        .fold(PromptScript::new("generated"), |script, (i, prompt)| {
            script.expect(prompt.as_str(), format!("answer-{}", i))
        })
}

fn child_asking(prompts: &[String], exit_code: u32) -> MockChannel {
    prompts
        .iter()
        .fold(MockChannel::new(), |child, prompt| child.prompt(prompt))
        .exit(exit_code)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn test_in_order_prompts_complete(prompts in prompts()) {
        let script = script_for(&prompts);
        let mut session = Session::with_channel(child_asking(&prompts, 0), options());

        let outcome = tokio_test::block_on(session.run(&script)).unwrap();
        let expected: Vec<String> = script.responses().into_iter().map(String::from).collect();
        prop_assert_eq!(outcome.responses, expected);
        prop_assert_eq!(session.state(), SessionState::Completed);
    }

    #[test]
    fn test_reordered_prompts_never_complete(
        prompts in prompts().prop_filter("needs two prompts", |p| p.len() >= 2),
        rotation in 1usize..5,
    ) {
        let script = script_for(&prompts);
        let mut asked = prompts.clone();
        let shift = rotation % asked.len();
        prop_assume!(shift != 0);
        asked.rotate_left(shift);

        let mut session = Session::with_channel(child_asking(&asked, 0), options());
        let result = tokio_test::block_on(session.run(&script));

        let is_timeout = matches!(result, Err(Error::PromptTimeout { .. }));
        prop_assert!(is_timeout);
        prop_assert_eq!(session.state(), SessionState::Failed);
        // Everything answered before the failure was answered correctly
        let answered = session.responses().len();
        let expected: Vec<String> = script.responses()[..answered].iter().map(|s| s.to_string()).collect();
        prop_assert_eq!(session.responses().to_vec(), expected);
    }

    #[test]
    fn test_truncated_dialogue_is_unexpected_exit(
        prompts in prompts(),
        asked in 0usize..6,
        exit_code in 0u32..256,
    ) {
        let asked = asked.min(prompts.len().saturating_sub(1));
        let script = script_for(&prompts);
        let mut session = Session::with_channel(child_asking(&prompts[..asked], exit_code), options());

        let result = tokio_test::block_on(session.run(&script));
        match result {
            Err(Error::UnexpectedExit { exit_status, .. }) => {
                prop_assert_eq!(exit_status.map(|s| s.code()), Some(exit_code));
            }
            other => prop_assert!(false, "expected UnexpectedExit, got {:?}", other),
        }
        prop_assert_eq!(session.responses().len(), asked);
    }
}
