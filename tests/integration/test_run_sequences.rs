//! Integration tests for streaming runs of command sequences
//!
//! Each test runs real shell commands through [`ExecutorAdapter`] and checks
//! the exact event sequence a consumer sees.

#![cfg(unix)]

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use krnr::{
    AdapterOptions, Error, ExecutionConfig, Executor, ExecutorAdapter, InputMode, RunEvent,
    RunHandle, StreamingRunner,
};
use tempfile::TempDir;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

const RUN_LIMIT: Duration = Duration::from_secs(20);

fn adapter(config: ExecutionConfig, options: AdapterOptions) -> ExecutorAdapter {
    ExecutorAdapter::with_options(Arc::new(Executor::new(config)), options)
}

fn closed_input() -> AdapterOptions {
    AdapterOptions {
        input: InputMode::Closed,
        ..Default::default()
    }
}

fn start(commands: &[&str]) -> RunHandle {
    adapter(ExecutionConfig::default(), closed_input())
        .run(
            &CancellationToken::new(),
            commands.iter().map(|c| c.to_string()).collect(),
        )
        .unwrap()
}

async fn collect(mut handle: RunHandle) -> Vec<RunEvent> {
    let mut events = Vec::new();
    let drained = timeout(RUN_LIMIT, async {
        while let Some(event) = handle.next_event().await {
            events.push(event);
        }
    })
    .await;
    assert!(drained.is_ok(), "run did not finish within {:?}", RUN_LIMIT);
    events
}

fn lines(events: &[RunEvent]) -> Vec<&str> {
    events.iter().filter_map(RunEvent::as_line).collect()
}

#[tokio::test]
async fn test_successful_sequence_streams_in_order() {
    let events = collect(start(&["echo one", "echo two; echo three"])).await;
    assert_eq!(
        lines(&events),
        vec!["-> echo one", "one", "-> echo two; echo three", "two", "three"]
    );
    assert!(events.iter().all(|e| !e.is_failure()));
}

#[tokio::test]
async fn test_failure_stops_the_sequence() {
    let events = collect(start(&["echo first", "exit 3", "echo never"])).await;

    assert_eq!(events.len(), 4);
    assert_eq!(lines(&events), vec!["-> echo first", "first", "-> exit 3"]);

    match events.last() {
        Some(RunEvent::Failed(Error::Exec(inner))) => {
            assert!(matches!(**inner, Error::CommandFailed { code: Some(3), .. }));
        }
        other => panic!("expected a wrapped failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_failure_carries_exit_code_and_stderr() {
    let events = collect(start(&["echo 'disk full' >&2; exit 28"])).await;
    let err = events.last().and_then(RunEvent::error).unwrap();
    assert_eq!(err.exit_code(), Some(28));
    assert!(err.to_string().starts_with("exec: command failed with exit code 28"));
    assert!(err.to_string().contains("disk full"));
    // stderr is streamed as a line too
    assert!(lines(&events).contains(&"disk full"));
}

#[tokio::test]
async fn test_stderr_lines_are_interleaved_with_stdout() {
    let events = collect(start(&["echo out; sleep 0.1; echo err >&2"])).await;
    assert_eq!(lines(&events), vec!["-> echo out; sleep 0.1; echo err >&2", "out", "err"]);
}

#[tokio::test]
async fn test_colour_kept_and_screen_control_dropped() {
    let events = collect(start(&[r"printf '\033[32mgreen\033[0m\n\033[2Jclear\n'"])).await;
    let output: Vec<&str> = lines(&events).into_iter().skip(1).collect();
    assert_eq!(output, vec!["\x1b[32mgreen\x1b[0m", "clear"]);
}

#[tokio::test]
async fn test_output_without_trailing_newline_is_flushed() {
    let events = collect(start(&["printf 'no newline'"])).await;
    assert_eq!(lines(&events), vec!["-> printf 'no newline'", "no newline"]);
}

#[tokio::test]
async fn test_crlf_output_is_normalized() {
    let events = collect(start(&[r"printf 'a\r\nb\r\n'"])).await;
    assert_eq!(lines(&events)[1..], ["a", "b"]);
}

#[tokio::test]
async fn test_invalid_command_fails_the_run() {
    let events = collect(start(&["echo a\necho b", "echo after"])).await;

    assert_eq!(events.len(), 2);
    assert!(events[0].is_announcement());
    match &events[1] {
        RunEvent::Failed(Error::Exec(inner)) => {
            assert!(matches!(**inner, Error::InvalidCommand { .. }));
        }
        other => panic!("expected invalid command failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_smart_quoted_command_runs() {
    let events = collect(start(&["echo \u{2018}quoted\u{2019}"])).await;
    assert_eq!(lines(&events)[1..], ["quoted"]);
}

#[tokio::test]
async fn test_dry_run_announces_without_running() {
    let dir = TempDir::new().unwrap();
    let marker = dir.path().join("made");
    let command = format!("touch {}", marker.display());
    let config = ExecutionConfig {
        dry_run: true,
        verbose: true,
        shell: None,
    };

    let handle = adapter(config, closed_input())
        .run(&CancellationToken::new(), vec![command.clone()])
        .unwrap();
    let events = collect(handle).await;

    let expected_announce = format!("-> {}", command);
    let expected_dry = format!("dry-run: {}", command);
    assert_eq!(lines(&events), vec![expected_announce.as_str(), expected_dry.as_str()]);
    assert!(!marker.exists());
}

#[tokio::test]
async fn test_commands_share_working_directory() {
    let dir = TempDir::new().unwrap();
    let options = AdapterOptions {
        cwd: Some(dir.path().to_path_buf()),
        ..closed_input()
    };

    let handle = adapter(ExecutionConfig::default(), options)
        .run(
            &CancellationToken::new(),
            vec!["echo saved > note.txt".to_string(), "cat note.txt".to_string()],
        )
        .unwrap();
    let events = collect(handle).await;

    assert_eq!(lines(&events).last(), Some(&"saved"));
    assert!(dir.path().join("note.txt").exists());
}

#[tokio::test]
async fn test_piped_input_reaches_the_command() {
    let handle = adapter(ExecutionConfig::default(), AdapterOptions::default())
        .run(&CancellationToken::new(), vec!["read answer; echo got:$answer".to_string()])
        .unwrap();

    handle.send_input(b"yes\n").unwrap();
    let events = collect(handle).await;
    assert_eq!(lines(&events)[1..], ["got:yes"]);
}

#[tokio::test]
async fn test_input_goes_to_the_command_that_asked_for_it() {
    let mut handle = adapter(ExecutionConfig::default(), AdapterOptions::default())
        .run(
            &CancellationToken::new(),
            vec![
                "sleep 0.2".to_string(),
                "read answer; echo got:$answer".to_string(),
            ],
        )
        .unwrap();

    loop {
        let event = timeout(RUN_LIMIT, handle.next_event()).await.unwrap().unwrap();
        if event.command() == Some("read answer; echo got:$answer") {
            break;
        }
    }
    handle.send_input(b"yes\n").unwrap();

    let events = collect(handle).await;
    assert_eq!(lines(&events), ["got:yes"]);
}

#[tokio::test]
async fn test_output_resembling_an_announcement_stays_output() {
    let events = collect(start(&["echo '-> not a command'"])).await;
    assert_eq!(events.len(), 2);
    assert!(events[0].is_announcement());
    assert!(!events[1].is_announcement());
    assert_eq!(events[1].as_line(), Some("-> not a command"));
}

#[tokio::test]
async fn test_closing_input_gives_eof() {
    let handle = adapter(ExecutionConfig::default(), AdapterOptions::default())
        .run(&CancellationToken::new(), vec!["cat; echo end".to_string()])
        .unwrap();

    let input = handle.input().cloned().unwrap();
    input.send(b"typed\n").unwrap();
    input.close();

    let events = collect(handle).await;
    assert_eq!(lines(&events)[1..], ["typed", "end"]);
}

#[tokio::test]
async fn test_cancel_ends_run_without_failure() {
    let mut handle = start(&["sleep 30", "echo unreachable"]);

    let first = timeout(RUN_LIMIT, handle.next_event()).await.unwrap();
    assert_eq!(first.as_ref().and_then(RunEvent::as_line), Some("-> sleep 30"));

    handle.cancel();
    assert!(handle.is_cancelled());

    let rest = collect(handle).await;
    assert!(rest.iter().all(|e| !e.is_failure()), "{:?}", rest);
    assert!(!lines(&rest).contains(&"-> echo unreachable"));
}

#[tokio::test]
async fn test_parent_token_cancels_run() {
    let parent = CancellationToken::new();
    let mut handle = adapter(ExecutionConfig::default(), closed_input())
        .run(&parent, vec!["sleep 30".to_string()])
        .unwrap();

    let _announce = timeout(RUN_LIMIT, handle.next_event()).await.unwrap();
    parent.cancel();

    assert!(collect(handle).await.is_empty());
}

#[tokio::test]
async fn test_handle_is_a_stream() {
    let handle = start(&["echo a", "echo b"]);
    let events: Vec<RunEvent> = timeout(RUN_LIMIT, handle.collect()).await.unwrap();
    assert_eq!(lines(&events), vec!["-> echo a", "a", "-> echo b", "b"]);
}

#[test]
fn test_blocking_consumer() {
    let mut handle = start(&["echo sync"]);
    let mut seen = Vec::new();
    while let Some(event) = handle.blocking_next_event() {
        seen.push(event.as_line().map(str::to_string));
    }
    assert_eq!(
        seen,
        vec![Some("-> echo sync".to_string()), Some("sync".to_string())]
    );
}

#[tokio::test]
async fn test_large_output_is_delivered_completely() {
    let options = AdapterOptions {
        event_buffer: 4,
        ..closed_input()
    };
    let handle = adapter(ExecutionConfig::default(), options)
        .run(&CancellationToken::new(), vec!["seq 1 5000".to_string()])
        .unwrap();

    let events = collect(handle).await;
    // A line cut by a read boundary arrives as two events, so compare the
    // concatenated text.
    let expected: String = (1..=5000).map(|n| n.to_string()).collect();
    assert_eq!(lines(&events)[1..].concat(), expected);
}
