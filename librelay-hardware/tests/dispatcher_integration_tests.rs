//! Integration tests for the command dispatcher
//!
//! These run the dispatcher against the simulated board from `MockTransport`,
//! so no hardware is required.

use librelay_core::{Command, CommandCode, ErrorKind, FirmwareVersion, RelayConfig, Response};
use librelay_hardware::{
    CommandSender, Dispatcher, DispatcherState, ExchangeTiming, MockTransport, RelayBoard,
    ResponseReceiver,
};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

fn fast_timing() -> ExchangeTiming {
    ExchangeTiming {
        read_timeout: Duration::from_millis(50),
        settle_delay: Duration::ZERO,
    }
}

/// Start a dispatcher on `mock` and return both caller-side queue ends
fn start_dispatcher(
    mock: &MockTransport,
) -> (Dispatcher<MockTransport>, CommandSender, ResponseReceiver) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (resp_tx, resp_rx) = mpsc::unbounded_channel();

    let mut dispatcher = Dispatcher::new(mock.clone(), fast_timing());
    dispatcher.set_input_queue(cmd_rx).unwrap();
    dispatcher.set_output_queue(resp_tx).unwrap();
    dispatcher.start().unwrap();

    (dispatcher, cmd_tx, resp_rx)
}

async fn next_response(resp_rx: &mut ResponseReceiver) -> Response {
    timeout(Duration::from_secs(2), resp_rx.recv())
        .await
        .expect("timed out waiting for a response")
        .expect("response queue closed")
}

#[tokio::test]
async fn test_responses_follow_submission_order() {
    let mock = MockTransport::with_firmware(FirmwareVersion { major: 1, minor: 3 });
    let (mut dispatcher, cmd_tx, mut resp_rx) = start_dispatcher(&mock);

    let commands = [
        Command::set_state(CommandCode::OneOn),
        Command::query(CommandCode::Status),
        Command::query(CommandCode::Version),
        Command::set_state(CommandCode::TwoOn),
        Command::query(CommandCode::Status),
        Command::set_state(CommandCode::AllOff),
        Command::query(CommandCode::Status),
    ];
    for command in commands {
        cmd_tx.send(command).unwrap();
    }

    let mut responses = Vec::new();
    for _ in 0..commands.len() {
        responses.push(next_response(&mut resp_rx).await);
    }

    let status_bytes: Vec<u8> = responses
        .iter()
        .filter_map(|r| match r {
            Response::Status(status) => Some(status.to_byte()),
            _ => None,
        })
        .collect();

    assert_eq!(
        responses[0],
        Response::Ack {
            code: CommandCode::OneOn
        }
    );
    assert_eq!(
        responses[2],
        Response::Version(FirmwareVersion { major: 1, minor: 3 })
    );
    assert_eq!(status_bytes, vec![0b01, 0b11, 0b00]);
    assert_eq!(mock.written(), vec![101, 91, 90, 102, 91, 110, 91]);

    dispatcher.stop().await.unwrap();
}

#[tokio::test]
async fn test_every_command_gets_a_response_when_some_fail() {
    let mock = MockTransport::new();
    let (mut dispatcher, cmd_tx, mut resp_rx) = start_dispatcher(&mock);

    // Second exchange hits a write failure, third a garbage reply
    mock.reply_next_with(vec![0x01]);
    cmd_tx.send(Command::set_state(CommandCode::AllOn)).unwrap();
    let first = next_response(&mut resp_rx).await;
    assert!(!first.is_error());

    mock.fail_next_write();
    cmd_tx.send(Command::set_state(CommandCode::OneOff)).unwrap();
    cmd_tx.send(Command::query(CommandCode::Version)).unwrap();
    cmd_tx.send(Command::query(CommandCode::Status)).unwrap();
    cmd_tx.send(Command::query(CommandCode::TwoOn)).unwrap();
    cmd_tx.send(Command::set_state(CommandCode::TwoOff)).unwrap();

    let mut kinds = Vec::new();
    for _ in 0..5 {
        kinds.push(next_response(&mut resp_rx).await.error_kind());
    }

    // The scripted garbage reply was consumed by the first query
    assert_eq!(
        kinds,
        vec![
            Some(ErrorKind::Io),
            Some(ErrorKind::MalformedResponse),
            None,
            Some(ErrorKind::InvalidCommand),
            None,
        ]
    );
    assert!(dispatcher.is_running());

    dispatcher.stop().await.unwrap();
}

#[tokio::test]
async fn test_state_action_with_query_code_is_invalid() {
    let mock = MockTransport::new();
    let (mut dispatcher, cmd_tx, mut resp_rx) = start_dispatcher(&mock);

    let msg = r#"{"action": "SET_STATE", "content": "VERSION"}"#;
    cmd_tx.send(Command::from_json(msg).unwrap()).unwrap();

    let response = next_response(&mut resp_rx).await;
    assert_eq!(response.error_kind(), Some(ErrorKind::InvalidCommand));
    assert!(mock.written().is_empty());

    dispatcher.stop().await.unwrap();
}

#[tokio::test]
async fn test_timeout_is_reported_and_worker_continues() {
    let mock = MockTransport::new();
    let (mut dispatcher, cmd_tx, mut resp_rx) = start_dispatcher(&mock);

    mock.time_out_next_read();
    cmd_tx.send(Command::query(CommandCode::Status)).unwrap();
    cmd_tx.send(Command::query(CommandCode::Status)).unwrap();

    let first = next_response(&mut resp_rx).await;
    assert_eq!(first.error_kind(), Some(ErrorKind::Timeout));

    let second = next_response(&mut resp_rx).await;
    assert!(matches!(second, Response::Status(_)));

    dispatcher.stop().await.unwrap();
}

#[tokio::test]
async fn test_slow_board_exceeding_timeout_is_tagged() {
    let mock = MockTransport::new();
    mock.set_read_delay(Duration::from_millis(200));
    let (mut dispatcher, cmd_tx, mut resp_rx) = start_dispatcher(&mock);

    cmd_tx.send(Command::query(CommandCode::Version)).unwrap();
    cmd_tx.send(Command::set_state(CommandCode::AllOn)).unwrap();

    let first = next_response(&mut resp_rx).await;
    assert_eq!(first.error_kind(), Some(ErrorKind::Timeout));
    let second = next_response(&mut resp_rx).await;
    assert!(!second.is_error());

    dispatcher.stop().await.unwrap();
}

#[tokio::test]
async fn test_worker_keeps_draining_without_a_response_reader() {
    let mock = MockTransport::new();
    let (mut dispatcher, cmd_tx, resp_rx) = start_dispatcher(&mock);
    drop(resp_rx);

    cmd_tx.send(Command::set_state(CommandCode::OneOn)).unwrap();
    cmd_tx.send(Command::query(CommandCode::Status)).unwrap();
    cmd_tx.send(Command::query(CommandCode::Version)).unwrap();

    timeout(Duration::from_secs(2), async {
        while mock.written().len() < 3 {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("worker stopped consuming commands");

    assert_eq!(mock.written(), vec![101, 91, 90]);
    assert!(mock.relays().relay_one);
    assert!(dispatcher.is_running());
    assert_eq!(dispatcher.state(), DispatcherState::Running);

    let released = dispatcher.stop().await.unwrap().unwrap();
    assert!(released.output.is_closed());
}

#[tokio::test]
async fn test_stop_waits_for_in_flight_command() {
    let mock = MockTransport::new();
    mock.set_read_delay(Duration::from_millis(40));
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (resp_tx, mut resp_rx) = mpsc::unbounded_channel();

    let timing = ExchangeTiming {
        read_timeout: Duration::from_millis(500),
        settle_delay: Duration::ZERO,
    };
    let mut dispatcher = Dispatcher::new(mock.clone(), timing);
    dispatcher.set_input_queue(cmd_rx).unwrap();
    dispatcher.set_output_queue(resp_tx).unwrap();
    dispatcher.start().unwrap();

    for _ in 0..3 {
        cmd_tx.send(Command::query(CommandCode::Status)).unwrap();
    }

    // Wait until the first command is on the wire
    timeout(Duration::from_secs(2), async {
        while mock.written().is_empty() {
            sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .unwrap();

    let mut released = dispatcher.stop().await.unwrap().unwrap();
    assert_eq!(dispatcher.state(), DispatcherState::Idle);

    // Exactly the popped commands were answered
    let popped = mock.written().len();
    assert_eq!(popped, 1);
    let mut answered = 0;
    while let Ok(response) = resp_rx.try_recv() {
        assert!(matches!(response, Response::Status(_)));
        answered += 1;
    }
    assert_eq!(answered, popped);

    // The rest are still waiting in the caller's queue
    let mut remaining = 0;
    while released.input.try_recv().is_ok() {
        remaining += 1;
    }
    assert_eq!(remaining, 2);
}

#[tokio::test]
async fn test_restart_after_stop_reuses_connection() {
    let mock = MockTransport::new();
    let (mut dispatcher, cmd_tx, mut resp_rx) = start_dispatcher(&mock);

    cmd_tx.send(Command::set_state(CommandCode::OneOn)).unwrap();
    next_response(&mut resp_rx).await;

    let released = dispatcher.stop().await.unwrap().unwrap();
    assert_eq!(dispatcher.state(), DispatcherState::Idle);

    dispatcher.set_input_queue(released.input).unwrap();
    dispatcher.set_output_queue(released.output).unwrap();
    assert_eq!(dispatcher.state(), DispatcherState::Bound);
    dispatcher.start().unwrap();

    cmd_tx.send(Command::query(CommandCode::Status)).unwrap();
    let response = next_response(&mut resp_rx).await;
    assert!(matches!(response, Response::Status(s) if s.relay_one && !s.relay_two));

    dispatcher.close().await.unwrap();
    assert!(mock.is_closed());
}

#[tokio::test]
async fn test_many_producers_share_one_dispatcher() {
    let mock = MockTransport::new();
    let (mut dispatcher, cmd_tx, mut resp_rx) = start_dispatcher(&mock);

    let mut producers = Vec::new();
    for _ in 0..4 {
        let tx = cmd_tx.clone();
        producers.push(tokio::spawn(async move {
            for _ in 0..5 {
                tx.send(Command::query(CommandCode::Version)).unwrap();
            }
        }));
    }
    for producer in producers {
        producer.await.unwrap();
    }

    for _ in 0..20 {
        assert!(!next_response(&mut resp_rx).await.is_error());
    }
    assert_eq!(mock.written().len(), 20);

    dispatcher.stop().await.unwrap();
}

#[tokio::test]
async fn test_board_hands_connection_to_dispatcher() {
    let mock = MockTransport::new();
    let handle = mock.clone();
    let mut board = RelayBoard::with_opener(RelayConfig::default(), move |_| Ok(mock.clone()))
        .with_timing(fast_timing());
    assert!(board.setup());
    board.two_on().await.unwrap();

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (resp_tx, mut resp_rx) = mpsc::unbounded_channel();
    let mut dispatcher = board.into_dispatcher().unwrap();
    dispatcher.set_input_queue(cmd_rx).unwrap();
    dispatcher.set_output_queue(resp_tx).unwrap();
    dispatcher.start().unwrap();

    cmd_tx.send(Command::query(CommandCode::Status)).unwrap();
    let response = next_response(&mut resp_rx).await;
    assert_eq!(serde_json::to_value(&response).unwrap()["relay_two"], true);
    assert_eq!(handle.written(), vec![102, 91]);

    dispatcher.stop().await.unwrap();
}
