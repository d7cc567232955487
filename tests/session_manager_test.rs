//! Tests for session orchestration and the background ticker.

use chrono::DateTime;
use quiz_duel::{
    Action, GameEvent, ManualClock, Phase, PlayerId, Question, QuestionId, Round, SessionError,
    SessionManager, Settings, TimeLimits, TransitionError, spawn_ticker,
};
use std::sync::Arc;
use std::time::Duration;

fn setup() -> (SessionManager, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(
        DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
    ));
    (SessionManager::with_clock(clock.clone()), clock)
}

fn quiz() -> Settings {
    Settings::resolve(
        vec!["alice".into(), "bob".into()],
        vec![Round::new(
            1,
            vec![Question::new(1, 100, "Paris"), Question::new(2, 50, "Rome")],
        )],
        TimeLimits::new(Duration::from_secs(10), Duration::from_secs(20)),
    )
    .unwrap()
}

fn open_first_question(manager: &SessionManager, id: u64) {
    manager
        .apply(
            id,
            Action::SelectFirstPlayer {
                player: "alice".into(),
            },
        )
        .unwrap();
    manager
        .apply(
            id,
            Action::SelectQuestion {
                player: "alice".into(),
                question: QuestionId::new(1),
            },
        )
        .unwrap();
}

#[test]
fn test_new_session_starts_clean() {
    let (manager, _) = setup();
    let id = manager.create_session(quiz());

    let state = manager.state(id).unwrap();
    assert_eq!(*state.phase(), Phase::AwaitingFirstPlayer);
    assert_eq!(*state.version(), 0);
    assert!(manager.events(id).unwrap().is_empty());
    assert_eq!(
        manager.scores(id).unwrap().values().copied().collect::<Vec<_>>(),
        vec![0, 0]
    );
    assert_eq!(manager.settings(id).unwrap().question_count(), 2);
}

#[test]
fn test_outcome_carries_events_and_deltas() {
    let (manager, clock) = setup();
    let id = manager.create_session(quiz());
    open_first_question(&manager, id);

    clock.advance(Duration::from_secs(3));
    manager
        .apply(id, Action::CaptureQuestion { player: "bob".into() })
        .unwrap();
    clock.advance(Duration::from_secs(3));
    let outcome = manager
        .apply(
            id,
            Action::Answer {
                player: "bob".into(),
                text: "PARIS".to_string(),
            },
        )
        .unwrap();

    assert!(outcome.is_transition());
    assert_eq!(outcome.events().len(), 1);
    assert!(matches!(
        outcome.events()[0].event(),
        GameEvent::AnswerSubmitted {
            correct: true,
            score_delta: 100,
            ..
        }
    ));
    assert_eq!(outcome.score_deltas().len(), 1);
    assert_eq!(*outcome.state().phase(), Phase::AwaitingSelection);
    assert_eq!(manager.scores(id).unwrap()[&PlayerId::from("bob")], 100);
    assert_eq!(manager.events(id).unwrap().len(), 4);
}

#[test]
fn test_deadlines_use_manager_clock() {
    let (manager, clock) = setup();
    let id = manager.create_session(quiz());
    open_first_question(&manager, id);

    clock.advance(Duration::from_secs(10));
    let err = manager
        .apply(id, Action::CaptureQuestion { player: "bob".into() })
        .unwrap_err();
    assert_eq!(
        err,
        SessionError::Transition(TransitionError::CaptureWindowExpired)
    );

    let outcome = manager.tick(id).unwrap();
    assert!(outcome.is_transition());
    assert_eq!(*outcome.state().phase(), Phase::AwaitingSelection);
    assert_eq!(outcome.state().active_player(), &Some("bob".into()));
    assert!(outcome.score_deltas().is_empty());
}

#[test]
fn test_idle_tick_changes_nothing() {
    let (manager, _) = setup();
    let id = manager.create_session(quiz());
    open_first_question(&manager, id);
    let before = manager.state(id).unwrap();

    let outcome = manager.tick(id).unwrap();
    assert!(!outcome.is_transition());
    assert_eq!(*outcome.state(), before);
    assert_eq!(manager.events(id).unwrap().len(), 2);
}

#[test]
fn test_concurrent_buzzers_have_one_winner() {
    let (manager, _) = setup();
    let id = manager.create_session(quiz());
    open_first_question(&manager, id);

    let handles: Vec<_> = ["alice", "bob"]
        .into_iter()
        .map(|name| {
            let manager = manager.clone();
            std::thread::spawn(move || {
                manager.apply(
                    id,
                    Action::CaptureQuestion {
                        player: name.into(),
                    },
                )
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(results.iter().any(|r| matches!(
        r,
        Err(SessionError::Transition(TransitionError::AlreadyCaptured(_)))
    )));
}

#[tokio::test]
async fn test_ticker_enforces_deadlines() {
    let (manager, clock) = setup();
    let id = manager.create_session(quiz());
    open_first_question(&manager, id);
    clock.advance(Duration::from_secs(11));

    let handle = spawn_ticker(manager.clone(), Duration::from_millis(10));
    let mut phase = *manager.state(id).unwrap().phase();
    for _ in 0..100 {
        if phase == Phase::AwaitingSelection {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        phase = *manager.state(id).unwrap().phase();
    }
    handle.abort();

    assert_eq!(phase, Phase::AwaitingSelection);
    assert!(manager.state(id).unwrap().is_answered(QuestionId::new(1)));
}
