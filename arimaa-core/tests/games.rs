//! Whole-game tests
//!
//! Loads the history files under `tests/fixtures/` and checks that they
//! replay to the expected positions, save back to the same text and can
//! be unwound with undo.

use std::path::{Path, PathBuf};
use std::time::Duration;

use arimaa_core::engine::WinReason;
use arimaa_core::notation::parse_square;
use arimaa_core::{
    history, Board, ClockConfig, ClockEvent, ChoiceKind, Engine, EngineError, GameConfig, GameOutcome, Piece,
    PieceKind, Pos, Side, StepOutcome, Timeout,
};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn load(name: &str) -> Engine {
    history::load_from_file(&fixture(name), GameConfig::classic()).expect("fixture should load")
}

fn sq(name: &str) -> Pos {
    parse_square(name).expect("valid square")
}

#[test]
fn test_fixtures_save_back_unchanged() {
    for name in ["opening.txt", "captures.txt", "goal.txt"] {
        let text = std::fs::read_to_string(fixture(name)).unwrap();
        let engine = history::load_from_str(&text, GameConfig::classic()).unwrap();
        assert_eq!(history::history_to_string(&engine), text, "{} changed on re-save", name);
    }
}

#[test]
fn test_opening_position() {
    let engine = load("opening.txt");

    assert_eq!(engine.board().get(sq("a3")), Some(Piece::new(PieceKind::Elephant, Side::Gold)));
    assert_eq!(engine.board().get(sq("a4")), Some(Piece::new(PieceKind::Rabbit, Side::Gold)));
    assert_eq!(engine.board().get(sq("a5")), Some(Piece::new(PieceKind::Rabbit, Side::Silver)));
    assert_eq!(engine.board().get(sq("h6")), Some(Piece::new(PieceKind::Rabbit, Side::Silver)));
    assert!(engine.board().is_empty(sq("a1")));

    assert_eq!(engine.active_side(), Side::Gold);
    assert_eq!(engine.steps_used(), 2);
    assert_eq!(engine.turn().number, 3);
    assert!(engine.outcome().is_none());
}

#[test]
fn test_captures_replayed() {
    let engine = load("captures.txt");
    let board = engine.board();

    // the elephant fell into c6 after its pull, the cat followed later
    for kind in [PieceKind::Elephant, PieceKind::Cat] {
        assert_eq!(board.count(Side::Gold, kind) + board.count(Side::Silver, kind), 0);
    }
    assert_eq!(board.get(sq("a4")), Some(Piece::new(PieceKind::Rabbit, Side::Gold)));
    assert_eq!(board.get(sq("a7")), Some(Piece::new(PieceKind::Rabbit, Side::Silver)));
    assert_eq!(board.pieces().count(), 2);

    let captures: Vec<String> = engine
        .history()
        .iter()
        .filter(|token| token.is_capture())
        .map(|token| token.to_string())
        .collect();
    assert_eq!(captures, ["Ec6x", "cc6x"]);

    assert_eq!(engine.active_side(), Side::Gold);
    assert_eq!(engine.turn().number, 4);
    assert_eq!(engine.steps_used(), 0);
}

#[test]
fn test_goal_fixture_ends_game() {
    let engine = load("goal.txt");
    assert!(engine.is_game_over());
    assert_eq!(
        engine.outcome(),
        Some(GameOutcome { winner: Some(Side::Gold), reason: WinReason::Goal })
    );
}

#[test]
fn test_undo_unwinds_loaded_game() {
    let mut engine = load("captures.txt");
    assert_eq!(engine.undo_depth(), 11);

    while engine.undo() {}

    let mut setup = Board::new();
    setup.set(sq("d2"), Some(Piece::new(PieceKind::Elephant, Side::Gold)));
    setup.set(sq("a2"), Some(Piece::new(PieceKind::Rabbit, Side::Gold)));
    setup.set(sq("d8"), Some(Piece::new(PieceKind::Cat, Side::Silver)));
    setup.set(sq("a7"), Some(Piece::new(PieceKind::Rabbit, Side::Silver)));
    assert_eq!(engine.board(), &setup);
    assert_eq!(engine.active_side(), Side::Gold);
    assert_eq!(engine.steps_used(), 0);
    assert_eq!(engine.history().len(), 2);
}

#[test]
fn test_rabbit_run_hands_turn_to_silver() {
    let mut engine = Engine::new(GameConfig::classic());
    let path = [(6, 0), (5, 0), (4, 0), (3, 0), (2, 0)];
    for pair in path.windows(2) {
        let from = Pos::from_row_col(pair[0].0, pair[0].1);
        let to = Pos::from_row_col(pair[1].0, pair[1].1);
        assert!(matches!(engine.attempt_step(from, to), Ok(StepOutcome::Completed(_))));
    }
    assert_eq!(engine.board().get(Pos::from_row_col(2, 0)), Some(Piece::new(PieceKind::Rabbit, Side::Gold)));
    assert_eq!(engine.active_side(), Side::Silver);
    assert_eq!(engine.remaining_steps(), 4);
}

#[test]
fn test_elephant_may_push_lone_rabbit_anywhere_free() {
    let mut board = Board::new();
    board.set(Pos::from_row_col(3, 3), Some(Piece::new(PieceKind::Elephant, Side::Gold)));
    board.set(Pos::from_row_col(3, 4), Some(Piece::new(PieceKind::Rabbit, Side::Silver)));
    board.set(Pos::from_row_col(7, 7), Some(Piece::new(PieceKind::Rabbit, Side::Gold)));

    let victim = Pos::from_row_col(3, 4);
    let mover = Pos::from_row_col(3, 3);
    let free: Vec<Pos> = victim.neighbors().filter(|&p| p != mover).collect();

    for dest in free {
        let mut engine = Engine::with_board(GameConfig::classic(), board);
        match engine.attempt_step(mover, victim).unwrap() {
            StepOutcome::ChoiceRequired { kind, destinations } => {
                assert_eq!(kind, ChoiceKind::Both);
                assert!(destinations.contains(&dest));
                assert!(!destinations.contains(&mover));
            }
            other => panic!("expected a choice, got {:?}", other),
        }
        engine.resolve_choice(mover, victim, dest).unwrap();
        assert_eq!(engine.board().get(dest), Some(Piece::new(PieceKind::Rabbit, Side::Silver)));
        assert_eq!(engine.board().get(victim), Some(Piece::new(PieceKind::Elephant, Side::Gold)));
        assert_eq!(engine.steps_used(), 2);
    }
}

#[test]
fn test_step_budget_is_enforced() {
    let mut engine = Engine::new(GameConfig::classic());
    engine.attempt_step(sq("a2"), sq("a3")).unwrap();
    engine.attempt_step(sq("b2"), sq("b3")).unwrap();
    engine.attempt_step(sq("c2"), sq("c3")).unwrap();
    assert_eq!(engine.steps_used(), 3);
    assert_eq!(engine.remaining_steps(), 1);
    engine.attempt_step(sq("d2"), sq("d3")).unwrap();
    assert_eq!(engine.active_side(), Side::Silver);
    assert_eq!(engine.steps_used(), 0);
}

#[test]
fn test_config_file_drives_clock() {
    let config = GameConfig::load(&fixture("config_timed.json")).unwrap();
    assert!(config.is_timed());
    assert_eq!(config.clock.tick(), Duration::from_millis(250));

    let engine = Engine::new(config);
    assert!(engine.clock().is_enabled());
    assert!(engine.clock().check_limits().is_none());
}

#[test]
fn test_timed_game_reports_timeout() {
    let config = GameConfig::timed(ClockConfig { max_turn_ms: 20, max_total_ms: 10_000, tick_ms: 5 });
    let mut engine = Engine::new(config);
    let events = engine.clock().events();

    let mut saw_timeout = false;
    while let Ok(event) = events.recv_timeout(Duration::from_secs(2)) {
        if event == (ClockEvent::TurnTimeout { side: Side::Gold }) {
            saw_timeout = true;
            break;
        }
    }
    assert!(saw_timeout);
    assert_eq!(
        engine.attempt_step(sq("a2"), sq("a3")),
        Err(EngineError::TimeExceeded(Timeout::Turn))
    );
    assert_eq!(
        engine.outcome(),
        Some(GameOutcome { winner: Some(Side::Silver), reason: WinReason::Timeout(Timeout::Turn) })
    );
}
