use std::time::{Duration, Instant};

use chess::Board;
use chrono::Utc;
use log::info;
use uuid::Uuid;

use crate::error::GameError;
use crate::game::clock::ChessClock;
use crate::game::validator::{MoveValidator, MoveVerdict};
use crate::models::{
    GameEvent, GameSnapshot, GameStatus, MoveRecord, Player, PlayerColor, TimeControl,
};

/// Below this much remaining time clock updates go out every second instead
/// of every ten.
const LOW_TIME: Duration = Duration::from_secs(60);
const CLOCK_BROADCAST_SLOW: Duration = Duration::from_secs(10);
const CLOCK_BROADCAST_FAST: Duration = Duration::from_secs(1);

/// The state machine for one game: board, history, clocks and status.
///
/// This struct is the single mutation path for a game. It is owned
/// exclusively by the session actor, which funnels every mutating operation
/// (moves, resignations, clock ticks) through it one at a time; the methods
/// here never touch shared state and take the current `Instant` as an
/// argument, so the whole machine is deterministic under test.
///
/// Emitted events accumulate in an internal buffer, in emission order, until
/// the owner drains them with [`SessionState::take_events`]. This lets a
/// rejected operation still surface the terminal transition it observed
/// (e.g. a move arriving after flag-fall).
#[derive(Debug)]
pub struct SessionState {
    game_id: Uuid,
    white: Player,
    black: Player,
    time_control: TimeControl,
    board: Board,
    history: Vec<MoveRecord>,
    status: GameStatus,
    winner: Option<PlayerColor>,
    clock: ChessClock,
    last_clock_broadcast: Option<Instant>,
    pending: Vec<GameEvent>,
}

impl SessionState {
    pub fn new(
        game_id: Uuid,
        white: Player,
        black: Player,
        time_control: TimeControl,
    ) -> Result<Self, GameError> {
        time_control.validate()?;
        Ok(SessionState {
            game_id,
            white,
            black,
            time_control,
            board: Board::default(),
            history: Vec::new(),
            status: GameStatus::Waiting,
            winner: None,
            clock: ChessClock::new(time_control),
            last_clock_broadcast: None,
            pending: Vec::new(),
        })
    }

    pub fn game_id(&self) -> Uuid {
        self.game_id
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn winner(&self) -> Option<PlayerColor> {
        self.winner
    }

    /// The color `player_id` plays, or `None` for strangers and spectators.
    pub fn color_of(&self, player_id: Uuid) -> Option<PlayerColor> {
        if self.white.id == player_id {
            Some(PlayerColor::White)
        } else if self.black.id == player_id {
            Some(PlayerColor::Black)
        } else {
            None
        }
    }

    pub fn player(&self, color: PlayerColor) -> &Player {
        match color {
            PlayerColor::White => &self.white,
            PlayerColor::Black => &self.black,
        }
    }

    /// Explicitly start the game. The first accepted move does this
    /// implicitly; either way the clock starts counting for the side to
    /// move from `now`.
    pub fn start(&mut self, now: Instant) -> Result<(), GameError> {
        if self.status != GameStatus::Waiting {
            return Err(GameError::GameNotActive(self.status));
        }
        self.status = GameStatus::InProgress;
        self.clock
            .start(PlayerColor::from(self.board.side_to_move()), now);
        info!("game {}: started", self.game_id);
        Ok(())
    }

    /// Validate and apply one move as a single indivisible step.
    ///
    /// On any rejection the session is left untouched, with one exception:
    /// a move arriving after the mover's flag has already fallen performs
    /// the timeout transition first and is then rejected as
    /// `GameNotActive` — the loser of that race observes the updated state.
    pub fn submit_move(
        &mut self,
        player_id: Uuid,
        from: &str,
        to: &str,
        promotion: Option<&str>,
        now: Instant,
    ) -> Result<MoveRecord, GameError> {
        let starting = match self.status {
            GameStatus::Waiting => true,
            GameStatus::InProgress => false,
            _ => return Err(GameError::GameNotActive(self.status)),
        };

        let active = PlayerColor::from(self.board.side_to_move());
        match self.color_of(player_id) {
            Some(color) if color == active => {}
            _ => return Err(GameError::NotPlayersTurn),
        }

        if !starting {
            if let Some(flag) = self.clock.flagged(now) {
                self.flag_fall(flag, now);
                return Err(GameError::GameNotActive(self.status));
            }
        }

        let verdict = MoveValidator::validate(&self.board, from, to, promotion)?;
        let MoveVerdict::Legal {
            mv,
            board_after,
            is_check,
            is_checkmate,
            is_stalemate,
        } = verdict
        else {
            return Err(GameError::IllegalMove(format!(
                "{} to {} is not a legal move",
                from, to
            )));
        };

        // Move accepted: board, history and clock change together, then the
        // events go out.
        if starting {
            self.status = GameStatus::InProgress;
            self.clock.start(active, now);
        }
        self.clock.apply_move(active, now);
        self.board = board_after;

        let record = MoveRecord {
            move_number: self.history.len() as u32 + 1,
            color: active,
            from: mv.get_source().to_string(),
            to: mv.get_dest().to_string(),
            promotion: mv
                .get_promotion()
                .map(|piece| MoveValidator::promotion_letter(piece).to_string()),
            fen_after: self.board.to_string(),
            timestamp: Utc::now(),
        };
        self.history.push(record.clone());
        info!(
            "game {}: move {} {} by {}",
            self.game_id,
            record.move_number,
            record.uci(),
            active
        );

        self.pending.push(GameEvent::MoveMade {
            record: record.clone(),
            active_color: active.opponent(),
            check: is_check,
            clock: self.clock.snapshot(now),
        });

        if is_checkmate {
            self.finish(GameStatus::Checkmate, Some(active), now);
        } else if is_stalemate {
            self.finish(GameStatus::Stalemate, None, now);
        } else if MoveValidator::insufficient_material(&self.board) {
            self.finish(GameStatus::Drawn, None, now);
        }

        Ok(record)
    }

    /// End the game in favor of the resigner's opponent.
    pub fn resign(&mut self, player_id: Uuid, now: Instant) -> Result<(), GameError> {
        if self.status != GameStatus::InProgress {
            return Err(GameError::GameNotActive(self.status));
        }
        let color = self
            .color_of(player_id)
            .ok_or(GameError::NotPlayersTurn)?;
        info!("game {}: {} resigned", self.game_id, color);
        self.finish(GameStatus::Resigned, Some(color.opponent()), now);
        Ok(())
    }

    /// Observe the clock at `now`: detect flag-fall and emit a rate-limited
    /// `ClockUpdate` otherwise.
    pub fn tick(&mut self, now: Instant) -> Result<(), GameError> {
        if self.status != GameStatus::InProgress {
            return Err(GameError::GameNotActive(self.status));
        }

        if let Some(flag) = self.clock.flagged(now) {
            self.flag_fall(flag, now);
            return Ok(());
        }

        let min_remaining = self
            .clock
            .advance(PlayerColor::White, now)
            .min(self.clock.advance(PlayerColor::Black, now));
        let interval = if min_remaining <= LOW_TIME {
            CLOCK_BROADCAST_FAST
        } else {
            CLOCK_BROADCAST_SLOW
        };
        let due = self
            .last_clock_broadcast
            .map_or(true, |last| now.saturating_duration_since(last) >= interval);
        if due {
            self.last_clock_broadcast = Some(now);
            self.pending.push(GameEvent::ClockUpdate {
                clock: self.clock.snapshot(now),
            });
        }
        Ok(())
    }

    /// Immutable view of the whole session.
    pub fn snapshot(&self, now: Instant) -> GameSnapshot {
        GameSnapshot {
            game_id: self.game_id,
            white: self.white.clone(),
            black: self.black.clone(),
            time_control: self.time_control,
            fen: self.board.to_string(),
            move_history: self.history.clone(),
            status: self.status,
            winner: self.winner,
            clock: self.clock.snapshot(now),
            legal_moves: if self.status.is_terminal() {
                Vec::new()
            } else {
                MoveValidator::legal_moves(&self.board)
            },
        }
    }

    /// Drain the events emitted since the last drain, in emission order.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending)
    }

    fn flag_fall(&mut self, flag: PlayerColor, now: Instant) {
        info!("game {}: {} flagged", self.game_id, flag);
        self.finish(GameStatus::Timeout, Some(flag.opponent()), now);
    }

    fn finish(&mut self, status: GameStatus, winner: Option<PlayerColor>, now: Instant) {
        self.clock.halt(now);
        self.status = status;
        self.winner = winner;
        info!(
            "game {}: finished with {} (winner: {:?})",
            self.game_id, status, winner
        );
        self.pending.push(GameEvent::GameEnded { status, winner });
    }

    #[cfg(test)]
    pub(crate) fn set_board_for_test(&mut self, board: Board) {
        self.board = board;
    }
}
