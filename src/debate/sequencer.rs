// Turn sequencer — the per-session state machine that alternates sides,
// enforces the configured turn budget and arbitrates interjections.
//
// Exactly one generation may be in flight per session. An interjection
// cancels that generation (the late result is dropped by the caller) and
// does not consume a turn slot: the next side is recomputed from the
// unchanged counter.

use tokio_util::sync::CancellationToken;

use super::types::{Side, Turn};

/// Sequencer phase. `Typing` is a presentation state with no semantic
/// effect on ordering; it exists so callers can pace playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingGeneration(Side),
    Typing(Side),
    AwaitingIntervention,
    Complete,
}

#[derive(Debug, thiserror::Error)]
pub enum SequencerError {
    #[error("debate is complete, no further generation permitted")]
    Complete,
    #[error("a generation is already in flight for this session")]
    AlreadyGenerating,
    #[error("requested side {requested} but turn {index} belongs to {expected}")]
    WrongSide {
        requested: Side,
        expected: Side,
        index: usize,
    },
}

/// State machine for one debate session.
pub struct DebateRunner {
    phase: Phase,
    turn_counter: usize,
    max_turns: usize,
    cancel: Option<CancellationToken>,
}

impl DebateRunner {
    pub fn new(max_turns: usize) -> Self {
        Self {
            phase: Phase::Idle,
            turn_counter: 0,
            max_turns,
            cancel: None,
        }
    }

    /// Rebuild a runner for a persisted debate, e.g. after a server
    /// restart. `generated_turns` counts model turns only, never
    /// interjections.
    pub fn restore(max_turns: usize, generated_turns: usize) -> Self {
        let phase = if generated_turns >= max_turns {
            Phase::Complete
        } else if generated_turns == 0 {
            Phase::Idle
        } else {
            Phase::AwaitingIntervention
        };
        Self {
            phase,
            turn_counter: generated_turns,
            max_turns,
            cancel: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn turn_counter(&self) -> usize {
        self.turn_counter
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Complete
    }

    pub fn is_generating(&self) -> bool {
        matches!(self.phase, Phase::AwaitingGeneration(_))
    }

    /// Side that owns the next generated turn, by counter parity.
    pub fn next_side(&self) -> Side {
        Side::for_turn(self.turn_counter)
    }

    /// True when the next generated turn is the last one of the debate.
    pub fn next_is_final(&self) -> bool {
        self.turn_counter + 1 == self.max_turns
    }

    /// Start a generation for the next side. Returns the cancellation token
    /// the gateway call must observe. Rejects overlapping generations and
    /// any attempt past the turn budget.
    pub fn begin_generation(&mut self) -> Result<(Side, CancellationToken), SequencerError> {
        if self.is_complete() || self.turn_counter >= self.max_turns {
            return Err(SequencerError::Complete);
        }
        if self.is_generating() {
            return Err(SequencerError::AlreadyGenerating);
        }

        let side = self.next_side();
        let token = CancellationToken::new();
        self.cancel = Some(token.clone());
        self.phase = Phase::AwaitingGeneration(side);
        Ok((side, token))
    }

    /// Like `begin_generation`, but validates a caller-supplied side against
    /// the parity-computed one. The counter, not the caller, decides who
    /// speaks.
    pub fn begin_generation_for(
        &mut self,
        requested: Side,
    ) -> Result<(Side, CancellationToken), SequencerError> {
        let expected = self.next_side();
        if requested != expected {
            return Err(SequencerError::WrongSide {
                requested,
                expected,
                index: self.turn_counter,
            });
        }
        self.begin_generation()
    }

    /// Commit a successfully generated turn: append semantics belong to the
    /// store, sequencing semantics live here. Increments the counter and
    /// enters the typing presentation state. Returns None when no generation
    /// is in flight, which happens when an interjection cancelled it after
    /// the result was already on its way back; the late result is dropped.
    pub fn commit_generated(&mut self, content: &str) -> Option<Turn> {
        let Phase::AwaitingGeneration(side) = self.phase else {
            return None;
        };
        self.cancel = None;
        self.turn_counter += 1;
        self.phase = Phase::Typing(side);
        Some(Turn::new(side, content))
    }

    /// The typing animation (or the caller's pacing delay) has elapsed.
    pub fn finish_typing(&mut self) {
        if let Phase::Typing(_) = self.phase {
            self.phase = if self.turn_counter >= self.max_turns {
                Phase::Complete
            } else {
                Phase::AwaitingIntervention
            };
        }
    }

    /// The in-flight generation ended without a usable result (timeout or
    /// cancellation). Benign: no turn is appended, no counter movement.
    pub fn generation_cancelled(&mut self) {
        self.cancel = None;
        if self.is_generating() {
            self.phase = Phase::AwaitingIntervention;
        }
    }

    /// User interjection: cancel any in-flight generation and produce the
    /// `user` turn to append. Does not touch the turn counter, so the next
    /// generated turn keeps its side.
    pub fn interject(&mut self, content: &str) -> Result<Turn, SequencerError> {
        if self.is_complete() {
            return Err(SequencerError::Complete);
        }
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
        self.phase = Phase::AwaitingIntervention;
        Ok(Turn::new(Side::User, content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_full_debate(max_turns: usize) -> Vec<Side> {
        let mut runner = DebateRunner::new(max_turns);
        let mut sides = Vec::new();
        while !runner.is_complete() {
            let (side, _token) = runner.begin_generation().unwrap();
            sides.push(side);
            runner.commit_generated("argument").unwrap();
            runner.finish_typing();
        }
        sides
    }

    #[test]
    fn test_sides_alternate_by_parity() {
        assert_eq!(run_full_debate(4), vec![Side::Pro, Side::Con, Side::Pro, Side::Con]);
        let six = run_full_debate(6);
        for (i, side) in six.iter().enumerate() {
            assert_eq!(*side, Side::for_turn(i));
        }
    }

    #[test]
    fn test_complete_rejects_further_generation() {
        let mut runner = DebateRunner::new(2);
        for _ in 0..2 {
            runner.begin_generation().unwrap();
            runner.commit_generated("x").unwrap();
            runner.finish_typing();
        }
        assert!(runner.is_complete());
        assert!(matches!(
            runner.begin_generation(),
            Err(SequencerError::Complete)
        ));
    }

    #[test]
    fn test_single_flight_guard() {
        let mut runner = DebateRunner::new(4);
        runner.begin_generation().unwrap();
        assert!(matches!(
            runner.begin_generation(),
            Err(SequencerError::AlreadyGenerating)
        ));
    }

    #[test]
    fn test_interjection_does_not_consume_turn_slot() {
        let mut runner = DebateRunner::new(4);
        let (side, token) = runner.begin_generation().unwrap();
        assert_eq!(side, Side::Pro);

        // Interjection arrives while pro's turn is in flight
        let turn = runner.interject("explain that further").unwrap();
        assert_eq!(turn.side, Side::User);
        assert!(token.is_cancelled());
        assert_eq!(runner.turn_counter(), 0);

        // Next generation still belongs to pro
        let (side, _token) = runner.begin_generation().unwrap();
        assert_eq!(side, Side::Pro);
    }

    #[test]
    fn test_late_result_after_interjection_is_dropped() {
        let mut runner = DebateRunner::new(4);
        runner.begin_generation().unwrap();

        // Interjection cancels the in-flight generation; its result arrives
        // afterwards and must not become a turn.
        runner.interject("hold on").unwrap();
        assert!(runner.commit_generated("late argument").is_none());
        assert_eq!(runner.turn_counter(), 0);
        assert_eq!(runner.phase(), Phase::AwaitingIntervention);

        // Pro still owns the slot
        let (side, _token) = runner.begin_generation().unwrap();
        assert_eq!(side, Side::Pro);
    }

    #[test]
    fn test_parity_independent_of_interjections() {
        let mut runner = DebateRunner::new(4);
        let mut sides = Vec::new();
        for i in 0..4 {
            let (side, _token) = runner.begin_generation().unwrap();
            sides.push(side);
            runner.commit_generated("arg").unwrap();
            runner.finish_typing();
            if i == 1 {
                runner.interject("what about cost?").unwrap();
            }
        }
        assert_eq!(sides, vec![Side::Pro, Side::Con, Side::Pro, Side::Con]);
    }

    #[test]
    fn test_final_turn_flag() {
        let mut runner = DebateRunner::new(4);
        for _ in 0..3 {
            assert!(!runner.next_is_final());
            runner.begin_generation().unwrap();
            runner.commit_generated("x").unwrap();
            runner.finish_typing();
        }
        assert!(runner.next_is_final());
    }

    #[test]
    fn test_cancelled_generation_is_benign() {
        let mut runner = DebateRunner::new(4);
        runner.begin_generation().unwrap();
        runner.generation_cancelled();
        assert_eq!(runner.turn_counter(), 0);
        assert_eq!(runner.phase(), Phase::AwaitingIntervention);
        // Generation can resume immediately
        assert!(runner.begin_generation().is_ok());
    }

    #[test]
    fn test_wrong_side_rejected() {
        let mut runner = DebateRunner::new(4);
        let err = runner.begin_generation_for(Side::Con).unwrap_err();
        assert!(matches!(err, SequencerError::WrongSide { .. }));
        // Guard did not start a generation
        assert!(!runner.is_generating());
        assert!(runner.begin_generation_for(Side::Pro).is_ok());
    }

    #[test]
    fn test_interjection_rejected_after_complete() {
        let mut runner = DebateRunner::new(1);
        runner.begin_generation().unwrap();
        runner.commit_generated("x").unwrap();
        runner.finish_typing();
        assert!(runner.interject("too late").is_err());
    }
}
