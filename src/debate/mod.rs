// Debate domain types and turn sequencing

mod sequencer;
mod types;

pub use sequencer::{DebateRunner, Phase, SequencerError};
pub use types::{DebateStyle, Evaluation, Side, SideSummary, Turn, Verdict};
