//! Round generation and answer handling for the blind listening survey.

mod answer;
mod candidates;
mod models;
mod round;
mod sampling;
mod segment;
mod selection;

pub use answer::{submit_answer, AnswerError, AnswerOutcome, AnswerSubmission};
pub use candidates::CandidatePair;
pub use models::{ComparisonRound, PairingChoice, RoundFilters, RoundOptions};
pub use round::generate_round;
pub use sampling::{random_element, weighted_choice, weighted_sample_without_replacement};
pub use segment::{choose_start_ms, max_start_ms};
