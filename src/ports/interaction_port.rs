//! User interaction port trait.

use crate::domain::transaction::TransactionRecord;

/// Answer to a yes/no prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Decline,
}

impl Decision {
    /// Only an explicit affirmative accepts.
    pub fn from_answer(answer: &str) -> Self {
        match answer.trim().to_lowercase().as_str() {
            "y" | "yes" => Decision::Accept,
            _ => Decision::Decline,
        }
    }

    pub fn is_accept(self) -> bool {
        self == Decision::Accept
    }
}

pub trait InteractionPort {
    /// Present a tabular preview of pending records under `title`.
    fn show_records(&mut self, title: &str, records: &[TransactionRecord]);

    /// Informational line.
    fn notify(&mut self, message: &str);

    /// Advisory warning; never blocks the pipeline.
    fn warn(&mut self, message: &str);

    /// Ask a yes/no question, blocking until answered.
    fn confirm(&mut self, question: &str) -> Decision;
}
