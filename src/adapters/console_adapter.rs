//! Terminal implementation of the interaction port.

use crate::domain::transaction::TransactionRecord;
use crate::ports::interaction_port::{Decision, InteractionPort};
use std::io::{self, BufRead, Write};
use tracing::warn;

const DESCRIPTION_WIDTH: usize = 40;

pub struct ConsoleInteraction<R, W> {
    reader: R,
    writer: W,
}

impl ConsoleInteraction<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsoleInteraction<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    fn write_lines(&mut self, lines: &[String]) {
        let result = lines
            .iter()
            .try_for_each(|line| writeln!(self.writer, "{line}"))
            .and_then(|()| self.writer.flush());
        if let Err(e) = result {
            warn!(error = %e, "failed to write to console");
        }
    }
}

impl<R: BufRead, W: Write> InteractionPort for ConsoleInteraction<R, W> {
    fn show_records(&mut self, title: &str, records: &[TransactionRecord]) {
        let mut lines = vec![String::new(), title.to_string()];
        lines.extend(render_table(records));
        self.write_lines(&lines);
    }

    fn notify(&mut self, message: &str) {
        self.write_lines(&[message.to_string()]);
    }

    fn warn(&mut self, message: &str) {
        self.write_lines(&[format!("warning: {message}")]);
    }

    fn confirm(&mut self, question: &str) -> Decision {
        if let Err(e) = write!(self.writer, "{question} [y/N] ").and_then(|()| self.writer.flush()) {
            warn!(error = %e, "failed to write prompt");
        }
        let mut answer = String::new();
        match self.reader.read_line(&mut answer) {
            // Closed input never implies consent.
            Ok(0) => {
                self.write_lines(&[String::new()]);
                Decision::Decline
            }
            Ok(_) => Decision::from_answer(&answer),
            Err(e) => {
                warn!(error = %e, "failed to read answer");
                Decision::Decline
            }
        }
    }
}

/// Fixed-width rows: date, description, amount, category.
pub fn render_table(records: &[TransactionRecord]) -> Vec<String> {
    let amounts: Vec<String> = records.iter().map(|r| r.amount.to_string()).collect();
    let amount_width = amounts.iter().map(String::len).max().unwrap_or(0).max(6);

    let mut lines = Vec::with_capacity(records.len() + 2);
    lines.push(format!(
        "  {:<10}  {:<dw$}  {:>aw$}  {}",
        "Date",
        "Description",
        "Amount",
        "Category",
        dw = DESCRIPTION_WIDTH,
        aw = amount_width,
    ));
    lines.push(format!(
        "  {}  {}  {}  {}",
        "-".repeat(10),
        "-".repeat(DESCRIPTION_WIDTH),
        "-".repeat(amount_width),
        "-".repeat(8),
    ));
    for (record, amount) in records.iter().zip(&amounts) {
        lines.push(
            format!(
                "  {:<10}  {:<dw$}  {:>aw$}  {}",
                record.store_date(),
                truncate(&record.description, DESCRIPTION_WIDTH),
                amount,
                record.category.as_deref().unwrap_or(""),
                dw = DESCRIPTION_WIDTH,
                aw = amount_width,
            )
            .trim_end()
            .to_string(),
        );
    }
    lines
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut out: String = text.chars().take(width - 3).collect();
        out.push_str("...");
        out
    }
}
