use crate::display::file_name;
use crate::progress::CliReporter;
use colored::*;
use console::Term;
use media_duper_core::{Decision, DecisionSource, DuplicatePair, Error, FixedPolicy};
use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Asks the operator on the terminal what to do with each duplicate pair.
pub struct InteractiveDecisions {
    term: Term,
    reporter: Arc<CliReporter>,
    cancel_token: Arc<AtomicBool>,
}

impl InteractiveDecisions {
    pub fn new(reporter: Arc<CliReporter>, cancel_token: Arc<AtomicBool>) -> Self {
        Self {
            term: Term::stdout(),
            reporter,
            cancel_token,
        }
    }

    // Term::read_line returns an empty line when stdin is not a terminal, so piped
    // answers are read directly and end of input stops the run.
    fn read_answer(&self) -> Result<String, Error> {
        if self.term.is_term() {
            return Ok(self.term.read_line()?);
        }
        let mut input = String::new();
        if io::stdin().lock().read_line(&mut input)? == 0 {
            return Err(Error::Other("no more input on stdin".to_string()));
        }
        Ok(input)
    }

    fn ask(&self, pair: &DuplicatePair) -> Result<Decision, Error> {
        let first = file_name(&pair.first);
        let second = file_name(&pair.second);
        for line in [
            format!("[1] Keep {} (delete the other)", first),
            format!("[2] Keep {} (delete the other)", second),
            "[3] Keep both files".to_string(),
            "[4] Move duplicate to separate folder".to_string(),
            "[q] Quit program".to_string(),
        ] {
            self.term.write_line(&line.cyan().to_string())?;
        }

        loop {
            self.term
                .write_str(&"What would you like to do? (1/2/3/4/q): ".green().to_string())?;
            let input = self.read_answer()?;
            if self.cancel_token.load(Ordering::Relaxed) {
                return Err(Error::Cancelled);
            }
            match parse_choice(&input) {
                Some(Decision::Abort) => {
                    self.term.write_line(&"Exiting program...".yellow().to_string())?;
                    return Ok(Decision::Abort);
                }
                Some(decision) => return Ok(decision),
                None => self
                    .term
                    .write_line(&"Invalid choice. Please try again.".red().to_string())?,
            }
        }
    }
}

impl DecisionSource for InteractiveDecisions {
    fn decide(&mut self, pair: &DuplicatePair) -> Result<Decision, Error> {
        self.reporter.suspend(|| self.ask(pair))
    }
}

/// Applies one fixed decision to every pair and says so next to each pair.
pub struct AnnouncedPolicy {
    policy: FixedPolicy,
    announcement: String,
    reporter: Arc<CliReporter>,
}

impl AnnouncedPolicy {
    pub fn new(decision: Decision, announcement: String, reporter: Arc<CliReporter>) -> Self {
        Self {
            policy: FixedPolicy::new(decision),
            announcement,
            reporter,
        }
    }
}

impl DecisionSource for AnnouncedPolicy {
    fn decide(&mut self, pair: &DuplicatePair) -> Result<Decision, Error> {
        self.reporter
            .suspend(|| println!("{}", self.announcement.green()));
        self.policy.decide(pair)
    }
}

pub fn parse_choice(input: &str) -> Option<Decision> {
    match input.trim().to_lowercase().as_str() {
        "1" => Some(Decision::KeepFirst),
        "2" => Some(Decision::KeepSecond),
        "3" => Some(Decision::KeepBoth),
        "4" => Some(Decision::Relocate),
        "q" => Some(Decision::Abort),
        _ => None,
    }
}
