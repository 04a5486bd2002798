use std::io::{self, Stderr, Stdout, Write};

use crate::error::ChatError;
use crate::model::Message;

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

pub struct Terminal<O, E> {
    pub out: O,
    pub err: E,
    use_color: bool,
    quiet: bool,
}

impl Terminal<Stdout, Stderr> {
    pub fn stdio(use_color: bool, quiet: bool) -> Self {
        Self::new(io::stdout(), io::stderr(), use_color, quiet)
    }
}

impl<O, E> Terminal<O, E>
where
    O: Write,
    E: Write,
{
    pub fn new(out: O, err: E, use_color: bool, quiet: bool) -> Self {
        Self {
            out,
            err,
            use_color,
            quiet,
        }
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_color {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    pub fn banner(&mut self, model: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        writeln!(self.out, "model: {model}")?;
        writeln!(self.out, "type /help for commands, /quit to exit\n")?;
        self.out.flush()
    }

    pub fn prompt(&mut self) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let marker = self.paint(GREEN, "You:");
        write!(self.out, "{marker} ")?;
        self.out.flush()
    }

    pub fn assistant_header(&mut self) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let header = self.paint(RED, "Assistant:");
        writeln!(self.out, "\n{header}")?;
        self.out.flush()
    }

    pub fn end_reply(&mut self) -> io::Result<()> {
        writeln!(self.out)?;
        if !self.quiet {
            writeln!(self.out)?;
        }
        self.out.flush()
    }

    pub fn history(&mut self, history: &[Message]) -> io::Result<()> {
        for (idx, msg) in history.iter().enumerate() {
            writeln!(self.out, "[{}] {}: {}", idx, msg.role.as_str(), msg.content)?;
        }
        writeln!(self.out)?;
        self.out.flush()
    }

    pub fn help(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{text}")?;
        self.out.flush()
    }

    pub fn error(&mut self, err: &ChatError) -> io::Result<()> {
        let label = self.paint(RED, "Error:");
        writeln!(self.err, "{label} {err}")?;
        self.err.flush()
    }

    pub fn notice(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.err, "{text}")?;
        self.err.flush()
    }
}
