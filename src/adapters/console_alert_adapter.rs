//! Alerts printed to a writer (stdout by default) with markup removed.

use std::io::{self, Write};
use std::sync::Mutex;

use crate::domain::error::SigtraderError;
use crate::ports::alert_port::AlertPort;

pub struct ConsoleAlertAdapter<W: Write> {
    out: Mutex<W>,
}

impl ConsoleAlertAdapter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleAlertAdapter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Drops `<...>` tags and decodes the entities produced by `escape_html`.
fn plain_text(message: &str) -> String {
    let mut text = String::with_capacity(message.len());
    let mut in_tag = false;
    for c in message.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

impl<W: Write> AlertPort for ConsoleAlertAdapter<W> {
    fn send(&self, message: &str) -> Result<(), SigtraderError> {
        let mut out = self.out.lock().map_err(|_| SigtraderError::Sink {
            sink: "console alert",
            reason: "writer lock poisoned".to_string(),
        })?;
        writeln!(out, "{}\n{}", "-".repeat(40), plain_text(message))?;
        out.flush()?;
        Ok(())
    }
}
