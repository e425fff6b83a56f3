use std::io::Write;
use std::sync::{Arc, Mutex};

/// Serialized output shared by the foreground loop and timer callbacks.
///
/// Timer completions print from their own tasks while the loop may be
/// mid-write; every line goes through one mutex so output never interleaves.
#[derive(Clone)]
pub struct Console {
    sink: Arc<Mutex<Sink>>,
}

enum Sink {
    Stdout,
    Buffer(Vec<String>),
}

impl Console {
    pub fn stdout() -> Self {
        Self {
            sink: Arc::new(Mutex::new(Sink::Stdout)),
        }
    }

    /// Captures lines instead of printing; tests assert on `lines()`.
    pub fn buffered() -> Self {
        Self {
            sink: Arc::new(Mutex::new(Sink::Buffer(Vec::new()))),
        }
    }

    pub fn line(&self, message: &str) {
        let Ok(mut sink) = self.sink.lock() else {
            return;
        };
        match &mut *sink {
            Sink::Stdout => {
                let mut out = std::io::stdout();
                let _ = writeln!(out, "{message}");
                let _ = out.flush();
            }
            Sink::Buffer(lines) => lines.push(message.to_owned()),
        }
    }

    /// Captured lines; always empty for a stdout console.
    pub fn lines(&self) -> Vec<String> {
        match self.sink.lock() {
            Ok(sink) => match &*sink {
                Sink::Stdout => Vec::new(),
                Sink::Buffer(lines) => lines.clone(),
            },
            Err(_) => Vec::new(),
        }
    }
}
