use crate::error::Error;
#[cfg(test)]
use std::cell::RefCell;
use std::io::Write;

/// What the commands print
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    /// Human-readable text, JSON is dropped
    Text,

    /// JSON only, text is dropped
    Structured,
}

/// Where the output lands
enum Sink {
    /// Process stdout and stderr
    Std,

    /// Captured in memory
    #[cfg(test)]
    Buffer {
        out: RefCell<Vec<u8>>,
        err: RefCell<Vec<u8>>,
    },
}

/// Output channel shared by all runners
///
/// Results go to the out stream, errors always go to the err stream
/// regardless of the mode.
pub(crate) struct Writer {
    mode: Mode,
    sink: Sink,
}

impl Writer {
    pub(crate) fn new(is_structured: bool) -> Self {
        Writer {
            mode: if is_structured {
                Mode::Structured
            } else {
                Mode::Text
            },
            sink: Sink::Std,
        }
    }

    /// Writer keeping everything in memory, read back with `out()` and `err()`
    #[cfg(test)]
    pub(crate) fn buffered(is_structured: bool) -> Self {
        Writer {
            sink: Sink::Buffer {
                out: RefCell::default(),
                err: RefCell::default(),
            },
            ..Self::new(is_structured)
        }
    }

    /// Output plain text, skipped in structured mode
    pub(crate) fn text(&self, output: &str) -> Result<(), Error> {
        match self.mode {
            Mode::Text => self.write(output, false),

            Mode::Structured => {
                log::debug!("Skipping text in structured mode: {output}");
                Ok(())
            }
        }
    }

    /// Output one JSON document per line, skipped in text mode
    pub(crate) fn json(&self, output: serde_json::Value) -> Result<(), Error> {
        match self.mode {
            Mode::Structured => self.write(&format!("{output}\n"), false),

            Mode::Text => {
                log::debug!("Skipping JSON in text mode: {output}");
                Ok(())
            }
        }
    }

    pub(crate) fn error(&self, output: &str) -> Result<(), Error> {
        self.write(output, true)
    }

    fn write(&self, output: &str, is_error: bool) -> Result<(), Error> {
        let result = match &self.sink {
            Sink::Std if is_error => std::io::stderr().lock().write_all(output.as_bytes()),
            Sink::Std => std::io::stdout().lock().write_all(output.as_bytes()),

            #[cfg(test)]
            Sink::Buffer { out, err } => {
                let buffer = if is_error { err } else { out };
                buffer.borrow_mut().write_all(output.as_bytes())
            }
        };

        result.map_err(|e| {
            log::error!("Failed to write output: {e:?}");
            Error::new("Output error", Some("Check that the output stream is open."))
        })
    }

    pub(crate) fn is_structured(&self) -> bool {
        self.mode == Mode::Structured
    }

    /// Everything written to the out stream so far
    #[cfg(test)]
    pub(crate) fn out(&self) -> String {
        match &self.sink {
            Sink::Buffer { out, .. } => String::from_utf8_lossy(&out.borrow()).into_owned(),
            Sink::Std => String::new(),
        }
    }

    /// Everything written to the err stream so far
    #[cfg(test)]
    pub(crate) fn err(&self) -> String {
        match &self.sink {
            Sink::Buffer { err, .. } => String::from_utf8_lossy(&err.borrow()).into_owned(),
            Sink::Std => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_should_print_text_only_in_text_mode() {
        let writer = Writer::buffered(false);
        writer.text("hello\n").unwrap();
        writer.json(json!({ "hello": true })).unwrap();

        assert!(!writer.is_structured());
        assert_eq!(writer.out(), "hello\n");
    }

    #[test]
    fn test_should_print_json_only_in_structured_mode() {
        let writer = Writer::buffered(true);
        writer.text("hello\n").unwrap();
        writer.json(json!({ "hello": true })).unwrap();

        assert!(writer.is_structured());
        assert_eq!(writer.out(), "{\"hello\":true}\n");
    }

    #[test]
    fn test_should_send_errors_to_err_stream_in_both_modes() {
        for is_structured in [false, true] {
            let writer = Writer::buffered(is_structured);
            writer.error("failed\n").unwrap();

            assert_eq!(writer.err(), "failed\n");
            assert!(writer.out().is_empty());
        }
    }
}
