//! Structured runtime log rendered as XML.
//!
//! The controlled runtime reports what it does as [`RuntimeLogEvent`]s to every
//! registered [`RuntimeLog`]. [`XmlLogFormatter`] renders them as an indented
//! `<Log>` document without an XML declaration.

use std::io;

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use crate::schedule::OperationId;
use crate::stdio::SharedBuffer;

/// Something the controlled runtime did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeLogEvent {
    OperationCreated { id: OperationId, name: String },
    OperationScheduled { id: OperationId },
    OperationCompleted { id: OperationId },
    RandomBoolean { value: bool },
    RandomInteger { value: i64 },
    MonitorStateTransition {
        monitor: String,
        state: String,
        is_hot: bool,
    },
    AssertionFailure { message: String },
    Message { text: String },
}

/// Receiver of structured runtime events.
pub trait RuntimeLog: Send {
    fn on_event(&mut self, event: &RuntimeLogEvent);

    /// The iteration is over; no more events follow.
    fn on_completion(&mut self) {}
}

/// Writes runtime events as XML into a shared buffer.
///
/// The document is closed on completion, or when the formatter is dropped
/// without having completed.
pub struct XmlLogFormatter {
    writer: Writer<SharedBuffer>,
    open: bool,
}

impl XmlLogFormatter {
    /// Starts a `<Log>` document in `buffer`.
    pub fn new(buffer: SharedBuffer) -> io::Result<Self> {
        let mut writer = Writer::new_with_indent(buffer, b' ', 2);
        writer.write_event(Event::Start(BytesStart::new("Log")))?;
        Ok(Self { writer, open: true })
    }

    fn write(&mut self, event: &RuntimeLogEvent) -> io::Result<()> {
        match event {
            RuntimeLogEvent::OperationCreated { id, name } => {
                let id = id.to_string();
                self.empty("CreateOperation", &[("id", id.as_str()), ("name", name.as_str())])
            }
            RuntimeLogEvent::OperationScheduled { id } => {
                self.empty("Schedule", &[("id", id.to_string().as_str())])
            }
            RuntimeLogEvent::OperationCompleted { id } => {
                self.empty("CompleteOperation", &[("id", id.to_string().as_str())])
            }
            RuntimeLogEvent::RandomBoolean { value } => {
                self.empty("RandomBoolean", &[("value", value.to_string().as_str())])
            }
            RuntimeLogEvent::RandomInteger { value } => {
                self.empty("RandomInteger", &[("value", value.to_string().as_str())])
            }
            RuntimeLogEvent::MonitorStateTransition {
                monitor,
                state,
                is_hot,
            } => {
                let hot = is_hot.to_string();
                self.empty(
                    "MonitorState",
                    &[
                        ("monitor", monitor.as_str()),
                        ("state", state.as_str()),
                        ("hot", hot.as_str()),
                    ],
                )
            }
            RuntimeLogEvent::AssertionFailure { message } => self.text("AssertionFailure", message),
            RuntimeLogEvent::Message { text } => self.text("Message", text),
        }
    }

    fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> io::Result<()> {
        let mut element = BytesStart::new(name);
        for &attribute in attributes {
            element.push_attribute(attribute);
        }
        self.writer.write_event(Event::Empty(element))
    }

    fn text(&mut self, name: &str, text: &str) -> io::Result<()> {
        self.writer.write_event(Event::Start(BytesStart::new(name)))?;
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        self.writer.write_event(Event::End(BytesEnd::new(name)))
    }

    fn finish(&mut self) -> io::Result<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        self.writer.write_event(Event::End(BytesEnd::new("Log")))
    }
}

impl RuntimeLog for XmlLogFormatter {
    fn on_event(&mut self, event: &RuntimeLogEvent) {
        if !self.open {
            return;
        }
        if let Err(error) = self.write(event) {
            tracing::warn!(%error, "failed to write XML log event");
        }
    }

    fn on_completion(&mut self) {
        if let Err(error) = self.finish() {
            tracing::warn!(%error, "failed to close XML log");
        }
    }
}

impl Drop for XmlLogFormatter {
    fn drop(&mut self) {
        let _ = self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_indented_document() {
        let buffer = SharedBuffer::new();
        let mut log = XmlLogFormatter::new(buffer.clone()).unwrap();
        log.on_event(&RuntimeLogEvent::OperationCreated {
            id: 1,
            name: "Client".to_string(),
        });
        log.on_event(&RuntimeLogEvent::OperationScheduled { id: 1 });
        log.on_event(&RuntimeLogEvent::AssertionFailure {
            message: "x < y".to_string(),
        });
        log.on_completion();

        assert_eq!(
            buffer.contents(),
            "<Log>\n  \
             <CreateOperation id=\"1\" name=\"Client\"/>\n  \
             <Schedule id=\"1\"/>\n  \
             <AssertionFailure>x &lt; y</AssertionFailure>\n\
             </Log>"
        );
    }

    #[test]
    fn events_after_completion_are_ignored() {
        let buffer = SharedBuffer::new();
        let mut log = XmlLogFormatter::new(buffer.clone()).unwrap();
        log.on_completion();
        log.on_event(&RuntimeLogEvent::Message {
            text: "late".to_string(),
        });
        drop(log);

        assert_eq!(buffer.contents(), "<Log>\n</Log>");
    }

    #[test]
    fn drop_closes_unfinished_document() {
        let buffer = SharedBuffer::new();
        let mut log = XmlLogFormatter::new(buffer.clone()).unwrap();
        log.on_event(&RuntimeLogEvent::RandomBoolean { value: true });
        drop(log);

        assert!(buffer.contents().ends_with("</Log>"));
        assert!(!buffer.contents().starts_with("<?xml"));
    }
}
