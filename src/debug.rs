//! Real-time safe logging for the filter engine.
//!
//! The engine must not call into `log` (formatting backends allocate and
//! lock). Under the `debug` feature each engine formats into fixed-size
//! entries on its own SPSC ring, and the paired controller drains that ring
//! into `log::debug!`. Without the feature both halves are empty.

#[cfg(not(feature = "debug"))]
use std::fmt;

#[cfg(feature = "debug")]
mod ring {
    use ringbuf::{Consumer, Producer, RingBuffer};
    use std::borrow::Cow;
    use std::fmt;

    const LOG_CAP: usize = 128;
    const LOG_MSG_MAX: usize = 160;

    #[derive(Copy, Clone)]
    struct LogEntry {
        len: u16,
        bytes: [u8; LOG_MSG_MAX],
    }

    impl Default for LogEntry {
        fn default() -> Self {
            Self {
                len: 0,
                bytes: [0; LOG_MSG_MAX],
            }
        }
    }

    impl LogEntry {
        fn text(&self) -> Cow<'_, str> {
            // Truncation may split a UTF-8 sequence
            String::from_utf8_lossy(&self.bytes[..self.len as usize])
        }
    }

    impl fmt::Write for LogEntry {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            let len = self.len as usize;
            let n = s.len().min(LOG_MSG_MAX - len);
            self.bytes[len..len + n].copy_from_slice(&s.as_bytes()[..n]);
            self.len = (len + n) as u16;
            Ok(())
        }
    }

    /// Engine half. Formats on the stack and never blocks.
    pub(crate) struct RtLogger {
        producer: Producer<LogEntry>,
    }

    impl RtLogger {
        pub(crate) fn log(&mut self, args: fmt::Arguments) {
            let mut entry = LogEntry::default();
            let _ = fmt::write(&mut entry, args);
            // Full ring: the message is dropped
            let _ = self.producer.push(entry);
        }
    }

    /// Controller half.
    pub(crate) struct RtLogDrain {
        consumer: Consumer<LogEntry>,
    }

    impl RtLogDrain {
        pub(crate) fn drain(&mut self) {
            while let Some(entry) = self.consumer.pop() {
                if entry.len == 0 {
                    continue;
                }
                log::debug!(target: "iir_filter::engine", "{}", entry.text());
            }
        }

        #[cfg(test)]
        fn messages(&mut self) -> Vec<String> {
            let mut out = Vec::new();
            while let Some(entry) = self.consumer.pop() {
                out.push(entry.text().into_owned());
            }
            out
        }
    }

    pub(crate) fn channel() -> (RtLogger, RtLogDrain) {
        let (producer, consumer) = RingBuffer::<LogEntry>::new(LOG_CAP).split();
        (RtLogger { producer }, RtLogDrain { consumer })
    }

}

#[cfg(feature = "debug")]
pub(crate) use ring::{channel as rt_log_channel, RtLogDrain, RtLogger};

#[cfg(not(feature = "debug"))]
pub(crate) struct RtLogger;

#[cfg(not(feature = "debug"))]
impl RtLogger {
    #[inline]
    pub(crate) fn log(&mut self, _args: fmt::Arguments) {}
}

#[cfg(not(feature = "debug"))]
pub(crate) struct RtLogDrain;

#[cfg(not(feature = "debug"))]
impl RtLogDrain {
    pub(crate) fn drain(&mut self) {}
}

#[cfg(not(feature = "debug"))]
pub(crate) fn rt_log_channel() -> (RtLogger, RtLogDrain) {
    (RtLogger, RtLogDrain)
}

/// Log from the real-time thread without allocating.
macro_rules! rt_log {
    ($logger:expr, $($arg:tt)*) => {
        $logger.log(format_args!($($arg)*))
    };
}

pub(crate) use rt_log;
