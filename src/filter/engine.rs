use crossbeam_channel::{bounded, Receiver};
use std::io::{self, BufRead, BufReader, Read};
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, trace};

use super::matcher::MatcherSet;
use crate::config::MatchOptions;
use crate::errors::GrepResult;
use crate::pattern::PatternSet;

// Selected lines in flight between the producer thread and the consumer.
// Bounded so a slow consumer applies backpressure to the producer.
const LINE_CHANNEL_CAPACITY: usize = 64;

// Initial capacity of the per-line read buffer
const LINE_BUFFER_CAPACITY: usize = 256;

/// A grep request: a pattern set plus match options, ready to be run
/// against an input stream.
///
/// Searches input for matches to the patterns and copies each selected
/// line to the output, newline-terminated. There is no limit on input
/// line length other than available memory, and lines may contain
/// arbitrary bytes. If the final byte of the input is not a newline, one
/// is silently supplied on output. Since newline also separates patterns,
/// there is no way to match a newline character in the text.
#[derive(Debug)]
pub struct Grep {
    patterns: PatternSet,
    options: MatchOptions,
}

impl Grep {
    /// Creates a request from an inline pattern argument with default
    /// options. The argument may contain several patterns separated by
    /// newlines.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            patterns: PatternSet::new(pattern),
            options: MatchOptions::default(),
        }
    }

    /// Creates a request from an explicit pattern set and options
    pub fn from_parts(patterns: PatternSet, options: MatchOptions) -> Self {
        Self { patterns, options }
    }

    /// Replaces the request's options
    pub fn options(mut self, options: MatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Runs the request against an input byte stream, returning a reader
    /// over the selected lines.
    ///
    /// Pattern resolution and compilation happen here, before any input
    /// is consumed; an invalid pattern or a pattern-source read failure
    /// returns an error and no output is produced. Line matching then
    /// runs on a producer thread, strictly sequential and in input order,
    /// handing selected lines to the returned reader through a bounded
    /// channel. Dropping the reader stops the producer and releases the
    /// input.
    ///
    /// The returned reader is single-pass and is itself a valid `filter`
    /// input, so stages can be chained.
    pub fn filter<R>(self, input: R) -> GrepResult<MatchReader>
    where
        R: Read + Send + 'static,
    {
        let options = Arc::new(self.options.resolve());
        let patterns = self.patterns.resolve()?;
        let matchers = MatcherSet::build(&patterns, options)?;
        info!("starting filter with {} matchers", matchers.len());

        let (sender, receiver) = bounded::<io::Result<Vec<u8>>>(LINE_CHANNEL_CAPACITY);

        thread::Builder::new()
            .name("linegrep-producer".to_string())
            .spawn(move || {
                let mut reader = BufReader::new(input);
                let mut buf = Vec::with_capacity(LINE_BUFFER_CAPACITY);
                loop {
                    buf.clear();
                    match reader.read_until(b'\n', &mut buf) {
                        Ok(0) => break,
                        Ok(_) => {
                            let line = trim_terminator(&buf);
                            if matchers.matches(line) {
                                trace!("selected: {}", String::from_utf8_lossy(line));
                                let mut out = Vec::with_capacity(line.len() + 1);
                                out.extend_from_slice(line);
                                out.push(b'\n');
                                if sender.send(Ok(out)).is_err() {
                                    // Consumer dropped the reader; stop
                                    // producing and release the input.
                                    debug!("output abandoned, stopping producer");
                                    return;
                                }
                            }
                        }
                        Err(e) => {
                            debug!("input read failed: {}", e);
                            let _ = sender.send(Err(e));
                            return;
                        }
                    }
                }
            })?;

        Ok(MatchReader {
            receiver,
            pending: Vec::new(),
            pos: 0,
            done: false,
        })
    }
}

/// Strips the line terminator: one trailing newline, plus a carriage
/// return immediately before it. A bare trailing carriage return at end
/// of input is stripped as well.
fn trim_terminator(buf: &[u8]) -> &[u8] {
    let buf = buf.strip_suffix(b"\n").unwrap_or(buf);
    buf.strip_suffix(b"\r").unwrap_or(buf)
}

/// A single-pass, non-restartable stream of selected lines, each
/// terminated by a newline.
///
/// Reaching the end of the input ends this stream cleanly; an input read
/// error is returned once, after which the stream is at end. Dropping the
/// reader before the end abandons the stream and stops the producer.
#[derive(Debug)]
pub struct MatchReader {
    receiver: Receiver<io::Result<Vec<u8>>>,
    pending: Vec<u8>,
    pos: usize,
    done: bool,
}

impl Read for MatchReader {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.pos < self.pending.len() {
                let n = out.len().min(self.pending.len() - self.pos);
                out[..n].copy_from_slice(&self.pending[self.pos..self.pos + n]);
                self.pos += n;
                return Ok(n);
            }
            if self.done {
                return Ok(0);
            }
            match self.receiver.recv() {
                Ok(Ok(line)) => {
                    self.pending = line;
                    self.pos = 0;
                }
                Ok(Err(e)) => {
                    // Error is surfaced exactly once; further reads see
                    // end of stream.
                    self.done = true;
                    return Err(e);
                }
                Err(_) => {
                    self.done = true;
                    return Ok(0);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::{Duration, Instant};

    fn run(grep: Grep, input: &str) -> String {
        let mut out = String::new();
        grep.filter(Cursor::new(input.as_bytes().to_vec()))
            .unwrap()
            .read_to_string(&mut out)
            .unwrap();
        out
    }

    #[test]
    fn test_basic_filtering() {
        let out = run(Grep::new("foo"), "foo\nbar\nbaz");
        assert_eq!(out, "foo\n");
    }

    #[test]
    fn test_supplies_missing_terminator() {
        let out = run(Grep::new("baz"), "foo\nbaz");
        assert_eq!(out, "baz\n");
    }

    #[test]
    fn test_strips_carriage_return() {
        let out = run(Grep::new("foo"), "foo\r\nbar\r\n");
        assert_eq!(out, "foo\n");
    }

    #[test]
    fn test_compile_failure_before_streaming() {
        struct PanicOnRead;
        impl Read for PanicOnRead {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                panic!("input must not be touched when compilation fails");
            }
        }

        let err = Grep::new("foo(").filter(PanicOnRead).unwrap_err();
        assert!(matches!(err, crate::errors::GrepError::InvalidPattern { .. }));
    }

    #[test]
    fn test_input_error_is_terminal() {
        struct FailAfter(Option<&'static [u8]>);
        impl Read for FailAfter {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                match self.0.take() {
                    Some(bytes) => {
                        buf[..bytes.len()].copy_from_slice(bytes);
                        Ok(bytes.len())
                    }
                    None => Err(io::Error::new(io::ErrorKind::Other, "disk on fire")),
                }
            }
        }

        let mut reader = Grep::new("foo")
            .filter(FailAfter(Some(b"foo\nfoo\n")))
            .unwrap();

        let mut out = Vec::new();
        let err = reader.read_to_end(&mut out).unwrap_err();
        assert_eq!(err.to_string(), "disk on fire");
        // Lines selected before the failure were delivered
        assert_eq!(out, b"foo\nfoo\n");

        // The error is reported once; the stream is then at end
        let mut rest = Vec::new();
        assert_eq!(reader.read_to_end(&mut rest).unwrap(), 0);
    }

    #[test]
    fn test_abandonment_releases_input() {
        static INPUT_DROPPED: AtomicBool = AtomicBool::new(false);

        struct Endless;
        impl Read for Endless {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                let line = b"foo\n";
                buf[..line.len()].copy_from_slice(line);
                Ok(line.len())
            }
        }
        impl Drop for Endless {
            fn drop(&mut self) {
                INPUT_DROPPED.store(true, Ordering::SeqCst);
            }
        }

        let mut reader = Grep::new("foo").filter(Endless).unwrap();
        let mut first = [0u8; 4];
        reader.read_exact(&mut first).unwrap();
        assert_eq!(&first, b"foo\n");
        drop(reader);

        // The producer notices the abandoned channel on its next send and
        // exits, dropping the input.
        let deadline = Instant::now() + Duration::from_secs(5);
        while !INPUT_DROPPED.load(Ordering::SeqCst) {
            assert!(Instant::now() < deadline, "producer did not stop");
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_stage_chaining() {
        let first = Grep::new("foo")
            .filter(Cursor::new(b"foo\nbar\nfoobaz\n".to_vec()))
            .unwrap();
        let mut second = Grep::new("baz").filter(first).unwrap();

        let mut out = String::new();
        second.read_to_string(&mut out).unwrap();
        assert_eq!(out, "foobaz\n");
    }

    #[test]
    fn test_backpressure_does_not_drop_lines() {
        // Far more matching lines than the channel capacity, consumed
        // slowly byte by byte.
        let input: String = (0..10 * LINE_CHANNEL_CAPACITY)
            .map(|i| format!("foo {i}\n"))
            .collect();
        let expected = input.clone();

        let mut reader = Grep::new("foo")
            .filter(Cursor::new(input.into_bytes()))
            .unwrap();

        let mut out = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match reader.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => out.push(byte[0]),
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }
}
