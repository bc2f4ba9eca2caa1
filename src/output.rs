use std::io::{Error as IOError, Write};

/// Sink for rendered template text.
pub trait Output {
    fn write(&mut self, seg: &str) -> Result<(), IOError>;
}

pub struct WriteOutput<W: Write> {
    write: W,
}

impl<W: Write> Output for WriteOutput<W> {
    fn write(&mut self, seg: &str) -> Result<(), IOError> {
        self.write.write_all(seg.as_bytes())
    }
}

impl<W: Write> WriteOutput<W> {
    pub fn new(write: W) -> WriteOutput<W> {
        WriteOutput { write }
    }

    pub fn into_inner(self) -> W {
        self.write
    }
}

#[derive(Debug, Default)]
pub struct StringOutput {
    buf: String,
}

impl Output for StringOutput {
    fn write(&mut self, seg: &str) -> Result<(), IOError> {
        self.buf.push_str(seg);
        Ok(())
    }
}

impl StringOutput {
    pub fn new() -> StringOutput {
        StringOutput {
            buf: String::with_capacity(8 * 1024),
        }
    }

    pub fn into_string(self) -> String {
        self.buf
    }
}
