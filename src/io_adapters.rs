use std::cell::RefCell;
use std::io::{Result as IoResult, Write};
use std::rc::Rc;

/// Bytes written through a [`MemWriter`], readable while the writer lives on
/// inside an interpreter.
pub type SharedBuffer = Rc<RefCell<Vec<u8>>>;

/// Memory-backed sink for reports and builtin output.
///
/// Hand the writer to [`Interpreter::with_output`](crate::Interpreter::with_output)
/// or a builtin and keep the handle to inspect what was written.
#[derive(Default)]
pub struct MemWriter {
    buf: SharedBuffer,
}

impl MemWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a writer together with a handle to its buffer.
    pub fn with_handle() -> (Self, SharedBuffer) {
        let writer = MemWriter::new();
        let handle = writer.buf.clone();
        (writer, handle)
    }

    /// Everything written so far, decoded lossily.
    pub fn contents(buf: &SharedBuffer) -> String {
        String::from_utf8_lossy(&buf.borrow()).into_owned()
    }
}

impl Write for MemWriter {
    fn write(&mut self, data: &[u8]) -> IoResult<usize> {
        self.buf.borrow_mut().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> IoResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_sees_writes() {
        let (mut writer, handle) = MemWriter::with_handle();
        write!(writer, "line {}", 1).unwrap();
        writeln!(writer, "!").unwrap();
        assert_eq!(MemWriter::contents(&handle), "line 1!\n");
    }
}
