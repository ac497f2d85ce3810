use std::io::{
  self,
  Write,
};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
  DocumentStart,
  StartObject,
  ObjectPropertyName,
  ObjectPropertyValue,
  StartArray,
  MiddleArray,
}

/// A state-driven emitter for the structured textual record format, with
/// optional indentation and "packing" (suppressing the newline/indent that
/// would otherwise separate sibling values, so a short tuple renders on one
/// line).
pub struct Writer<W> {
  stream: W,
  mode: Mode,
  mode_stack: Vec<Mode>,
  indent: usize,
  pack: usize,
  indenting: bool,
}

impl<W: Write> Writer<W> {
  /// Wrap an output stream. `indent` enables pretty-printing with two
  /// spaces per nesting level; when disabled the record is emitted on a
  /// single line with `, ` / `: ` separators.
  pub fn new(stream: W, indent: bool) -> Self {
    Self {
      stream,
      mode: Mode::DocumentStart,
      mode_stack: Vec::new(),
      indent: 0,
      pack: 0,
      indenting: indent,
    }
  }

  /// Flush the underlying stream.
  pub fn flush(&mut self) -> io::Result<()> {
    self.stream.flush()
  }

  /// Unwrap the writer, returning the underlying stream.
  pub fn into_inner(self) -> W {
    self.stream
  }

  /// Suppress newline/indentation for sibling values until the matching
  /// [`Writer::end_pack`]. Calls nest.
  pub fn begin_pack(&mut self) {
    self.pack += 1;
  }

  /// Match a prior [`Writer::begin_pack`].
  pub fn end_pack(&mut self) {
    self.pack -= 1;
  }

  fn should_indent(&self) -> bool {
    self.indenting
  }

  fn begin_new_line_if_necessary(&mut self) -> io::Result<()> {
    if self.should_indent() && self.pack == 0 {
      write!(self.stream, "\n{:width$}", "", width = self.indent * 2)?;
    }
    Ok(())
  }

  fn begin_value(&mut self) -> io::Result<()> {
    match self.mode {
      Mode::ObjectPropertyValue => {
        self.mode = Mode::ObjectPropertyName;
      }
      Mode::MiddleArray => {
        write!(self.stream, ",")?;
        if self.should_indent() && self.pack > 0 {
          write!(self.stream, " ")?;
        }
        self.begin_new_line_if_necessary()?;
      }
      Mode::StartArray => {
        self.mode = Mode::MiddleArray;
        self.begin_new_line_if_necessary()?;
      }
      _ => {}
    }
    Ok(())
  }

  /// Begin writing a `[`-delimited array.
  pub fn begin_array(&mut self) -> io::Result<()> {
    self.begin_value()?;
    write!(self.stream, "[")?;
    self.mode_stack.push(self.mode);
    self.mode = Mode::StartArray;
    self.indent += 1;
    Ok(())
  }

  /// Close the innermost open array.
  pub fn end_array(&mut self) -> io::Result<()> {
    self.indent -= 1;
    if self.mode != Mode::StartArray {
      self.begin_new_line_if_necessary()?;
    }
    write!(self.stream, "]")?;
    self.mode = self.mode_stack.pop().unwrap_or(Mode::DocumentStart);
    Ok(())
  }

  /// Begin writing a `{`-delimited object.
  pub fn begin_object(&mut self) -> io::Result<()> {
    self.begin_value()?;
    write!(self.stream, "{{")?;
    self.mode_stack.push(self.mode);
    self.mode = Mode::StartObject;
    self.indent += 1;
    Ok(())
  }

  /// Close the innermost open object.
  pub fn end_object(&mut self) -> io::Result<()> {
    self.indent -= 1;
    if self.mode != Mode::StartObject {
      self.begin_new_line_if_necessary()?;
    }
    write!(self.stream, "}}")?;
    self.mode = self.mode_stack.pop().unwrap_or(Mode::DocumentStart);
    Ok(())
  }

  /// Write an object key. Only valid directly after [`Writer::begin_object`]
  /// or after a sibling value.
  pub fn write_property_name(&mut self, name: &str) -> io::Result<()> {
    debug_assert!(matches!(self.mode, Mode::StartObject | Mode::ObjectPropertyName));
    if self.mode != Mode::StartObject {
      write!(self.stream, ",")?;
      if self.should_indent() && self.pack > 0 {
        write!(self.stream, " ")?;
      }
    }
    self.begin_new_line_if_necessary()?;
    self.write_raw_string(name)?;
    write!(self.stream, ":")?;
    if self.should_indent() {
      write!(self.stream, " ")?;
    }
    self.mode = Mode::ObjectPropertyValue;
    Ok(())
  }

  /// Write a string value.
  pub fn write_string(&mut self, value: &str) -> io::Result<()> {
    self.begin_value()?;
    self.write_raw_string(value)
  }

  fn write_raw_string(&mut self, value: &str) -> io::Result<()> {
    write!(self.stream, "\"")?;
    for byte in value.bytes() {
      match byte {
        b'"' | b'\\' => {
          write!(self.stream, "\\{}", byte as char)?;
        }
        0x08 => write!(self.stream, "\\b")?,
        0x09 => write!(self.stream, "\\t")?,
        0x0a => write!(self.stream, "\\n")?,
        0x0c => write!(self.stream, "\\f")?,
        0x0d => write!(self.stream, "\\r")?,
        b if b < 0x20 => write!(self.stream, "\\u00{:02x}", b)?,
        b => self.stream.write_all(&[b])?,
      }
    }
    write!(self.stream, "\"")
  }

  /// Write an integer value.
  pub fn write_integer(&mut self, value: i64) -> io::Result<()> {
    self.begin_value()?;
    write!(self.stream, "{value}")
  }

  /// Write a boolean value.
  pub fn write_boolean(&mut self, value: bool) -> io::Result<()> {
    self.begin_value()?;
    write!(self.stream, "{value}")
  }

  /// Write `null`.
  pub fn write_null(&mut self) -> io::Result<()> {
    self.begin_value()?;
    write!(self.stream, "null")
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;
  use test_log::test;

  use super::Writer;

  fn written(f: impl FnOnce(&mut Writer<Vec<u8>>) -> std::io::Result<()>) -> String {
    let mut writer = Writer::new(Vec::new(), false);
    f(&mut writer).unwrap();
    String::from_utf8(writer.stream).unwrap()
  }

  #[test]
  fn flat_object() {
    let out = written(|w| {
      w.begin_object()?;
      w.write_property_name("a")?;
      w.write_integer(1)?;
      w.write_property_name("b")?;
      w.write_string("x")?;
      w.end_object()
    });
    assert_eq!(out, r#"{"a":1,"b":"x"}"#);
  }

  #[test]
  fn packed_tuple_has_no_inner_breaks() {
    let out = written(|w| {
      w.begin_array()?;
      w.begin_pack();
      w.write_string("maxSegmentSize")?;
      w.write_integer(1460)?;
      w.end_pack();
      w.end_array()
    });
    assert_eq!(out, r#"["maxSegmentSize",1460]"#);
  }

  #[test]
  fn escapes_control_bytes() {
    let out = written(|w| w.write_string("a\tb\nc\u{1}"));
    assert_eq!(out, "\"a\\tb\\nc\\u0001\"");
  }

  #[test]
  fn indented_object_breaks_lines() {
    let mut writer = Writer::new(Vec::new(), true);
    writer.begin_object().unwrap();
    writer.write_property_name("a").unwrap();
    writer.write_integer(1).unwrap();
    writer.end_object().unwrap();
    let out = String::from_utf8(writer.stream).unwrap();
    assert_eq!(out, "{\n  \"a\": 1\n}");
  }
}
