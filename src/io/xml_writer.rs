use std::fmt::Display;
use std::io::{self, prelude::*};

use quick_xml::escape::escape;
use thiserror::Error;

use super::sink::CountingSink;

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

#[derive(Debug, Error)]
pub enum XMLWriterError {
    #[error("No element is open")]
    NoOpenElement,
    #[error("Cannot add attribute {0:?}, the start tag is already closed")]
    StartTagClosed(String),
    #[error("An IO error occurred: {0}")]
    IOError(
        #[from]
        #[source]
        io::Error,
    ),
}

pub type XMLResult<T> = Result<T, XMLWriterError>;

/**
A stack-based XML element writer over a [`CountingSink`].

Elements are opened with [`XMLElementWriter::open`], which leaves the start tag
open so attributes can be appended, and closed in reverse order with
[`XMLElementWriter::close`]. Each `open` returns the logical byte offset of the
element's `<`, which stays a valid index target when the sink compresses.

Indentation is one space per nesting level below the root. When
`condense_attributes` is off, every attribute after the first goes on its own line.
*/
#[derive(Debug)]
pub struct XMLElementWriter<W: Write> {
    sink: CountingSink<W>,
    tags: Vec<String>,
    indent: usize,
    tag_open: bool,
    has_attributes: bool,
    has_data: bool,
    pub condense_attributes: bool,
}

impl<W: Write> XMLElementWriter<W> {
    pub fn new(sink: CountingSink<W>) -> Self {
        Self {
            sink,
            tags: Vec::new(),
            indent: 0,
            tag_open: false,
            has_attributes: false,
            has_data: false,
            condense_attributes: false,
        }
    }

    /// The number of uncompressed bytes written so far
    pub fn position(&self) -> u64 {
        self.sink.logical_position()
    }

    /// The number of currently open elements
    pub fn depth(&self) -> usize {
        self.tags.len()
    }

    pub fn current_element(&self) -> Option<&str> {
        self.tags.last().map(|s| s.as_str())
    }

    pub fn sink(&self) -> &CountingSink<W> {
        &self.sink
    }

    pub fn write_declaration(&mut self) -> XMLResult<()> {
        self.sink.write_all(XML_DECLARATION.as_bytes())?;
        Ok(())
    }

    fn write_indent(&mut self) -> io::Result<()> {
        for _ in 1..self.indent {
            self.sink.write_all(b" ")?;
        }
        Ok(())
    }

    fn close_start_tag(&mut self) -> io::Result<()> {
        if self.tag_open {
            if self.has_attributes {
                self.sink.write_all(b" ")?;
            }
            self.sink.write_all(b">")?;
            self.tag_open = false;
        }
        Ok(())
    }

    /// Open a new element named `name` as a child of the current element, returning the
    /// logical offset of its `<`
    pub fn open(&mut self, name: &str) -> XMLResult<u64> {
        self.close_start_tag()?;
        if !self.tags.is_empty() {
            self.sink.write_all(b"\n")?;
        }
        self.tags.push(name.to_string());
        self.indent += 1;
        self.write_indent()?;
        let offset = self.position();
        self.sink.write_all(b"<")?;
        self.sink.write_all(name.as_bytes())?;
        self.tag_open = true;
        self.has_attributes = false;
        self.has_data = false;
        Ok(offset)
    }

    /// Append an attribute to the still-open start tag of the current element
    pub fn attr<V: Display>(&mut self, key: &str, value: V) -> XMLResult<()> {
        if self.tags.is_empty() {
            return Err(XMLWriterError::NoOpenElement);
        }
        if !self.tag_open {
            return Err(XMLWriterError::StartTagClosed(key.to_string()));
        }
        if self.has_attributes && !self.condense_attributes {
            self.sink.write_all(b"\n")?;
            self.write_indent()?;
        }
        let value = value.to_string();
        write!(self.sink, " {}=\"{}\"", key, escape(value.as_str()))?;
        self.has_attributes = true;
        Ok(())
    }

    /// Close the start tag of the current element without adding attributes
    pub fn no_attr(&mut self) -> XMLResult<()> {
        if self.tags.is_empty() {
            return Err(XMLWriterError::NoOpenElement);
        }
        self.close_start_tag()?;
        Ok(())
    }

    /// Write `text` as the content of the current element
    pub fn data<V: Display>(&mut self, text: V) -> XMLResult<()> {
        if self.tags.is_empty() {
            return Err(XMLWriterError::NoOpenElement);
        }
        self.close_start_tag()?;
        let text = text.to_string();
        self.sink.write_all(escape(text.as_str()).as_bytes())?;
        self.has_data = true;
        Ok(())
    }

    /// Close the current element, self-closing it if nothing was written inside it
    pub fn close(&mut self) -> XMLResult<()> {
        let name = self.tags.pop().ok_or(XMLWriterError::NoOpenElement)?;
        if self.tag_open {
            self.sink.write_all(b" />")?;
        } else {
            if !self.has_data {
                self.sink.write_all(b"\n")?;
                self.write_indent()?;
            }
            write!(self.sink, "</{name}>")?;
        }
        self.tag_open = false;
        self.has_attributes = false;
        self.has_data = false;
        self.indent = self.indent.saturating_sub(1);
        if self.tags.is_empty() {
            self.sink.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Close every open element
    pub fn close_all(&mut self) -> XMLResult<()> {
        while !self.tags.is_empty() {
            self.close()?;
        }
        Ok(())
    }

    /// Open `name`, write `text` inside it and close it
    pub fn element<V: Display>(&mut self, name: &str, text: V) -> XMLResult<u64> {
        let offset = self.open(name)?;
        self.data(text)?;
        self.close()?;
        Ok(offset)
    }

    /// Push buffered bytes through to the underlying writer
    pub fn flush(&mut self) -> XMLResult<()> {
        self.sink.flush()?;
        Ok(())
    }

    /// The SHA-1 digest of the uncompressed bytes written so far
    pub fn hexdigest(&self) -> String {
        self.sink.hexdigest()
    }

    /// Close any open elements and release the sink
    pub fn finish(mut self) -> XMLResult<W> {
        self.close_all()?;
        Ok(self.sink.finish()?)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn writer() -> XMLElementWriter<Vec<u8>> {
        XMLElementWriter::new(CountingSink::new(Vec::new()))
    }

    fn text(writer: XMLElementWriter<Vec<u8>>) -> String {
        String::from_utf8(writer.finish().unwrap()).unwrap()
    }

    #[test_log::test]
    fn test_nesting_and_offsets() -> XMLResult<()> {
        let mut w = writer();
        w.write_declaration()?;
        let root = w.open("msRun")?;
        w.attr("scanCount", 2)?;
        let first = w.open("scan")?;
        w.attr("num", 1)?;
        w.attr("msLevel", 1)?;
        w.close()?;
        let second = w.open("scan")?;
        w.no_attr()?;
        w.element("peaks", "AAAA")?;
        w.close()?;
        w.close()?;
        let out = text(w);
        assert_eq!(
            out,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <msRun scanCount=\"2\" >\n \
             <scan num=\"1\"\n  msLevel=\"1\" />\n \
             <scan>\n  <peaks>AAAA</peaks>\n </scan>\n</msRun>\n"
        );
        for offset in [root, first, second] {
            assert_eq!(out.as_bytes()[offset as usize], b'<');
        }
        assert_eq!(&out[first as usize..first as usize + 5], "<scan");
        Ok(())
    }

    #[test_log::test]
    fn test_condensed_and_escaped() -> XMLResult<()> {
        let mut w = writer();
        w.condense_attributes = true;
        w.open("parentFile")?;
        w.attr("fileName", "a&b<c>.raw")?;
        w.attr("fileType", "RAWData")?;
        w.close()?;
        assert_eq!(
            text(w),
            "<parentFile fileName=\"a&amp;b&lt;c&gt;.raw\" fileType=\"RAWData\" />\n"
        );
        Ok(())
    }

    #[test_log::test]
    fn test_misuse() -> XMLResult<()> {
        let mut w = writer();
        assert!(matches!(w.close(), Err(XMLWriterError::NoOpenElement)));
        assert!(matches!(w.attr("a", 1), Err(XMLWriterError::NoOpenElement)));
        w.open("sha1")?;
        w.data("x")?;
        assert!(matches!(
            w.attr("late", 1),
            Err(XMLWriterError::StartTagClosed(_))
        ));
        w.close_all()?;
        assert_eq!(w.depth(), 0);
        Ok(())
    }

    fn write_index<W: Write>(w: &mut XMLElementWriter<W>) -> XMLResult<Vec<u64>> {
        let mut offsets = Vec::new();
        w.open("index")?;
        for i in 0..10 {
            offsets.push(w.open("offset")?);
            w.attr("id", i)?;
            w.data(i * 100)?;
            w.close()?;
        }
        w.close()?;
        Ok(offsets)
    }

    #[test_log::test]
    fn test_gzip_offsets_are_logical() -> XMLResult<()> {
        let mut plain = writer();
        let mut gz = XMLElementWriter::new(CountingSink::new_gzipped(Vec::new()));
        assert_eq!(write_index(&mut plain)?, write_index(&mut gz)?);
        assert_eq!(plain.position(), gz.position());
        assert_eq!(plain.hexdigest(), gz.hexdigest());
        Ok(())
    }
}
