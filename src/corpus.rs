use std::cell::RefCell;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::rc::Rc;

/// Opens one input stream; `-` means stdin.
pub(crate) fn open_input(path: &str) -> io::Result<Box<dyn BufRead>> {
    Ok(match path {
        "-" => Box::new(BufReader::new(io::stdin())),
        path => Box::new(BufReader::new(File::open(path)?)),
    })
}

/// Opens the output streams; `-` means stdout. Every `-` position shares one
/// buffered handle so multi-column writes to stdout stay row-ordered instead
/// of interleaving at buffer-flush boundaries.
pub(crate) fn open_outputs(paths: &[String]) -> io::Result<Vec<Box<dyn Write>>> {
    let stdout = Rc::new(RefCell::new(BufWriter::new(io::stdout())));
    paths
        .iter()
        .map(|path| {
            Ok(match path.as_str() {
                "-" => Box::new(SharedWriter(Rc::clone(&stdout))) as Box<dyn Write>,
                path => Box::new(BufWriter::new(File::create(path)?)),
            })
        })
        .collect()
}

/// Writer handle over a stream owned jointly with other handles.
pub(crate) struct SharedWriter<W>(Rc<RefCell<W>>);

impl<W: Write> Write for SharedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.borrow_mut().flush()
    }
}

/// Line iterator that replaces malformed UTF-8 with U+FFFD instead of failing
/// and strips `\n` / `\r\n` terminators.
pub(crate) struct LossyLines<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead> LossyLines<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }
}

impl<R: BufRead> Iterator for LossyLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                if self.buf.last() == Some(&b'\n') {
                    self.buf.pop();
                    if self.buf.last() == Some(&b'\r') {
                        self.buf.pop();
                    }
                }
                Some(Ok(String::from_utf8_lossy(&self.buf).into_owned()))
            }
            Err(err) => Some(Err(err)),
        }
    }
}

/// Zips N parallel line streams into rows; ends at the shortest file.
pub(crate) struct RowReader {
    readers: Vec<LossyLines<Box<dyn BufRead>>>,
}

impl RowReader {
    pub(crate) fn new(readers: Vec<Box<dyn BufRead>>) -> Self {
        Self {
            readers: readers.into_iter().map(LossyLines::new).collect(),
        }
    }
}

impl Iterator for RowReader {
    type Item = io::Result<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.readers.is_empty() {
            return None;
        }
        let mut row = Vec::with_capacity(self.readers.len());
        for reader in &mut self.readers {
            match reader.next()? {
                Ok(line) => row.push(line),
                Err(err) => return Some(Err(err)),
            }
        }
        Some(Ok(row))
    }
}
