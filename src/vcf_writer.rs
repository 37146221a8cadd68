//! Output VCF sink, owned by the driver thread.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::Result;

/// Buffered VCF writer; gzip-compresses when the path ends in `.gz`.
pub struct VcfWriter {
    out: Box<dyn Write + Send>,
}

impl VcfWriter {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)?;
        let out: Box<dyn Write + Send> = if path.extension().and_then(|e| e.to_str()) == Some("gz")
        {
            Box::new(BufWriter::new(GzEncoder::new(file, Compression::default())))
        } else {
            Box::new(BufWriter::new(file))
        };
        Ok(VcfWriter { out })
    }

    /// In-memory writer for tests.
    #[cfg(test)]
    pub(crate) fn sink(buffer: Vec<u8>) -> (Self, std::sync::Arc<std::sync::Mutex<Vec<u8>>>) {
        use std::sync::{Arc, Mutex};

        struct Shared(Arc<Mutex<Vec<u8>>>);
        impl Write for Shared {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let shared = Arc::new(Mutex::new(buffer));
        (
            VcfWriter {
                out: Box::new(Shared(Arc::clone(&shared))),
            },
            shared,
        )
    }

    pub fn write_header(&mut self, header: &str) -> Result<()> {
        self.out.write_all(header.as_bytes())?;
        Ok(())
    }

    /// Write one record; the trailing newline is appended here.
    pub fn write_record(&mut self, record: &str) -> Result<()> {
        self.out.write_all(record.as_bytes())?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_are_newline_terminated() {
        let (mut writer, buffer) = VcfWriter::sink(Vec::new());
        writer.write_header("##fileformat=VCFv4.2\n").unwrap();
        writer.write_record("chr1\t1\t.\tA\tT").unwrap();
        writer.flush().unwrap();

        let text = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert_eq!(text, "##fileformat=VCFv4.2\nchr1\t1\t.\tA\tT\n");
    }
}
