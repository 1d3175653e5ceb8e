//! Headerless mono PCM streams (signed 16-bit, little-endian).

use crate::error::{PipelineError, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

/// A stream of samples read in fixed-size requests.
pub trait SampleSource {
    /// Fills `buf` from the stream and returns how many samples were read.
    /// A count below `buf.len()` means the stream has ended.
    fn read_samples(&mut self, buf: &mut [i16]) -> Result<usize>;
}

/// A stream samples are appended to.
pub trait SampleSink {
    fn write_samples(&mut self, samples: &[i16]) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Reads s16le samples from any byte reader.
pub struct PcmReader<R: Read> {
    inner: R,
    bytes: Vec<u8>,
}

impl PcmReader<BufReader<File>> {
    /// Opens a raw PCM file for reading.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read> PcmReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            bytes: Vec::new(),
        }
    }
}

impl<R: Read> SampleSource for PcmReader<R> {
    fn read_samples(&mut self, buf: &mut [i16]) -> Result<usize> {
        self.bytes.resize(buf.len() * 2, 0);

        let mut filled = 0;
        while filled < self.bytes.len() {
            match self.inner.read(&mut self.bytes[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        // A dangling odd byte at end of stream is not a sample
        let count = filled / 2;
        for (sample, pair) in buf.iter_mut().zip(self.bytes[..count * 2].chunks_exact(2)) {
            *sample = i16::from_le_bytes([pair[0], pair[1]]);
        }
        Ok(count)
    }
}

/// Writes s16le samples to any byte writer.
pub struct PcmWriter<W: Write> {
    inner: W,
    bytes: Vec<u8>,
}

impl PcmWriter<BufWriter<File>> {
    /// Creates (or truncates) a raw PCM file for writing.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> PcmWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            bytes: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> SampleSink for PcmWriter<W> {
    fn write_samples(&mut self, samples: &[i16]) -> Result<()> {
        self.bytes.clear();
        for sample in samples {
            self.bytes.extend_from_slice(&sample.to_le_bytes());
        }
        self.inner.write_all(&self.bytes)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

impl SampleSource for &[i16] {
    fn read_samples(&mut self, buf: &mut [i16]) -> Result<usize> {
        let data: &[i16] = *self;
        let n = buf.len().min(data.len());
        let (head, tail) = data.split_at(n);
        buf[..n].copy_from_slice(head);
        *self = tail;
        Ok(n)
    }
}

impl SampleSink for Vec<i16> {
    fn write_samples(&mut self, samples: &[i16]) -> Result<()> {
        self.extend_from_slice(samples);
        Ok(())
    }
}
