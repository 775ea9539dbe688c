//! Audio I/O for the CLI frontend.
//!
//! Streams raw little-endian f32 mono PCM through a tree.

use std::io::{self, Read, Write};

use crate::error::{Result, WdfError};
use crate::tree::WdfTree;

/// Buffer size for audio processing (in samples).
pub const BUFFER_SIZE: usize = 256;

const SAMPLE_BYTES: usize = 4;

/// Reads f32 samples from a byte stream.
pub struct AudioInput<R> {
    reader: R,
    buffer: Vec<u8>,
    /// Bytes of an incomplete sample carried into the next read
    pending: usize,
}

impl AudioInput<io::Stdin> {
    /// Read from stdin.
    pub fn stdin() -> Self {
        Self::new(io::stdin())
    }
}

impl<R: Read> AudioInput<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: vec![0u8; BUFFER_SIZE * SAMPLE_BYTES],
            pending: 0,
        }
    }

    /// Read up to `samples.len()` samples.
    /// Returns the number of samples read, or 0 at end of stream.
    pub fn read_block(&mut self, samples: &mut [f32]) -> Result<usize> {
        let wanted = samples.len().min(BUFFER_SIZE) * SAMPLE_BYTES;
        let mut filled = self.pending;

        while filled < SAMPLE_BYTES && filled < wanted {
            let read = match self.reader.read(&mut self.buffer[filled..wanted]) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(WdfError::AudioInputError {
                        message: e.to_string(),
                    })
                }
            };
            filled += read;
        }

        let count = filled / SAMPLE_BYTES;
        for (sample, bytes) in samples
            .iter_mut()
            .zip(self.buffer[..count * SAMPLE_BYTES].chunks_exact(SAMPLE_BYTES))
        {
            *sample = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        }

        self.pending = filled - count * SAMPLE_BYTES;
        self.buffer.copy_within(count * SAMPLE_BYTES..filled, 0);
        Ok(count)
    }
}

/// Writes f32 samples to a byte stream.
pub struct AudioOutput<W> {
    writer: W,
    buffer: Vec<u8>,
}

impl AudioOutput<io::Stdout> {
    /// Write to stdout.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> AudioOutput<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            buffer: Vec::with_capacity(BUFFER_SIZE * SAMPLE_BYTES),
        }
    }

    /// Write a block of samples.
    pub fn write_block(&mut self, samples: &[f32]) -> Result<()> {
        self.buffer.clear();
        for sample in samples {
            self.buffer.extend_from_slice(&sample.to_le_bytes());
        }
        self.writer
            .write_all(&self.buffer)
            .map_err(|e| WdfError::AudioOutputError {
                message: e.to_string(),
            })
    }

    /// Flush the output stream.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(|e| WdfError::AudioOutputError {
            message: e.to_string(),
        })
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Stream `input` through `tree` into `output` until end of stream.
///
/// Returns the number of samples processed.
pub fn process_stream<R: Read, W: Write>(
    tree: &mut WdfTree,
    input: &mut AudioInput<R>,
    output: &mut AudioOutput<W>,
) -> Result<u64> {
    let mut in_samples = vec![0.0f32; BUFFER_SIZE];
    let mut out_samples = vec![0.0f32; BUFFER_SIZE];
    let mut total = 0u64;

    loop {
        let samples_read = input.read_block(&mut in_samples)?;
        if samples_read == 0 {
            break;
        }

        tree.process_block(&in_samples[..samples_read], &mut out_samples[..samples_read]);
        output.write_block(&out_samples[..samples_read])?;
        total += samples_read as u64;
    }

    output.flush()?;
    Ok(total)
}

/// Process audio from stdin to stdout.
pub fn process_audio(tree: &mut WdfTree) -> Result<u64> {
    process_stream(tree, &mut AudioInput::stdin(), &mut AudioOutput::stdout())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hands out at most `chunk` bytes per read.
    struct Trickle<'a> {
        data: &'a [u8],
        chunk: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.chunk.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    fn encode(samples: &[f32]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn test_read_block_reassembles_split_samples() {
        let samples = [0.5f32, -1.25, 3.0, 1e-3, -0.0];
        let bytes = encode(&samples);
        let mut input = AudioInput::new(Trickle {
            data: &bytes,
            chunk: 3,
        });

        let mut got = Vec::new();
        let mut block = [0.0f32; 4];
        loop {
            let n = input.read_block(&mut block).unwrap();
            if n == 0 {
                break;
            }
            got.extend_from_slice(&block[..n]);
        }
        assert_eq!(got, samples);
    }

    #[test]
    fn test_trailing_partial_sample_dropped() {
        let mut bytes = encode(&[1.0]);
        bytes.extend_from_slice(&[0, 0]);
        let mut input = AudioInput::new(bytes.as_slice());
        let mut block = [0.0f32; 8];
        assert_eq!(input.read_block(&mut block).unwrap(), 1);
        assert_eq!(block[0], 1.0);
        assert_eq!(input.read_block(&mut block).unwrap(), 0);
    }

    #[test]
    fn test_process_stream() {
        let mut tree = WdfTree::from_description(
            "R R1 1k\nR R2 1k\nSER S1 R1 R2\nINV I1 S1\n.root simple I1 vsource\n.input root\n.output voltage R2\n",
        )
        .unwrap();
        let input: Vec<f32> = (0..600).map(|n| (n as f32 * 0.01).sin()).collect();
        let bytes = encode(&input);

        let mut reader = AudioInput::new(bytes.as_slice());
        let mut writer = AudioOutput::new(Vec::new());
        let count = process_stream(&mut tree, &mut reader, &mut writer).unwrap();
        assert_eq!(count, 600);

        let out = writer.into_inner();
        assert_eq!(out.len(), 600 * 4);
        for (x, bytes) in input.iter().zip(out.chunks_exact(4)) {
            let y = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            assert!((y - 0.5 * x).abs() < 1e-6);
        }
    }
}
