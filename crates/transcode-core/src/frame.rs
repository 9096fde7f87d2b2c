//! Fixed-size framing of PCM buffers
//!
//! The perceptual codec only accepts whole frames of one configured length.
//! [`FrameChunker::split`] cuts a PCM buffer into such frames and
//! [`join`] concatenates decoded frames back into one buffer.
//!
//! Full frames are borrowed straight out of the caller's buffer; the only
//! allocation happens for a zero-padded tail under
//! [`RemainderPolicy::PadWithSilence`].

use crate::error::{Result, TranscodeError};
use crate::types::FrameDuration;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::iter::FusedIterator;
use std::slice::ChunksExact;

/// What to do with samples that do not fill a whole frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemainderPolicy {
    /// Discard the trailing partial frame
    #[default]
    Drop,
    /// Emit the trailing samples as one extra frame padded with zeros
    PadWithSilence,
}

/// Splits PCM into frames of a fixed interleaved length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameChunker {
    frame_len: usize,
    policy: RemainderPolicy,
}

impl FrameChunker {
    /// Create a chunker for frames of `frame_len` interleaved samples
    pub fn new(frame_len: usize, policy: RemainderPolicy) -> Result<Self> {
        if frame_len == 0 {
            return Err(TranscodeError::invalid_config(
                "frame length must be at least one sample",
            ));
        }

        Ok(Self { frame_len, policy })
    }

    /// Create a chunker for one frame duration of interleaved audio
    pub fn for_format(
        sample_rate: u32,
        channels: u8,
        duration: FrameDuration,
        policy: RemainderPolicy,
    ) -> Result<Self> {
        let frame_len = duration.samples_per_channel(sample_rate) * usize::from(channels);
        Self::new(frame_len, policy)
    }

    /// Interleaved samples per frame
    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// Configured remainder policy
    pub fn policy(&self) -> RemainderPolicy {
        self.policy
    }

    /// Number of frames `split` yields for a buffer of `len` samples
    pub fn frame_count(&self, len: usize) -> usize {
        let full = len / self.frame_len;
        match self.policy {
            RemainderPolicy::PadWithSilence if self.remainder(len) > 0 => full + 1,
            _ => full,
        }
    }

    /// Samples left over after the last full frame
    pub fn remainder(&self, len: usize) -> usize {
        len % self.frame_len
    }

    /// Split `pcm` into frames, in order
    pub fn split<'a>(&self, pcm: &'a [i16]) -> Frames<'a> {
        let chunks = pcm.chunks_exact(self.frame_len);
        let tail = match self.policy {
            RemainderPolicy::PadWithSilence if !chunks.remainder().is_empty() => {
                Some(chunks.remainder())
            }
            _ => None,
        };

        Frames {
            chunks,
            tail,
            frame_len: self.frame_len,
        }
    }
}

/// Iterator over the frames of one buffer
#[derive(Debug, Clone)]
pub struct Frames<'a> {
    chunks: ChunksExact<'a, i16>,
    tail: Option<&'a [i16]>,
    frame_len: usize,
}

impl<'a> Iterator for Frames<'a> {
    type Item = Cow<'a, [i16]>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(frame) = self.chunks.next() {
            return Some(Cow::Borrowed(frame));
        }

        self.tail.take().map(|tail| {
            let mut padded = Vec::with_capacity(self.frame_len);
            padded.extend_from_slice(tail);
            padded.resize(self.frame_len, 0);
            Cow::Owned(padded)
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.chunks.len() + usize::from(self.tail.is_some());
        (len, Some(len))
    }
}

impl ExactSizeIterator for Frames<'_> {}

impl FusedIterator for Frames<'_> {}

/// Concatenate frames in arrival order
pub fn join<I, F>(frames: I) -> Vec<i16>
where
    I: IntoIterator<Item = F>,
    F: AsRef<[i16]>,
{
    let mut pcm = Vec::new();
    join_into(frames, &mut pcm);
    pcm
}

/// Append frames to `pcm` in arrival order
pub fn join_into<I, F>(frames: I, pcm: &mut Vec<i16>)
where
    I: IntoIterator<Item = F>,
    F: AsRef<[i16]>,
{
    for frame in frames {
        pcm.extend_from_slice(frame.as_ref());
    }
}
