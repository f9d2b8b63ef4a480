//! Sample buffer handle.

use alloc::sync::Arc;
use alloc::vec::Vec;
use arrayvec::ArrayString;

/// Signed 16-bit mono PCM, shared between the sample store and the voices
/// that play it.
///
/// Cloning is a reference-count bump. The engine keeps a clone per
/// registered pad and never drops the last one on the audio thread: a
/// replaced buffer is handed back to the caller.
#[derive(Clone, Debug)]
pub struct SampleBuffer {
    /// Display name (file stem), truncated to 32 bytes.
    pub name: ArrayString<32>,
    data: Arc<[i16]>,
}

impl SampleBuffer {
    /// Wrap decoded PCM.
    pub fn new(name: &str, data: Vec<i16>) -> Self {
        let mut label = ArrayString::new();
        for ch in name.chars() {
            if label.try_push(ch).is_err() {
                break;
            }
        }
        Self {
            name: label,
            data: data.into(),
        }
    }

    /// The PCM samples.
    pub fn data(&self) -> &[i16] {
        &self.data
    }

    /// Length in samples.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the buffer holds no samples.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True if both handles point at the same PCM.
    pub fn same_data(&self, other: &SampleBuffer) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}
