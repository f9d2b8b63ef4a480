//! Output capture for visualization.
//!
//! The audio thread writes each rendered sample into a small ring of
//! atomics; the control side copies it out whenever it wants a picture.
//! Writers never wait and readers may see a block that is partly old and
//! partly new, which is fine for a meter.

use core::sync::atomic::{AtomicI16, AtomicUsize, Ordering};

/// Samples kept in the ring.
pub const CAPTURE_LEN: usize = 256;
/// Bands in a spectrum snapshot.
pub const SPECTRUM_BANDS: usize = 64;
/// Points in a waveform snapshot.
pub const WAVEFORM_POINTS: usize = 128;

/// Band levels are amplified by this before clamping to full scale.
const SPECTRUM_GAIN: f32 = 10.0;

/// Lock-free single-writer ring of recent output samples.
pub struct CaptureRing {
    samples: [AtomicI16; CAPTURE_LEN],
    write: AtomicUsize,
}

impl CaptureRing {
    pub fn new() -> Self {
        Self {
            samples: core::array::from_fn(|_| AtomicI16::new(0)),
            write: AtomicUsize::new(0),
        }
    }

    /// Record one sample. Audio thread only.
    #[inline]
    pub fn push(&self, sample: i16) {
        let pos = self.write.load(Ordering::Relaxed);
        self.samples[pos % CAPTURE_LEN].store(sample, Ordering::Relaxed);
        self.write.store(pos.wrapping_add(1), Ordering::Release);
    }

    /// Copy the ring out, oldest sample first.
    pub fn snapshot(&self) -> [i16; CAPTURE_LEN] {
        let start = self.write.load(Ordering::Acquire);
        core::array::from_fn(|i| {
            self.samples[start.wrapping_add(i) % CAPTURE_LEN].load(Ordering::Relaxed)
        })
    }

    /// Spectrum and waveform of the current contents.
    pub fn visualization(&self) -> Visualization {
        Visualization::from_samples(&self.snapshot())
    }
}

impl Default for CaptureRing {
    fn default() -> Self {
        Self::new()
    }
}

/// Byte-scaled spectrum and waveform for display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Visualization {
    /// Per-band RMS level, 0-255.
    pub spectrum: [u8; SPECTRUM_BANDS],
    /// Decimated waveform, 128 = centre.
    pub waveform: [u8; WAVEFORM_POINTS],
}

impl Visualization {
    /// Compute from a capture snapshot.
    ///
    /// The spectrum is not a transform: each band is the RMS of a
    /// consecutive run of samples, amplified and clamped.
    pub fn from_samples(samples: &[i16; CAPTURE_LEN]) -> Self {
        let band_len = CAPTURE_LEN / SPECTRUM_BANDS;
        let spectrum = core::array::from_fn(|band| {
            let chunk = &samples[band * band_len..(band + 1) * band_len];
            let sum: f32 = chunk
                .iter()
                .map(|&s| {
                    let x = s as f32 / 32768.0;
                    x * x
                })
                .sum();
            let rms = libm::sqrtf(sum / band_len as f32);
            let level = libm::fminf(rms * SPECTRUM_GAIN, 1.0);
            (level * 255.0) as u8
        });

        let stride = CAPTURE_LEN / WAVEFORM_POINTS;
        let waveform = core::array::from_fn(|i| {
            let x = samples[i * stride] as f32 / 32768.0;
            ((x * 0.5 + 0.5) * 255.0) as u8
        });

        Self { spectrum, waveform }
    }

    /// Picture of silence.
    pub fn silent() -> Self {
        Self::from_samples(&[0; CAPTURE_LEN])
    }
}
