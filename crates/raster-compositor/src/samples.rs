//! Typed sample buffers and linear rescaling to 8 bits.

use num_traits::{Bounded, ToPrimitive};

use crate::container::PixelWindow;

/// Numeric type of raw raster samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F32,
    F64,
}

fn bounds<T: Bounded + ToPrimitive>() -> (f64, f64) {
    (
        T::min_value().to_f64().unwrap_or(0.0),
        T::max_value().to_f64().unwrap_or(0.0),
    )
}

impl SampleType {
    /// Default min/max used for rescaling when a source does not declare one.
    ///
    /// Floating point samples are assumed to already be in 0..1.
    pub fn natural_range(&self) -> (f64, f64) {
        match self {
            SampleType::U8 => bounds::<u8>(),
            SampleType::I8 => bounds::<i8>(),
            SampleType::U16 => bounds::<u16>(),
            SampleType::I16 => bounds::<i16>(),
            SampleType::U32 => bounds::<u32>(),
            SampleType::I32 => bounds::<i32>(),
            SampleType::F32 | SampleType::F64 => (0.0, 1.0),
        }
    }

    pub fn bytes_per_sample(&self) -> usize {
        match self {
            SampleType::U8 | SampleType::I8 => 1,
            SampleType::U16 | SampleType::I16 => 2,
            SampleType::U32 | SampleType::I32 | SampleType::F32 => 4,
            SampleType::F64 => 8,
        }
    }
}

/// Samples of one band, row-major.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleBuffer {
    U8(Vec<u8>),
    I8(Vec<i8>),
    U16(Vec<u16>),
    I16(Vec<i16>),
    U32(Vec<u32>),
    I32(Vec<i32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

macro_rules! each_variant {
    ($buf:expr, $v:ident => $body:expr) => {
        match $buf {
            SampleBuffer::U8($v) => $body,
            SampleBuffer::I8($v) => $body,
            SampleBuffer::U16($v) => $body,
            SampleBuffer::I16($v) => $body,
            SampleBuffer::U32($v) => $body,
            SampleBuffer::I32($v) => $body,
            SampleBuffer::F32($v) => $body,
            SampleBuffer::F64($v) => $body,
        }
    };
}

macro_rules! map_variant {
    ($buf:expr, $v:ident => $body:expr) => {
        match $buf {
            SampleBuffer::U8($v) => SampleBuffer::U8($body),
            SampleBuffer::I8($v) => SampleBuffer::I8($body),
            SampleBuffer::U16($v) => SampleBuffer::U16($body),
            SampleBuffer::I16($v) => SampleBuffer::I16($body),
            SampleBuffer::U32($v) => SampleBuffer::U32($body),
            SampleBuffer::I32($v) => SampleBuffer::I32($body),
            SampleBuffer::F32($v) => SampleBuffer::F32($body),
            SampleBuffer::F64($v) => SampleBuffer::F64($body),
        }
    };
}

impl SampleBuffer {
    /// A zero-filled buffer of the given type.
    pub fn zeroed(sample_type: SampleType, len: usize) -> Self {
        match sample_type {
            SampleType::U8 => SampleBuffer::U8(vec![0; len]),
            SampleType::I8 => SampleBuffer::I8(vec![0; len]),
            SampleType::U16 => SampleBuffer::U16(vec![0; len]),
            SampleType::I16 => SampleBuffer::I16(vec![0; len]),
            SampleType::U32 => SampleBuffer::U32(vec![0; len]),
            SampleType::I32 => SampleBuffer::I32(vec![0; len]),
            SampleType::F32 => SampleBuffer::F32(vec![0.0; len]),
            SampleType::F64 => SampleBuffer::F64(vec![0.0; len]),
        }
    }

    pub fn sample_type(&self) -> SampleType {
        match self {
            SampleBuffer::U8(_) => SampleType::U8,
            SampleBuffer::I8(_) => SampleType::I8,
            SampleBuffer::U16(_) => SampleType::U16,
            SampleBuffer::I16(_) => SampleType::I16,
            SampleBuffer::U32(_) => SampleType::U32,
            SampleBuffer::I32(_) => SampleType::I32,
            SampleBuffer::F32(_) => SampleType::F32,
            SampleBuffer::F64(_) => SampleType::F64,
        }
    }

    pub fn len(&self) -> usize {
        each_variant!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample `index` widened to f64.
    pub fn value(&self, index: usize) -> f64 {
        each_variant!(self, v => v.get(index).and_then(|s| s.to_f64()).unwrap_or(0.0))
    }

    /// Cut `window` out of a `width` x `height` band.
    ///
    /// Pixels of the window that fall outside the band are zero.
    pub fn window(&self, width: u32, height: u32, window: PixelWindow) -> SampleBuffer {
        let out_width = window.width() as usize;
        let out_len = window.pixel_count();

        map_variant!(self, v => {
            let mut out = vec![Default::default(); out_len];
            for row in window.top..window.bottom.min(height) {
                let out_row = (row - window.top) as usize;
                for col in window.left..window.right.min(width) {
                    let out_col = (col - window.left) as usize;
                    out[out_row * out_width + out_col] = v[row as usize * width as usize + col as usize];
                }
            }
            out
        })
    }
}

/// Linear mapping from a raw value range onto 0..255.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rescale {
    pub gain: f64,
    pub bias: f64,
}

impl Rescale {
    /// Map `min` to 0 and `max` to 255.
    pub fn from_range(min: f64, max: f64) -> Self {
        let gain = 255.0 / (max - min);
        Self {
            gain,
            bias: -min * gain,
        }
    }

    /// Raw values passed through unchanged.
    pub fn identity() -> Self {
        Self {
            gain: 1.0,
            bias: 0.0,
        }
    }

    /// Apply the mapping, truncating toward zero and saturating at 0 and 255.
    /// NaN maps to 0.
    pub fn apply(&self, raw: f64) -> u8 {
        (raw * self.gain + self.bias) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_ranges() {
        assert_eq!(SampleType::U8.natural_range(), (0.0, 255.0));
        assert_eq!(SampleType::I8.natural_range(), (-128.0, 127.0));
        assert_eq!(SampleType::U16.natural_range(), (0.0, 65535.0));
        assert_eq!(SampleType::I16.natural_range(), (-32768.0, 32767.0));
        assert_eq!(SampleType::F32.natural_range(), (0.0, 1.0));
    }

    #[test]
    fn test_rescale_identity_for_u8() {
        let (min, max) = SampleType::U8.natural_range();
        let rescale = Rescale::from_range(min, max);
        assert_eq!(rescale.apply(128.0), 128);
        assert_eq!(rescale.apply(0.0), 0);
        assert_eq!(rescale.apply(255.0), 255);
    }

    #[test]
    fn test_rescale_saturates() {
        let rescale = Rescale::from_range(100.0, 200.0);
        assert_eq!(rescale.apply(0.0), 0);
        assert_eq!(rescale.apply(150.0), 127);
        assert_eq!(rescale.apply(1000.0), 255);
        assert_eq!(rescale.apply(f64::NAN), 0);
    }

    #[test]
    fn test_rescale_u16() {
        let rescale = Rescale::from_range(0.0, 65535.0);
        assert_eq!(rescale.apply(0.0), 0);
        assert_eq!(rescale.apply(32768.0), 127);
        assert!(rescale.apply(65535.0) >= 254);
    }

    #[test]
    fn test_value_widening() {
        let buf = SampleBuffer::I16(vec![-5, 7]);
        assert_eq!(buf.value(0), -5.0);
        assert_eq!(buf.value(1), 7.0);
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.sample_type(), SampleType::I16);
    }

    #[test]
    fn test_window_zero_fills_past_edge() {
        // 3x2 band
        let band = SampleBuffer::U8(vec![1, 2, 3, 4, 5, 6]);
        let window = PixelWindow::new(1, 0, 3, 3);
        let out = band.window(3, 2, window);
        assert_eq!(out, SampleBuffer::U8(vec![2, 3, 0, 5, 6, 0, 0, 0, 0]));
    }
}
