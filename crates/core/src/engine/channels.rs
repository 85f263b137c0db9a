//! Channel count conversion on interleaved samples.

/// How frames are remapped from `from` to `to` channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChannelMap {
    Identity,
    /// Average all channels into one.
    Downmix,
    /// Copy the single channel everywhere.
    Duplicate,
    /// Average even channels into left and odd channels into right.
    FoldToStereo,
    /// Copy the shared channels and zero the rest.
    Truncate,
}

impl ChannelMap {
    pub fn new(from: u32, to: u32) -> Self {
        match (from, to) {
            (a, b) if a == b => Self::Identity,
            (_, 1) => Self::Downmix,
            (1, _) => Self::Duplicate,
            (a, 2) if a > 2 => Self::FoldToStereo,
            _ => Self::Truncate,
        }
    }
}

/// Remaps interleaved frames, appending the result to `out`.
pub(crate) fn map_channels(map: ChannelMap, input: &[f64], from: usize, to: usize, out: &mut Vec<f64>) {
    out.reserve(input.len() / from * to);
    for frame in input.chunks_exact(from) {
        match map {
            ChannelMap::Identity => out.extend_from_slice(frame),
            ChannelMap::Downmix => {
                out.push(frame.iter().sum::<f64>() / from as f64);
            }
            ChannelMap::Duplicate => {
                out.extend(std::iter::repeat(frame[0]).take(to));
            }
            ChannelMap::FoldToStereo => {
                let (mut left, mut right) = (0.0, 0.0);
                for (index, sample) in frame.iter().enumerate() {
                    if index % 2 == 0 {
                        left += sample;
                    } else {
                        right += sample;
                    }
                }
                out.push(left / from.div_ceil(2) as f64);
                out.push(right / (from / 2) as f64);
            }
            ChannelMap::Truncate => {
                let shared = from.min(to);
                out.extend_from_slice(&frame[..shared]);
                out.extend(std::iter::repeat(0.0).take(to - shared));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remap(input: &[f64], from: usize, to: usize) -> Vec<f64> {
        let mut out = Vec::new();
        map_channels(ChannelMap::new(from as u32, to as u32), input, from, to, &mut out);
        out
    }

    #[test]
    fn test_selection() {
        assert_eq!(ChannelMap::new(2, 2), ChannelMap::Identity);
        assert_eq!(ChannelMap::new(6, 1), ChannelMap::Downmix);
        assert_eq!(ChannelMap::new(1, 4), ChannelMap::Duplicate);
        assert_eq!(ChannelMap::new(6, 2), ChannelMap::FoldToStereo);
        assert_eq!(ChannelMap::new(2, 6), ChannelMap::Truncate);
        assert_eq!(ChannelMap::new(6, 4), ChannelMap::Truncate);
    }

    #[test]
    fn test_stereo_to_mono_averages() {
        assert_eq!(remap(&[0.5, 0.25, -1.0, 1.0], 2, 1), vec![0.375, 0.0]);
    }

    #[test]
    fn test_mono_to_stereo_duplicates() {
        assert_eq!(remap(&[0.5, -0.5], 1, 2), vec![0.5, 0.5, -0.5, -0.5]);
    }

    #[test]
    fn test_surround_folds_to_stereo() {
        let frame = [0.6, 0.3, 0.0, 0.0, 0.3, 0.3];
        let out = remap(&frame, 6, 2);
        assert!((out[0] - 0.3).abs() < 1e-12);
        assert!((out[1] - 0.2).abs() < 1e-12);

        // Odd channel counts put the extra channel on the left.
        let out = remap(&[0.3, 0.5, 0.3], 3, 2);
        assert!((out[0] - 0.3).abs() < 1e-12);
        assert!((out[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_truncate_and_zero_fill() {
        assert_eq!(remap(&[0.1, 0.2], 2, 3), vec![0.1, 0.2, 0.0]);
        assert_eq!(remap(&[0.1, 0.2, 0.3, 0.4], 4, 3), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_identity_appends() {
        let mut out = vec![9.0];
        map_channels(ChannelMap::Identity, &[0.1, 0.2], 2, 2, &mut out);
        assert_eq!(out, vec![9.0, 0.1, 0.2]);
    }
}
