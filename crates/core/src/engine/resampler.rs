//! Streaming linear-interpolation resampler.
//!
//! Output frame `k` sits at input position `k * in_rate / out_rate`, kept as an
//! exact rational so long streams do not drift. After `n` input frames the
//! resampler has produced exactly `floor(n * out_rate / in_rate)` frames once
//! flushed.

/// Sample rates are compared at millihertz precision.
const RATE_SCALE: f64 = 1000.0;

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

pub(crate) struct Resampler {
    channels: usize,
    /// Input frames per `step_den` output frames.
    step_num: u128,
    step_den: u128,
    /// Index of the next output frame.
    next_output: u128,
    /// Input frames received so far.
    frames_in: u128,
    /// Input frame index of the first frame held in `window`.
    base: u128,
    window: Vec<f64>,
    last_frame: Vec<f64>,
}

impl Resampler {
    pub fn new(in_rate: f64, out_rate: f64, channels: usize) -> Self {
        let in_rate = ((in_rate * RATE_SCALE).round() as u64).max(1);
        let out_rate = ((out_rate * RATE_SCALE).round() as u64).max(1);
        let divisor = gcd(in_rate, out_rate);
        Self {
            channels,
            step_num: u128::from(in_rate / divisor),
            step_den: u128::from(out_rate / divisor),
            next_output: 0,
            frames_in: 0,
            base: 0,
            window: Vec::new(),
            last_frame: vec![0.0; channels],
        }
    }

    /// Output frames owed for the input received so far.
    fn output_limit(&self) -> u128 {
        self.frames_in * self.step_den / self.step_num
    }

    fn frame(&self, index: u128) -> &[f64] {
        let start = (index - self.base) as usize * self.channels;
        &self.window[start..start + self.channels]
    }

    /// Consumes interleaved frames and appends every output frame whose
    /// neighbours are known.
    pub fn process(&mut self, input: &[f64], out: &mut Vec<f64>) {
        let frames = input.len() / self.channels;
        if frames == 0 {
            return;
        }
        self.window.extend_from_slice(input);
        self.frames_in += frames as u128;
        self.last_frame
            .copy_from_slice(&input[(frames - 1) * self.channels..frames * self.channels]);

        let limit = self.output_limit();
        while self.next_output < limit {
            let position = self.next_output * self.step_num;
            let index = position / self.step_den;
            let remainder = position % self.step_den;
            if remainder == 0 {
                if index >= self.frames_in {
                    break;
                }
                out.extend_from_slice(self.frame(index));
            } else {
                if index + 1 >= self.frames_in {
                    break;
                }
                let weight = remainder as f64 / self.step_den as f64;
                for channel in 0..self.channels {
                    let a = self.frame(index)[channel];
                    let b = self.frame(index + 1)[channel];
                    out.push(a + (b - a) * weight);
                }
            }
            self.next_output += 1;
        }

        let keep_from = (self.next_output * self.step_num / self.step_den).min(self.frames_in);
        if keep_from > self.base {
            let drop = (keep_from - self.base) as usize * self.channels;
            self.window.drain(..drop);
            self.base = keep_from;
        }
    }

    /// Emits the frames still owed, holding the last input frame.
    pub fn flush(&mut self, out: &mut Vec<f64>) {
        let limit = self.output_limit();
        while self.next_output < limit {
            out.extend_from_slice(&self.last_frame);
            self.next_output += 1;
        }
        self.window.clear();
        self.base = self.frames_in;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(resampler: &mut Resampler, chunks: &[&[f64]]) -> Vec<f64> {
        let mut out = Vec::new();
        for chunk in chunks {
            resampler.process(chunk, &mut out);
        }
        resampler.flush(&mut out);
        out
    }

    #[test]
    fn test_upsample_interpolates_and_holds_last_frame() {
        let mut resampler = Resampler::new(8_000.0, 16_000.0, 1);
        let out = run(&mut resampler, &[&[0.0, 1.0]]);
        assert_eq!(out, vec![0.0, 0.5, 1.0, 1.0]);
    }

    #[test]
    fn test_downsample_halves_frame_count() {
        let mut resampler = Resampler::new(44_100.0, 22_050.0, 2);
        let input: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let out = run(&mut resampler, &[&input]);
        assert_eq!(out, vec![0.0, 1.0, 4.0, 5.0, 8.0, 9.0, 12.0, 13.0, 16.0, 17.0]);
    }

    #[test]
    fn test_chunking_does_not_change_output() {
        let input: Vec<f64> = (0..441).map(|i| (i as f64 * 0.01).sin()).collect();

        let whole = run(&mut Resampler::new(44_100.0, 48_000.0, 1), &[&input]);
        let pieces = run(
            &mut Resampler::new(44_100.0, 48_000.0, 1),
            &[&input[..1], &input[1..100], &input[100..101], &input[101..]],
        );
        assert_eq!(whole, pieces);
        assert_eq!(whole.len(), 441 * 48_000 / 44_100);
    }

    #[test]
    fn test_frame_count_uses_floor() {
        for (frames, in_rate, out_rate) in [
            (220_500usize, 44_100.0, 22_050.0),
            (1_001, 44_100.0, 48_000.0),
            (999, 48_000.0, 44_100.0),
            (7, 8_000.0, 11_025.0),
        ] {
            let input = vec![0.25; frames];
            let out = run(&mut Resampler::new(in_rate, out_rate, 1), &[&input]);
            let expected = (frames as f64 * out_rate / in_rate).floor() as usize;
            assert_eq!(out.len(), expected, "{} -> {}", in_rate, out_rate);
        }
    }

    #[test]
    fn test_window_stays_small() {
        let mut resampler = Resampler::new(48_000.0, 44_100.0, 2);
        let mut out = Vec::new();
        for _ in 0..100 {
            resampler.process(&[0.0; 512], &mut out);
            assert!(resampler.window.len() <= 4);
        }
    }
}
