use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A linear map from `[old_min, old_max]` onto `[new_min, new_max]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearScale {
    pub old_min: f32,
    pub old_max: f32,
    pub new_min: f32,
    pub new_max: f32,
}

impl LinearScale {
    pub fn new(old_min: f32, old_max: f32, new_min: f32, new_max: f32) -> Self {
        Self {
            old_min,
            old_max,
            new_min,
            new_max,
        }
    }

    pub fn apply(&self, v: f32) -> f32 {
        if self.old_max > self.old_min {
            (v - self.old_min) / (self.old_max - self.old_min) * (self.new_max - self.new_min)
                + self.new_min
        } else {
            self.new_min
        }
    }

    pub fn invert(&self, v: f32) -> f32 {
        if self.old_max > self.old_min && self.new_max != self.new_min {
            (v - self.new_min) / (self.new_max - self.new_min) * (self.old_max - self.old_min)
                + self.old_min
        } else {
            self.old_min
        }
    }
}

/// Training patterns stored as two packed buffers of inputs and desired outputs.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainData {
    input: Vec<f32>,
    output: Vec<f32>,
    len: usize,
    num_input: usize,
    num_output: usize,
    input_scale: Option<LinearScale>,
    output_scale: Option<LinearScale>,
}

impl TrainData {
    /// `len` zeroed patterns.
    pub fn new(len: usize, num_input: usize, num_output: usize) -> Self {
        Self {
            input: vec![0.; len * num_input],
            output: vec![0.; len * num_output],
            len,
            num_input,
            num_output,
            input_scale: None,
            output_scale: None,
        }
    }

    /// Builds the patterns by calling `func(index, input, output)` for every one of them.
    pub fn from_fn<F>(len: usize, num_input: usize, num_output: usize, mut func: F) -> Self
    where
        F: FnMut(usize, &mut [f32], &mut [f32]),
    {
        let mut data = Self::new(len, num_input, num_output);
        for i in 0..len {
            let (inp, out) = data.row_mut(i);
            func(i, inp, out);
        }
        data
    }

    /// Copies the given rows. All inputs and all outputs must share one width.
    pub fn from_slices(inputs: &[&[f32]], outputs: &[&[f32]]) -> Result<Self> {
        if inputs.len() != outputs.len() {
            return Err(Error::dims(inputs.len(), outputs.len()));
        }
        let num_input = inputs.first().map_or(0, |r| r.len());
        let num_output = outputs.first().map_or(0, |r| r.len());

        let mut data = Self::new(0, num_input, num_output);
        for (i, o) in inputs.iter().zip(outputs) {
            if i.len() != num_input {
                return Err(Error::dims(num_input, i.len()));
            }
            if o.len() != num_output {
                return Err(Error::dims(num_output, o.len()));
            }
            data.input.extend_from_slice(i);
            data.output.extend_from_slice(o);
            data.len += 1;
        }
        Ok(data)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn num_input(&self) -> usize {
        self.num_input
    }

    pub fn num_output(&self) -> usize {
        self.num_output
    }

    pub fn input(&self, idx: usize) -> &[f32] {
        &self.input[idx * self.num_input..(idx + 1) * self.num_input]
    }

    pub fn output(&self, idx: usize) -> &[f32] {
        &self.output[idx * self.num_output..(idx + 1) * self.num_output]
    }

    /// Input and desired output of pattern `idx`.
    pub fn data(&self, idx: usize) -> (&[f32], &[f32]) {
        (self.input(idx), self.output(idx))
    }

    pub fn row_mut(&mut self, idx: usize) -> (&mut [f32], &mut [f32]) {
        let (ni, no) = (self.num_input, self.num_output);
        (
            &mut self.input[idx * ni..(idx + 1) * ni],
            &mut self.output[idx * no..(idx + 1) * no],
        )
    }

    /// All inputs, pattern after pattern.
    pub fn inputs(&self) -> &[f32] {
        &self.input
    }

    pub fn outputs(&self) -> &[f32] {
        &self.output
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[f32], &[f32])> + '_ {
        (0..self.len).map(move |i| self.data(i))
    }

    /// Shuffles the patterns in place (Fisher-Yates). Inputs stay paired with their outputs.
    pub fn shuffle<R: Rng>(&mut self, rng: &mut R) {
        for i in (1..self.len).rev() {
            let j = rng.gen_range(0, i + 1);
            if i != j {
                swap_rows(&mut self.input, self.num_input, i, j);
                swap_rows(&mut self.output, self.num_output, i, j);
            }
        }
    }

    /// A new set holding the patterns of `self` followed by those of `other`.
    pub fn merge(&self, other: &TrainData) -> Result<TrainData> {
        if self.num_input != other.num_input {
            return Err(Error::dims(self.num_input, other.num_input));
        }
        if self.num_output != other.num_output {
            return Err(Error::dims(self.num_output, other.num_output));
        }
        let mut merged = Self::new(0, self.num_input, self.num_output);
        merged.input.reserve(self.input.len() + other.input.len());
        merged.input.extend_from_slice(&self.input);
        merged.input.extend_from_slice(&other.input);
        merged.output.reserve(self.output.len() + other.output.len());
        merged.output.extend_from_slice(&self.output);
        merged.output.extend_from_slice(&other.output);
        merged.len = self.len + other.len;
        Ok(merged)
    }

    /// Copy of `length` consecutive patterns starting at `pos`.
    pub fn subset(&self, pos: usize, length: usize) -> Result<TrainData> {
        if pos.checked_add(length).map_or(true, |end| end > self.len) {
            return Err(Error::InvalidParameter(format!(
                "subset {}..{} is out of bounds for {} patterns",
                pos,
                pos.saturating_add(length),
                self.len
            )));
        }
        let mut sub = Self::new(length, self.num_input, self.num_output);
        sub.input
            .copy_from_slice(&self.input[pos * self.num_input..(pos + length) * self.num_input]);
        sub.output
            .copy_from_slice(&self.output[pos * self.num_output..(pos + length) * self.num_output]);
        Ok(sub)
    }

    pub fn input_range(&self) -> (f32, f32) {
        range(&self.input)
    }

    pub fn output_range(&self) -> (f32, f32) {
        range(&self.output)
    }

    pub fn input_column_range(&self, column: usize) -> (f32, f32) {
        column_range(&self.input, self.num_input, column)
    }

    pub fn output_column_range(&self, column: usize) -> (f32, f32) {
        column_range(&self.output, self.num_output, column)
    }

    /// Linearly rescales every input to `[new_min, new_max]`. The applied
    /// scale is remembered for [`descale_input`](Self::descale_input).
    pub fn scale_input(&mut self, new_min: f32, new_max: f32) -> Result<LinearScale> {
        let scale = make_scale(&self.input, new_min, new_max)?;
        self.input.iter_mut().for_each(|v| *v = scale.apply(*v));
        self.input_scale = Some(scale);
        Ok(scale)
    }

    pub fn scale_output(&mut self, new_min: f32, new_max: f32) -> Result<LinearScale> {
        let scale = make_scale(&self.output, new_min, new_max)?;
        self.output.iter_mut().for_each(|v| *v = scale.apply(*v));
        self.output_scale = Some(scale);
        Ok(scale)
    }

    /// Rescales inputs and outputs independently to `[new_min, new_max]`.
    pub fn scale(&mut self, new_min: f32, new_max: f32) -> Result<()> {
        make_scale(&[], new_min, new_max)?;
        self.scale_input(new_min, new_max)?;
        self.scale_output(new_min, new_max)?;
        Ok(())
    }

    pub fn input_scale(&self) -> Option<LinearScale> {
        self.input_scale
    }

    pub fn output_scale(&self) -> Option<LinearScale> {
        self.output_scale
    }

    /// Undoes the last [`scale_input`](Self::scale_input).
    pub fn descale_input(&mut self) -> Result<()> {
        let scale = self
            .input_scale
            .take()
            .ok_or_else(|| Error::InvalidParameter("inputs were not scaled".to_owned()))?;
        self.input.iter_mut().for_each(|v| *v = scale.invert(*v));
        Ok(())
    }

    pub fn descale_output(&mut self) -> Result<()> {
        let scale = self
            .output_scale
            .take()
            .ok_or_else(|| Error::InvalidParameter("outputs were not scaled".to_owned()))?;
        self.output.iter_mut().for_each(|v| *v = scale.invert(*v));
        Ok(())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        fs::read_to_string(path)?.parse()
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_string())?;
        Ok(())
    }

    /// Saves the patterns as integers scaled by `2^decimal_point`.
    pub fn save_fixed<P: AsRef<Path>>(&self, path: P, decimal_point: u32) -> Result<()> {
        let multiplier = (1u64 << decimal_point) as f32;
        let mut s = String::new();
        write_header(&mut s, self);
        for i in 0..self.len {
            write_row(&mut s, self.input(i).iter().map(|v| (v * multiplier).round() as i32));
            write_row(&mut s, self.output(i).iter().map(|v| (v * multiplier).round() as i32));
        }
        fs::write(path, s)?;
        Ok(())
    }
}

fn swap_rows(buf: &mut [f32], width: usize, a: usize, b: usize) {
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    let (head, tail) = buf.split_at_mut(hi * width);
    head[lo * width..(lo + 1) * width].swap_with_slice(&mut tail[..width]);
}

fn range(values: &[f32]) -> (f32, f32) {
    if values.is_empty() {
        return (0., 0.);
    }
    values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

fn column_range(values: &[f32], width: usize, column: usize) -> (f32, f32) {
    if width == 0 || values.is_empty() {
        return (0., 0.);
    }
    values
        .iter()
        .skip(column)
        .step_by(width)
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

fn make_scale(values: &[f32], new_min: f32, new_max: f32) -> Result<LinearScale> {
    if !(new_min < new_max) {
        return Err(Error::InvalidParameter(format!(
            "scaling range [{}, {}] is empty",
            new_min, new_max
        )));
    }
    let (min, max) = range(values);
    Ok(LinearScale::new(min, max, new_min, new_max))
}

fn write_header(s: &mut String, data: &TrainData) {
    // writing into a String cannot fail
    let _ = writeln!(s, "{} {} {}", data.len, data.num_input, data.num_output);
}

fn write_row<T: std::fmt::Display>(s: &mut String, values: impl Iterator<Item = T>) {
    for (i, v) in values.enumerate() {
        if i > 0 {
            s.push(' ');
        }
        let _ = write!(s, "{}", v);
    }
    s.push('\n');
}

impl std::fmt::Display for TrainData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = String::new();
        write_header(&mut s, self);
        for i in 0..self.len {
            write_row(&mut s, self.input(i).iter());
            write_row(&mut s, self.output(i).iter());
        }
        f.write_str(&s)
    }
}

impl FromStr for TrainData {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut tokens = s.split_whitespace();
        let mut header = |name: &str| -> Result<usize> {
            let tok = tokens
                .next()
                .ok_or_else(|| Error::malformed(format!("missing {} in header", name)))?;
            tok.parse()
                .map_err(|_| Error::malformed(format!("invalid {} '{}' in header", name, tok)))
        };
        let len = header("pattern count")?;
        let num_input = header("input width")?;
        let num_output = header("output width")?;

        if len > 0 && (num_input == 0 || num_output == 0) {
            return Err(Error::malformed("patterns need at least one input and one output"));
        }
        let values: Vec<&str> = tokens.collect();
        let width = num_input.checked_add(num_output);
        let expected = width
            .and_then(|w| len.checked_mul(w))
            .ok_or_else(|| {
                Error::malformed(format!(
                    "header {} {} {} announces too many values",
                    len, num_input, num_output
                ))
            })?;
        if values.len() < expected {
            return Err(Error::malformed(format!(
                "truncated data, header announces {} values but only {} follow",
                expected,
                values.len()
            )));
        }
        if let Some(tok) = values.get(expected) {
            return Err(Error::malformed(format!(
                "unexpected value '{}' after {} patterns",
                tok, len
            )));
        }

        let mut data = TrainData::new(0, num_input, num_output);
        data.input.reserve(len * num_input);
        data.output.reserve(len * num_output);
        for (i, row) in values.chunks((num_input + num_output).max(1)).enumerate() {
            let (inp, out) = row.split_at(num_input);
            let rows = [("input", inp, &mut data.input), ("output", out, &mut data.output)];
            for (kind, toks, buf) in rows {
                for tok in toks {
                    let v = tok.parse().map_err(|_| {
                        Error::malformed(format!("invalid {} value '{}' in pattern {}", kind, tok, i))
                    })?;
                    buf.push(v);
                }
            }
        }
        data.len = len;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn four() -> TrainData {
        TrainData::from_slices(
            &[&[0., 0.], &[0., 1.], &[1., 0.], &[1., 1.]],
            &[&[0.], &[1.], &[1.], &[0.]],
        )
        .unwrap()
    }

    #[test]
    fn parse_and_print() {
        let text = "2 2 1\n0 1\n1\n-0.5 0.25\n0\n";
        let data: TrainData = text.parse().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.input(1), &[-0.5, 0.25]);
        assert_eq!(data.output(0), &[1.]);
        assert_eq!(data.to_string(), text);
    }

    #[test]
    fn rejects_malformed_text() {
        assert!("2 2".parse::<TrainData>().is_err());
        assert!("2 2 1\n0 1\n1\n0.5".parse::<TrainData>().is_err());
        assert!("1 1 1\nx\n1".parse::<TrainData>().is_err());
        assert!("1 1 1\n1\n1\n7".parse::<TrainData>().is_err());

        for text in [
            "18446744073709551615 2 1\n0 0\n0\n",
            "4611686018427387904 1 1\n0\n0\n",
            "18446744073709551615 0 0\n",
            "1 18446744073709551615 1\n0\n0\n",
        ] {
            let err = text.parse::<TrainData>().unwrap_err();
            assert_eq!(err.kind(), crate::error::ErrorKind::MalformedFile, "{:?}", text);
        }
    }

    #[test]
    fn subset_copies_rows() {
        let data = four();
        let sub = data.subset(1, 2).unwrap();
        assert_eq!(sub.len(), 2);
        assert_eq!(sub.input(0), data.input(1));
        assert_eq!(sub.input(1), data.input(2));
        assert_eq!(sub.output(1), data.output(2));
        assert!(data.subset(3, 2).is_err());
        assert!(data.subset(usize::MAX, 2).is_err());
        assert_eq!(data.subset(4, 0).unwrap().len(), 0);
    }

    #[test]
    fn merge_checks_widths() {
        let a = four();
        let b = TrainData::new(2, 3, 1);
        assert!(a.merge(&b).is_err());
        let merged = a.merge(&a.subset(0, 2).unwrap()).unwrap();
        assert_eq!(merged.len(), 6);
        assert_eq!(merged.input(5), a.input(1));
    }

    #[test]
    fn swap_rows_swaps() {
        let mut buf = vec![1., 2., 3., 4., 5., 6.];
        swap_rows(&mut buf, 2, 2, 0);
        assert_eq!(buf, vec![5., 6., 3., 4., 1., 2.]);
    }

    #[test]
    fn scale_round_trip() {
        let mut data = four();
        data.input.iter_mut().enumerate().for_each(|(i, v)| *v = i as f32 * 3. - 4.);
        let original = data.clone();
        let scale = data.scale_input(-1., 1.).unwrap();
        assert_eq!(scale.old_min, -4.);
        assert_eq!(data.input_range(), (-1., 1.));
        data.descale_input().unwrap();
        for (a, b) in data.inputs().iter().zip(original.inputs()) {
            assert!((a - b).abs() < 1e-5);
        }
        assert!(data.descale_input().is_err());
        assert!(data.scale_output(1., 1.).is_err());
    }

    #[test]
    fn generator_fills_rows() {
        let data = TrainData::from_fn(3, 1, 2, |i, inp, out| {
            inp[0] = i as f32;
            out[0] = 2. * i as f32;
            out[1] = -(i as f32);
        });
        assert_eq!(data.output(2), &[4., -2.]);
        assert_eq!(data.input(1), &[1.]);
    }
}
