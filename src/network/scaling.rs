use serde::{Deserialize, Serialize};

use super::Network;
use crate::error::{Error, Result};
use crate::storage::{LinearScale, TrainData};

/// Per column scaling of network inputs and outputs, computed from a data set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScalingParams {
    pub input: Vec<LinearScale>,
    pub output: Vec<LinearScale>,
}

impl Network {
    pub fn scaling_params(&self) -> Option<&ScalingParams> {
        self.scaling.as_ref()
    }

    /// Computes input scaling so that every input column of `data` maps onto
    /// `[new_min, new_max]`.
    pub fn set_input_scaling_params(&mut self, data: &TrainData, new_min: f32, new_max: f32) -> Result<()> {
        if data.num_input() != self.num_input() {
            return Err(Error::dims(self.num_input(), data.num_input()));
        }
        let input = (0..data.num_input())
            .map(|c| {
                let (min, max) = data.input_column_range(c);
                LinearScale::new(min, max, new_min, new_max)
            })
            .collect();
        self.scaling.get_or_insert_with(Default::default).input = input;
        Ok(())
    }

    /// Computes output scaling so that every output column of `data` maps onto
    /// `[new_min, new_max]`.
    pub fn set_output_scaling_params(&mut self, data: &TrainData, new_min: f32, new_max: f32) -> Result<()> {
        if data.num_output() != self.num_output() {
            return Err(Error::dims(self.num_output(), data.num_output()));
        }
        let output = (0..data.num_output())
            .map(|c| {
                let (min, max) = data.output_column_range(c);
                LinearScale::new(min, max, new_min, new_max)
            })
            .collect();
        self.scaling.get_or_insert_with(Default::default).output = output;
        Ok(())
    }

    pub fn set_scaling_params(
        &mut self,
        data: &TrainData,
        new_input_min: f32,
        new_input_max: f32,
        new_output_min: f32,
        new_output_max: f32,
    ) -> Result<()> {
        if data.num_input() != self.num_input() {
            return Err(Error::dims(self.num_input(), data.num_input()));
        }
        if data.num_output() != self.num_output() {
            return Err(Error::dims(self.num_output(), data.num_output()));
        }
        self.set_input_scaling_params(data, new_input_min, new_input_max)?;
        self.set_output_scaling_params(data, new_output_min, new_output_max)
    }

    pub fn clear_scaling_params(&mut self) {
        self.scaling = None;
    }

    fn scales(&self, output: bool) -> Result<&[LinearScale]> {
        let params = self
            .scaling
            .as_ref()
            .ok_or_else(|| Error::InvalidParameter("no scaling parameters set".to_owned()))?;
        let scales = if output { &params.output } else { &params.input };
        if scales.is_empty() {
            let which = if output { "output" } else { "input" };
            return Err(Error::InvalidParameter(format!("no {} scaling parameters set", which)));
        }
        Ok(scales)
    }

    pub fn scale_input(&self, input: &mut [f32]) -> Result<()> {
        apply(self.scales(false)?, input, LinearScale::apply)
    }

    pub fn descale_input(&self, input: &mut [f32]) -> Result<()> {
        apply(self.scales(false)?, input, LinearScale::invert)
    }

    pub fn scale_output(&self, output: &mut [f32]) -> Result<()> {
        apply(self.scales(true)?, output, LinearScale::apply)
    }

    pub fn descale_output(&self, output: &mut [f32]) -> Result<()> {
        apply(self.scales(true)?, output, LinearScale::invert)
    }

    /// Scales a whole data set with the stored parameters.
    pub fn scale_train(&self, data: &mut TrainData) -> Result<()> {
        let (input, output) = (self.scales(false)?, self.scales(true)?);
        check(input, data.num_input())?;
        check(output, data.num_output())?;
        for i in 0..data.len() {
            let (inp, out) = data.row_mut(i);
            apply(input, inp, LinearScale::apply)?;
            apply(output, out, LinearScale::apply)?;
        }
        Ok(())
    }

    pub fn descale_train(&self, data: &mut TrainData) -> Result<()> {
        let (input, output) = (self.scales(false)?, self.scales(true)?);
        check(input, data.num_input())?;
        check(output, data.num_output())?;
        for i in 0..data.len() {
            let (inp, out) = data.row_mut(i);
            apply(input, inp, LinearScale::invert)?;
            apply(output, out, LinearScale::invert)?;
        }
        Ok(())
    }
}

fn check(scales: &[LinearScale], len: usize) -> Result<()> {
    if scales.len() != len {
        return Err(Error::dims(scales.len(), len));
    }
    Ok(())
}

fn apply(scales: &[LinearScale], values: &mut [f32], f: fn(&LinearScale, f32) -> f32) -> Result<()> {
    check(scales, values.len())?;
    for (v, s) in values.iter_mut().zip(scales) {
        *v = f(s, *v);
    }
    Ok(())
}
