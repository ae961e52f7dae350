//! Default progress reporting through the `log` facade, used whenever no
//! callback is registered on the network.

use super::EpochReport;

pub fn start(max_epochs: usize, desired_error: f32) {
    log::info!("Max epochs {:8}. Desired error: {:.10}.", max_epochs, desired_error);
}

pub fn epoch(report: &EpochReport) {
    log::info!(
        "Epochs {:8}. Current error: {:.10}. Bit fail {}.",
        report.epoch,
        report.mse,
        report.bit_fail
    );
}

pub fn cascade_start(max_neurons: usize, desired_error: f32) {
    log::info!("Max neurons {:8}. Desired error: {:.10}.", max_neurons, desired_error);
}

/// `report.epoch` counts the hidden neurons grown so far.
pub fn cascade_neuron(report: &EpochReport, total_epochs: usize) {
    log::info!(
        "Neurons {:6}. Current error: {:.10}. Total epochs {:8}. Bit fail {}.",
        report.epoch,
        report.mse,
        total_epochs,
        report.bit_fail
    );
}
