//! A feedforward neural network engine: layered, sparse and shortcut
//! topologies, backpropagation style trainers, cascade correlation and a
//! fixed point export.
//!
//! ```no_run
//! use rusty_fann::{Network, TrainData};
//!
//! # fn main() -> rusty_fann::Result<()> {
//! let data = TrainData::from_file("xor.data")?;
//! let mut net = Network::standard(&[2, 3, 1])?;
//! net.train_on_data(&data, 1000, 100, 0.001)?;
//! println!("{:?}", net.run(&[1., -1.])?);
//! # Ok(())
//! # }
//! ```

pub mod a_funcs;
pub mod cascade;
pub mod config;
pub mod error;
pub mod fixed;
pub mod initializer;
pub mod loss_funcs;
pub mod network;
pub mod optimizer;
pub mod storage;
pub mod trainer;

pub use a_funcs::Activation;
pub use cascade::CascadeSummary;
pub use config::{CascadeParams, TrainParams, TrainingAlgorithm};
pub use error::{Error, ErrorKind, Result};
pub use fixed::{FixedNetwork, FixedReport};
pub use loss_funcs::{ErrorFunc, StopFunc};
pub use network::{Connection, Network, NetworkBuilder, NetworkType};
pub use storage::{LinearScale, TrainData};
pub use trainer::{EpochReport, StopReason, TrainOutcome};
