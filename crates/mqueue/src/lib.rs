#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod config;
mod engine;
mod envelope;
mod error;
mod id;
mod lifecycle;
mod queue;
mod sync;
mod table;

pub use crate::config::*;
pub use crate::engine::*;
pub use crate::envelope::*;
pub use crate::error::*;
pub use crate::id::*;
