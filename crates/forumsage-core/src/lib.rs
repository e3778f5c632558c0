#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{CallError, Error, Result};
pub use types::{
    GenerationLimits, PipelineResult, PipelineStage, RelevanceHit, ResponderOutput, ResponderReply,
    ResponderRequest, ResponderType, SynthesisInput, SynthesisRequest, ThreadRecord,
};
