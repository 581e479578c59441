pub mod context;
pub mod ls;
pub mod synth;
pub mod validate;
