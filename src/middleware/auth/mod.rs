pub mod access;

pub use access::PolicyStage;
