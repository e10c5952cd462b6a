pub mod builder;

pub use builder::FitBuilder;
