pub mod parameter;
pub mod smooth;
pub mod average;
pub mod multiply;

pub use parameter::{
    AtomicF32, FloatParameter, OptionalParameter, ParameterError, ParameterRef, ParameterSet,
    ParameterSpec,
};
pub use smooth::SmoothOperator;
pub use average::{MovingAverage, ZeroWindowError};
pub use multiply::{Multiply, MultiplyParameter};
