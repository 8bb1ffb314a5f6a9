use crate::parameter::{OptionalParameter, ParameterRef};

/// Multiplication factor that is either a constant or follows a parameter.
#[derive(Debug, Clone)]
pub struct Multiply {
    pub value: f32,
    pub parameter: Option<ParameterRef>,
}

impl Multiply {
    pub fn constant(value: f32) -> Self {
        Self { value, parameter: None }
    }

    pub fn bound(parameter: ParameterRef) -> Self {
        Self { value: 1.0, parameter: Some(parameter) }
    }

    /// The bound parameter's value, falling back to the constant.
    pub fn get(&self) -> f32 {
        self.parameter.value_or(self.value)
    }
}

impl Default for Multiply {
    fn default() -> Self {
        Self::constant(1.0)
    }
}

/// A parameter whose value is derived as `input * multiply`.
///
/// `sync` polls the input and the factor and writes the product into
/// `output`, which applies its own range clamp and change notification.
#[derive(Debug, Clone)]
pub struct MultiplyParameter {
    input: ParameterRef,
    multiply: Multiply,
    output: ParameterRef,
}

impl MultiplyParameter {
    pub fn new(input: ParameterRef, multiply: Multiply, output: ParameterRef) -> Self {
        Self { input, multiply, output }
    }

    pub fn sync(&self) -> f32 {
        self.output.set_value(self.input.value() * self.multiply.get());
        self.output.value()
    }

    pub fn input(&self) -> &ParameterRef {
        &self.input
    }

    pub fn output(&self) -> &ParameterRef {
        &self.output
    }

    pub fn multiply(&self) -> &Multiply {
        &self.multiply
    }
}
