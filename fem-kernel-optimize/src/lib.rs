/// Vector functions and numerical differentiation
pub mod calculus;
/// Newton and Gauss-Newton iterations with optional line search
pub mod newton;
