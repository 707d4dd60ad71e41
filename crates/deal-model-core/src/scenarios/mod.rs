pub mod break_even;
pub mod sensitivity;
pub mod sweep;
