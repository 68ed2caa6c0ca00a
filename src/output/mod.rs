pub mod dockerfile;

pub use dockerfile::{emit_plan, emit_template, instruction_line};
