pub mod icons;
pub mod operator;

pub use operator::{Notice, NoticeLevel, Operator, TerminalOperator};
