pub mod html;
pub mod rst;
