pub mod cursor;
pub mod html;
pub mod schedule;
pub mod survey;
pub mod text;

pub use cursor::Cursor;
