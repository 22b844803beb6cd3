pub mod confirm;
pub mod emulate;
pub mod recipient;
pub mod unwrap;
pub mod wrap;
