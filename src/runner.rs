pub mod ds;
pub mod lazy;
pub mod webpack;
