pub mod chart;
pub mod controls;
pub mod datatable;
pub mod debug;
