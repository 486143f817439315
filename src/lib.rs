pub mod common;
pub mod device;
pub mod emmc;
pub mod operator;
pub mod ui;
