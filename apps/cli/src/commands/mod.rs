//! 命令定义和实现

pub mod config;
pub mod monitor;
pub mod play;
pub mod ports;
pub mod send;
pub mod table;

pub use config::ConfigCommand;
pub use monitor::MonitorCommand;
pub use play::PlayCommand;
pub use ports::list_ports;
pub use send::{InterruptCommand, RawCommand, SendCommand};
pub use table::TableCommand;
