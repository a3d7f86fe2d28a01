//! ports 命令
//!
//! 列出可用串口和常用波特率

use anyhow::{Context, Result};
use luci_serial::{COMMON_BAUD_RATES, DEFAULT_BAUD_RATE};

pub fn list_ports() -> Result<()> {
    let ports = luci_serial::list_ports().context("枚举串口失败")?;

    if ports.is_empty() {
        println!("(未发现串口)");
    } else {
        println!("可用串口:");
        for port in &ports {
            println!("  {}", port);
        }
    }

    let rates: Vec<String> = COMMON_BAUD_RATES
        .iter()
        .map(|rate| {
            if *rate == DEFAULT_BAUD_RATE {
                format!("{rate} (默认)")
            } else {
                rate.to_string()
            }
        })
        .collect();
    println!("常用波特率: {}", rates.join(", "));
    Ok(())
}
