use crate::database::Stats;
use crate::distance::{distance_category, format_distance};
use anyhow::Result;
use chrono::Utc;
use std::io::Write;

pub struct ReportGenerator;

impl ReportGenerator {
    pub fn generate_stats<W: Write>(writer: &mut W, stats: &Stats) -> Result<()> {
        writeln!(writer, "Database Statistics")?;
        writeln!(writer, "-------------------")?;
        writeln!(writer, "Motos:   {}", stats.motos)?;
        writeln!(writer, "Tags:    {}", stats.tags)?;
        writeln!(writer, "Anchors: {}", stats.anchors)?;

        if stats.motos > 0 {
            let coverage = stats.tags as f64 / stats.motos as f64 * 100.0;
            writeln!(writer)?;
            writeln!(writer, "Tags per moto: {:.0}%", coverage)?;
        }

        writeln!(writer)?;
        writeln!(
            writer,
            "Generated: {}",
            Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        )?;

        Ok(())
    }

    pub fn print_estimate<W: Write>(writer: &mut W, rssi_dbm: f64, distance_m: f64) -> Result<()> {
        writeln!(
            writer,
            "{:6.1}dBm | {:>6} | {}",
            rssi_dbm,
            format_distance(distance_m),
            distance_category(distance_m)
        )?;
        Ok(())
    }
}
