use std::io::{self, Write};

use serde::Serialize;

use crate::pipeline::RunReport;
use crate::report;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_report(report: &RunReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_assets(assets: &[crate::archive::AssetDescriptor]) -> io::Result<()> {
        Self::print_json(&assets)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

pub struct TextOutput;

impl TextOutput {
    pub fn print_report(report: &RunReport) -> io::Result<()> {
        let mut stdout = io::stdout();
        report::write_text(&mut stdout, report)
    }
}
