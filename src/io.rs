//! Plain-text records: sphere configurations, per-cycle statistics and run summaries.
//!
//! Configuration files use the LAMMPS data layout: a fixed 15-line header followed
//! by one `id type x y z` line per sphere. Packings with fewer than three
//! dimensions are padded with zero coordinates; higher dimensions list every
//! coordinate.

use crate::core::{CycleStats, Simulation};
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Lines before the first sphere record.
pub const HEADER_LINES: usize = 15;

pub const STATISTICS_HEADER: &str = "step packing-fraction pressure energy-change total-events";
pub const SUMMARY_HEADER: &str = "filename N radius pf";

/// Write `sim`'s current configuration, positions taken at the global clock.
pub fn write_configuration<const D: usize>(
    sim: &Simulation<D>,
    path: impl AsRef<Path>,
) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_configuration_to(sim, &mut out)?;
    out.flush()?;
    Ok(())
}

pub fn write_configuration_to<const D: usize, W: Write>(
    sim: &Simulation<D>,
    out: &mut W,
) -> Result<()> {
    let n = sim.num_spheres();
    writeln!(
        out,
        "# spherepack {D}D packing: N={n} radius={:.15e} packing_fraction={:.15e}",
        sim.radius(),
        sim.packing_fraction()
    )?;
    writeln!(out)?;
    writeln!(out, "{n} atoms")?;
    writeln!(out, "1 atom types")?;
    writeln!(out)?;
    for (lo, hi) in [("xlo", "xhi"), ("ylo", "yhi"), ("zlo", "zhi")] {
        writeln!(out, "0 1 {lo} {hi}")?;
    }
    writeln!(out)?;
    writeln!(out, "Masses")?;
    writeln!(out)?;
    writeln!(out, "1 1")?;
    writeln!(out)?;
    writeln!(out, "Atoms")?;
    writeln!(out)?;

    let width = D.max(3);
    for (id, x) in sim.positions().iter().enumerate() {
        write!(out, "{} 1", id + 1)?;
        for k in 0..width {
            write!(out, " {:.15e}", x.get(k).copied().unwrap_or(0.0))?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Read sphere positions back from a configuration file.
pub fn read_configuration<const D: usize>(path: impl AsRef<Path>) -> Result<Vec<[f64; D]>> {
    read_configuration_from(BufReader::new(File::open(path)?))
}

pub fn read_configuration_from<const D: usize, R: BufRead>(reader: R) -> Result<Vec<[f64; D]>> {
    let mut lines = reader.lines().enumerate();
    let mut expected = None;
    for read in 0..HEADER_LINES {
        let Some((index, line)) = lines.next() else {
            return Err(Error::Parse {
                line: read + 1,
                message: "truncated header".into(),
            });
        };
        let line = line?;
        if let Some(count) = line.trim().strip_suffix("atoms") {
            let count = count.trim().parse::<usize>().map_err(|e| Error::Parse {
                line: index + 1,
                message: format!("bad atom count: {e}"),
            })?;
            expected = Some(count);
        }
    }
    let expected = expected.ok_or(Error::Parse {
        line: 3,
        message: "header has no atom count".into(),
    })?;

    let fields = 2 + D.max(3);
    let mut positions = Vec::with_capacity(expected);
    for (index, line) in lines {
        let line = line?;
        let lineno = index + 1;
        if line.trim().is_empty() {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != fields {
            return Err(Error::Parse {
                line: lineno,
                message: format!("expected {fields} fields, found {}", tokens.len()),
            });
        }
        let id = tokens[0].parse::<usize>().map_err(|e| Error::Parse {
            line: lineno,
            message: format!("bad id: {e}"),
        })?;
        if id != positions.len() + 1 {
            return Err(Error::Parse {
                line: lineno,
                message: format!("expected id {}, found {id}", positions.len() + 1),
            });
        }
        let mut x = [0.0_f64; D];
        for (k, c) in x.iter_mut().enumerate() {
            *c = tokens[2 + k].parse::<f64>().map_err(|e| Error::Parse {
                line: lineno,
                message: format!("bad coordinate {}: {e}", k + 1),
            })?;
        }
        positions.push(x);
    }
    if positions.len() != expected {
        return Err(Error::Parse {
            line: HEADER_LINES + positions.len(),
            message: format!("header announces {expected} spheres, found {}", positions.len()),
        });
    }
    Ok(positions)
}

/// One line per compression cycle.
#[derive(Debug)]
pub struct StatisticsWriter<W: Write> {
    out: W,
}

impl StatisticsWriter<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(BufWriter::new(File::create(path)?))
    }
}

impl<W: Write> StatisticsWriter<W> {
    pub fn new(mut out: W) -> Result<Self> {
        writeln!(out, "{STATISTICS_HEADER}")?;
        Ok(Self { out })
    }

    pub fn record(&mut self, step: usize, stats: &CycleStats) -> Result<()> {
        writeln!(
            self.out,
            "{step} {:.15e} {:.15e} {:.15e} {}",
            stats.packing_fraction, stats.pressure, stats.energy_change, stats.total_events
        )?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// One line per finished target run.
#[derive(Debug)]
pub struct SummaryWriter<W: Write> {
    out: W,
}

impl SummaryWriter<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(BufWriter::new(File::create(path)?))
    }
}

impl<W: Write> SummaryWriter<W> {
    pub fn new(mut out: W) -> Result<Self> {
        writeln!(out, "{SUMMARY_HEADER}")?;
        Ok(Self { out })
    }

    pub fn record(
        &mut self,
        filename: &str,
        n: usize,
        radius: f64,
        packing_fraction: f64,
    ) -> Result<()> {
        writeln!(self.out, "{filename} {n} {radius:.15e} {packing_fraction:.15e}")?;
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
