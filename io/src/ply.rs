//! PLY (Polygon File Format) I/O
//!
//! Only ASCII vertex data is supported. Vertex properties other than
//! `x`, `y`, `z` are skipped on read.

use dims_core::{Error, PointCloud, Result};
use nalgebra::Point3;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Read a PLY file from a reader
pub fn read_ply<R: BufRead>(reader: R) -> Result<PointCloud> {
    let mut lines = reader.lines();

    // Parse header
    let mut in_header = true;
    let mut in_vertex_element = false;
    let mut format = String::new();
    let mut num_vertices = 0;
    let mut properties: Vec<String> = Vec::new();

    let magic = lines.next().transpose()?.unwrap_or_default();
    if magic.trim() != "ply" {
        return Err(Error::Parse("Missing 'ply' magic line".to_string()));
    }

    while in_header {
        let line = lines
            .next()
            .ok_or_else(|| Error::Parse("Unexpected EOF in header".to_string()))??;

        let line = line.trim();

        if line.starts_with("format ") {
            format = line
                .split_whitespace()
                .nth(1)
                .ok_or_else(|| Error::Parse("Invalid format line".to_string()))?
                .to_string();
        } else if line.starts_with("element ") {
            in_vertex_element = line.starts_with("element vertex ");
            if in_vertex_element {
                num_vertices = line
                    .split_whitespace()
                    .nth(2)
                    .ok_or_else(|| Error::Parse("Invalid vertex count".to_string()))?
                    .parse()
                    .map_err(|_| Error::Parse("Invalid vertex count number".to_string()))?;
            }
        } else if line.starts_with("property ") && in_vertex_element {
            let name = line
                .split_whitespace()
                .last()
                .ok_or_else(|| Error::Parse("Invalid property line".to_string()))?;
            properties.push(name.to_string());
        } else if line == "end_header" {
            in_header = false;
        }
    }

    if format != "ascii" {
        return Err(Error::Parse(format!(
            "PLY format '{}' not supported, only ASCII",
            format
        )));
    }

    let column = |axis: &str| {
        properties
            .iter()
            .position(|p| p == axis)
            .ok_or_else(|| Error::Parse(format!("Missing vertex property '{}'", axis)))
    };
    let (ix, iy, iz) = (column("x")?, column("y")?, column("z")?);

    // Parse data
    let mut points = Vec::with_capacity(num_vertices);
    for _ in 0..num_vertices {
        let line = lines
            .next()
            .ok_or_else(|| Error::Parse("Unexpected EOF in data".to_string()))??;

        let values: Vec<&str> = line.split_whitespace().collect();
        if values.len() < properties.len() {
            return Err(Error::Parse(format!(
                "Vertex has {} values, expected {}",
                values.len(),
                properties.len()
            )));
        }

        let parse = |i: usize| -> Result<f64> {
            values[i]
                .parse()
                .map_err(|_| Error::Parse(format!("Invalid number: {}", values[i])))
        };
        points.push(Point3::new(parse(ix)?, parse(iy)?, parse(iz)?));
    }

    Ok(PointCloud::new(points))
}

/// Write a point cloud to PLY format
pub fn write_ply<W: Write>(writer: &mut W, cloud: &PointCloud) -> Result<()> {
    // Write header
    writeln!(writer, "ply")?;
    writeln!(writer, "format ascii 1.0")?;
    writeln!(writer, "element vertex {}", cloud.len())?;
    writeln!(writer, "property double x")?;
    writeln!(writer, "property double y")?;
    writeln!(writer, "property double z")?;
    writeln!(writer, "end_header")?;

    // Write data
    for p in cloud.iter() {
        writeln!(writer, "{} {} {}", p.x, p.y, p.z)?;
    }

    Ok(())
}

pub fn read_ply_file(path: impl AsRef<Path>) -> Result<PointCloud> {
    let file = File::open(path)?;
    read_ply(BufReader::new(file))
}

pub fn write_ply_file(path: impl AsRef<Path>, cloud: &PointCloud) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_ply(&mut writer, cloud)?;
    writer.flush()?;
    Ok(())
}
