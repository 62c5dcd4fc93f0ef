//! Landmark pose override files.
//!
//! One landmark per line: `index tx ty tz qx qy qz qw`, whitespace separated.
//! Blank lines are skipped.

use std::io::BufRead;

use nalgebra::{Quaternion, UnitQuaternion, Vector3};

use crate::core::{Rigid3d, rigid3_from_parts};

use super::error::{LoadError, Result};

/// Parse every landmark pose in `reader`. Any malformed line fails the
/// whole file.
pub fn read_landmark_poses<R: BufRead>(reader: R) -> Result<Vec<(String, Rigid3d)>> {
    let mut poses = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line_number = number + 1;
        let line = line.map_err(|e| LoadError::LandmarkFile {
            line: line_number,
            message: e.to_string(),
        })?;
        if line.trim().is_empty() {
            continue;
        }
        poses.push(parse_line(&line).map_err(|message| LoadError::LandmarkFile {
            line: line_number,
            message,
        })?);
    }
    log::debug!("Read {} landmark pose overrides", poses.len());
    Ok(poses)
}

fn parse_line(line: &str) -> std::result::Result<(String, Rigid3d), String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 8 {
        return Err(format!("expected 8 fields, found {}", fields.len()));
    }
    let index: i64 = fields[0]
        .parse()
        .map_err(|_| format!("bad landmark index {:?}", fields[0]))?;
    let mut values = [0.0f64; 7];
    for (value, field) in values.iter_mut().zip(&fields[1..]) {
        *value = field
            .parse()
            .map_err(|_| format!("bad number {:?}", field))?;
    }

    let [tx, ty, tz, qx, qy, qz, qw] = values;
    let quaternion = Quaternion::new(qw, qx, qy, qz);
    if quaternion.norm() < 1e-9 {
        return Err("zero rotation quaternion".to_string());
    }
    let pose = rigid3_from_parts(
        Vector3::new(tx, ty, tz),
        UnitQuaternion::from_quaternion(quaternion),
    );
    Ok((index.to_string(), pose))
}
