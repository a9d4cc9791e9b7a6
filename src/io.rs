// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::io::Write;
use std::path::Path;

use ndarray::{ArrayD, IxDyn, ShapeBuilder};

use crate::error::{FmmError, Result};

/// Supported file formats for field I/O.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileFormat {
    /// NumPy .npy format.
    Npy,
    /// MATLAB .mat format (Level 5).
    Mat,
}

/// Infer file format from extension.
pub fn infer_format(path: &Path) -> Result<FileFormat> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("npy") => Ok(FileFormat::Npy),
        Some("mat") => Ok(FileFormat::Mat),
        Some(ext) => Err(FmmError::UnsupportedFileFormat(ext.to_string())),
        None => Err(FmmError::UnsupportedFileFormat(
            "(no extension)".to_string(),
        )),
    }
}

/// Save a distance field to a file, inferring the format from the
/// extension. The buffer must be linearized with axis 0 contiguous, as
/// returned by the march entry points.
pub fn save_field(buffer: &[f64], size: &[usize], path: &Path) -> Result<()> {
    match infer_format(path)? {
        FileFormat::Npy => save_npy(buffer, size, path),
        FileFormat::Mat => save_mat(buffer, size, path, "distance"),
    }
}

/// Load a distance field from a file, inferring the format from the
/// extension. Returns the buffer in the crate's linearization.
pub fn load_field(path: &Path, expected_size: &[usize]) -> Result<Vec<f64>> {
    match infer_format(path)? {
        FileFormat::Npy => load_npy_field(path, expected_size),
        FileFormat::Mat => load_mat_field(path, "distance", expected_size),
    }
}

/// Save a field buffer to a .npy file with the given logical shape.
pub fn save_npy(buffer: &[f64], size: &[usize], path: &Path) -> Result<()> {
    // The buffer has axis 0 contiguous, i.e. Fortran order for this shape.
    let arr = ArrayD::from_shape_vec(IxDyn(size).f(), buffer.to_vec())
        .map_err(|e| FmmError::Other(format!("shape error: {}", e)))?;

    let c_order = arr.as_standard_layout().to_owned();
    ndarray_npy::write_npy(path, &c_order)
        .map_err(|e| FmmError::Other(format!("npy write error: {}", e)))?;

    Ok(())
}

/// Load a field from a .npy file, converting into the crate's
/// linearization. f32 files are promoted to f64.
pub fn load_npy_field(path: &Path, expected_size: &[usize]) -> Result<Vec<f64>> {
    let arr: ArrayD<f64> = match ndarray_npy::read_npy(path) {
        Ok(a) => a,
        Err(_) => {
            let arr32: ArrayD<f32> = ndarray_npy::read_npy(path)
                .map_err(|e| FmmError::UnsupportedDtype(format!("{}", e)))?;
            arr32.mapv(|v| v as f64)
        }
    };

    let got_shape: Vec<usize> = arr.shape().to_vec();
    if got_shape != expected_size {
        return Err(FmmError::ShapeMismatch {
            expected: expected_size.to_vec(),
            got: got_shape,
        });
    }

    // Reversing the axes turns a C-order read-out into our axis-0-fastest
    // layout.
    let reversed: Vec<usize> = (0..arr.ndim()).rev().collect();
    let transposed = arr.permuted_axes(IxDyn(&reversed));
    Ok(transposed.as_standard_layout().to_owned().into_raw_vec())
}

/// Save a field buffer to a .mat file (Level 5 format).
///
/// The `matfile` crate (v0.5) only reads MAT files; writing is on its
/// roadmap but unimplemented, so the writer below covers the one shape
/// we emit: a single uncompressed real f64 array, laid out per the
/// MAT-File Level 5 format document
/// (<https://www.mathworks.com/help/pdf_doc/matlab/matfile_format.pdf>).
/// MATLAB stores arrays column-major, which is exactly this crate's
/// linearization, so the buffer is written as-is with dimensions equal
/// to the grid size.
pub fn save_mat(buffer: &[f64], size: &[usize], path: &Path, var_name: &str) -> Result<()> {
    write_mat_level5(path, var_name, size, buffer)
}

/// Load a field from a .mat file by variable name, converting into the
/// crate's linearization.
pub fn load_mat_field(path: &Path, variable_name: &str, expected_size: &[usize]) -> Result<Vec<f64>> {
    let file = std::fs::File::open(path)?;
    let mut reader = std::io::BufReader::new(file);
    let mat = matfile::MatFile::parse(&mut reader)
        .map_err(|e| FmmError::Other(format!("MAT parse error: {}", e)))?;

    let available: Vec<String> = mat.arrays().iter().map(|a| a.name().to_string()).collect();
    let array = mat
        .find_by_name(variable_name)
        .ok_or_else(|| FmmError::MatVariableNotFound {
            expected: variable_name.to_string(),
            available,
        })?;

    let data = numeric_data_f64(array)?;
    let mat_shape: Vec<usize> = array.size().to_vec();

    if data.len() != expected_size.iter().product::<usize>() {
        return Err(FmmError::ShapeMismatch {
            expected: expected_size.to_vec(),
            got: mat_shape,
        });
    }

    // MAT data is column-major. With matching dimensions that is already
    // our layout; with reversed dimensions (row-major convention on the
    // writing side) re-order through ndarray.
    if mat_shape == expected_size {
        return Ok(data);
    }
    let reversed: Vec<usize> = expected_size.iter().rev().cloned().collect();
    if mat_shape != reversed {
        return Err(FmmError::ShapeMismatch {
            expected: expected_size.to_vec(),
            got: mat_shape,
        });
    }
    let arr = ArrayD::from_shape_vec(IxDyn(&mat_shape).f(), data)
        .map_err(|e| FmmError::Other(format!("shape error: {}", e)))?;
    Ok(arr.as_standard_layout().to_owned().into_raw_vec())
}

/// Load source specifications from a file: a K x (2N+1) matrix whose rows
/// are `[index_0 .. index_{N-1}, distance, normal_0 .. normal_{N-1}]`.
/// For .mat files the variable must be named `sources`.
pub fn load_sources<const N: usize>(
    path: &Path,
) -> Result<(Vec<[i32; N]>, Vec<f64>, Vec<[f64; N]>)> {
    let columns = 2 * N + 1;
    let (rows, data) = match infer_format(path)? {
        FileFormat::Npy => load_npy_matrix(path, columns)?,
        FileFormat::Mat => load_mat_matrix(path, "sources", columns)?,
    };

    let mut indices = Vec::with_capacity(rows);
    let mut distances = Vec::with_capacity(rows);
    let mut normals = Vec::with_capacity(rows);
    for r in 0..rows {
        let row = |c: usize| data[r * columns + c];
        let mut index = [0i32; N];
        let mut normal = [0.0f64; N];
        for d in 0..N {
            index[d] = row(d).round() as i32;
            normal[d] = row(N + 1 + d);
        }
        indices.push(index);
        distances.push(row(N));
        normals.push(normal);
    }
    Ok((indices, distances, normals))
}

// Reads a 2-D .npy matrix with the given column count; returns row-major
// (rows, data).
fn load_npy_matrix(path: &Path, columns: usize) -> Result<(usize, Vec<f64>)> {
    let arr: ArrayD<f64> = match ndarray_npy::read_npy(path) {
        Ok(a) => a,
        Err(_) => {
            let arr32: ArrayD<f32> = ndarray_npy::read_npy(path)
                .map_err(|e| FmmError::UnsupportedDtype(format!("{}", e)))?;
            arr32.mapv(|v| v as f64)
        }
    };
    let shape = arr.shape().to_vec();
    if shape.len() != 2 || shape[1] != columns {
        return Err(FmmError::ShapeMismatch {
            expected: vec![0, columns],
            got: shape,
        });
    }
    let rows = shape[0];
    Ok((rows, arr.as_standard_layout().to_owned().into_raw_vec()))
}

// Reads a 2-D MAT matrix with the given column count; returns row-major
// (rows, data).
fn load_mat_matrix(path: &Path, variable_name: &str, columns: usize) -> Result<(usize, Vec<f64>)> {
    let file = std::fs::File::open(path)?;
    let mut reader = std::io::BufReader::new(file);
    let mat = matfile::MatFile::parse(&mut reader)
        .map_err(|e| FmmError::Other(format!("MAT parse error: {}", e)))?;

    let available: Vec<String> = mat.arrays().iter().map(|a| a.name().to_string()).collect();
    let array = mat
        .find_by_name(variable_name)
        .ok_or_else(|| FmmError::MatVariableNotFound {
            expected: variable_name.to_string(),
            available,
        })?;

    let data = numeric_data_f64(array)?;
    let shape: Vec<usize> = array.size().to_vec();
    if shape.len() != 2 || shape[1] != columns {
        return Err(FmmError::ShapeMismatch {
            expected: vec![0, columns],
            got: shape,
        });
    }
    let rows = shape[0];

    // Column-major to row-major.
    let mut row_major = vec![0.0; data.len()];
    for r in 0..rows {
        for c in 0..columns {
            row_major[r * columns + c] = data[c * rows + r];
        }
    }
    Ok((rows, row_major))
}

fn numeric_data_f64(array: &matfile::Array) -> Result<Vec<f64>> {
    match array.data() {
        matfile::NumericData::Double { real, imag: _ } => Ok(real.clone()),
        matfile::NumericData::Single { real, imag: _ } => {
            Ok(real.iter().map(|&v| v as f64).collect())
        }
        _ => Err(FmmError::UnsupportedDtype(
            "MAT file array is not f64 or f32".to_string(),
        )),
    }
}

// MAT-File Level 5 element type codes, from the format document.
const MI_INT8: u32 = 1;
const MI_INT32: u32 = 5;
const MI_UINT32: u32 = 6;
const MI_DOUBLE: u32 = 9;
const MI_MATRIX: u32 = 14;
const MX_DOUBLE_CLASS: u32 = 6;

// Sub-element data must end on an 8-byte boundary.
fn mat_padded_len(len: usize) -> usize {
    len.div_ceil(8) * 8
}

// One sub-element: an 8-byte tag (type code, byte count) followed by the
// data and zero padding up to the 8-byte boundary.
fn write_mat_sub_element(w: &mut impl Write, type_code: u32, bytes: &[u8]) -> Result<()> {
    w.write_all(&type_code.to_le_bytes())?;
    w.write_all(&(bytes.len() as u32).to_le_bytes())?;
    w.write_all(bytes)?;
    let pad = mat_padded_len(bytes.len()) - bytes.len();
    w.write_all(&[0u8; 8][..pad])?;
    Ok(())
}

// 128-byte file header: 116 bytes of banner text, an unused subsystem
// offset, the Level 5 version word, and the little-endian marker.
fn write_mat_header(w: &mut impl Write) -> Result<()> {
    let banner = b"MATLAB 5.0 MAT-file, created by fmm-esdf";
    let mut text = [b' '; 116];
    text[..banner.len()].copy_from_slice(banner);
    w.write_all(&text)?;
    w.write_all(&[0u8; 8])?;
    w.write_all(&0x0100u16.to_le_bytes())?;
    w.write_all(b"IM")?;
    Ok(())
}

/// Minimal MAT-file Level 5 writer for a single real f64 array.
///
/// The file is the 128-byte header followed by one miMATRIX element
/// wrapping four sub-elements: array flags, dimensions, variable name,
/// and the column-major values. Only this subset of the format is
/// emitted; `matfile` reads it back in the tests.
fn write_mat_level5(path: &Path, var_name: &str, dimensions: &[usize], data: &[f64]) -> Result<()> {
    // Serialize each sub-element's payload up front so the enclosing
    // miMATRIX tag can carry the total size.
    let mut flags = Vec::with_capacity(8);
    flags.extend_from_slice(&MX_DOUBLE_CLASS.to_le_bytes());
    flags.extend_from_slice(&[0u8; 4]);

    let mut dims = Vec::with_capacity(4 * dimensions.len());
    for &d in dimensions {
        dims.extend_from_slice(&(d as i32).to_le_bytes());
    }

    let mut values = Vec::with_capacity(8 * data.len());
    for &v in data {
        values.extend_from_slice(&v.to_le_bytes());
    }

    let name = var_name.as_bytes();
    let payload: usize = [flags.len(), dims.len(), name.len(), values.len()]
        .iter()
        .map(|&len| 8 + mat_padded_len(len))
        .sum();

    let file = std::fs::File::create(path)?;
    let mut w = std::io::BufWriter::new(file);

    write_mat_header(&mut w)?;
    w.write_all(&MI_MATRIX.to_le_bytes())?;
    w.write_all(&(payload as u32).to_le_bytes())?;
    write_mat_sub_element(&mut w, MI_UINT32, &flags)?;
    write_mat_sub_element(&mut w, MI_INT32, &dims)?;
    write_mat_sub_element(&mut w, MI_INT8, name)?;
    write_mat_sub_element(&mut w, MI_DOUBLE, &values)?;

    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Grid;

    fn make_test_field_2d() -> Vec<f64> {
        let mut grid = Grid::<f64, 2>::new([4, 3], 0.0);
        for j in 0..3 {
            for i in 0..4 {
                *grid.cell_mut([i, j]) = (10 * i + j) as f64;
            }
        }
        grid.into_cells()
    }

    #[test]
    fn npy_roundtrip() {
        let field = make_test_field_2d();
        let tmp = std::env::temp_dir().join("fmm_test_roundtrip.npy");
        save_npy(&field, &[4, 3], &tmp).unwrap();

        let loaded = load_npy_field(&tmp, &[4, 3]).unwrap();
        assert_eq!(loaded, field);
        std::fs::remove_file(&tmp).ok();
    }

    #[test]
    fn npy_shape_mismatch() {
        let field = make_test_field_2d();
        let tmp = std::env::temp_dir().join("fmm_test_shape_mismatch.npy");
        save_npy(&field, &[4, 3], &tmp).unwrap();

        let result = load_npy_field(&tmp, &[3, 4]);
        assert!(matches!(result, Err(FmmError::ShapeMismatch { .. })));
        std::fs::remove_file(&tmp).ok();
    }

    #[test]
    fn mat_roundtrip() {
        let field = make_test_field_2d();
        let tmp = std::env::temp_dir().join("fmm_test_roundtrip.mat");
        save_mat(&field, &[4, 3], &tmp, "distance").unwrap();

        let loaded = load_mat_field(&tmp, "distance", &[4, 3]).unwrap();
        assert_eq!(loaded, field);
        std::fs::remove_file(&tmp).ok();
    }

    #[test]
    fn mat_missing_variable() {
        let field = make_test_field_2d();
        let tmp = std::env::temp_dir().join("fmm_test_missing_var.mat");
        save_mat(&field, &[4, 3], &tmp, "distance").unwrap();

        let result = load_mat_field(&tmp, "traveltime", &[4, 3]);
        assert!(matches!(result, Err(FmmError::MatVariableNotFound { .. })));
        std::fs::remove_file(&tmp).ok();
    }

    #[test]
    fn save_field_dispatches_on_extension() {
        let field = make_test_field_2d();
        let npy = std::env::temp_dir().join("fmm_test_dispatch.npy");
        let mat = std::env::temp_dir().join("fmm_test_dispatch.mat");
        save_field(&field, &[4, 3], &npy).unwrap();
        save_field(&field, &[4, 3], &mat).unwrap();
        assert_eq!(load_field(&npy, &[4, 3]).unwrap(), field);
        assert_eq!(load_field(&mat, &[4, 3]).unwrap(), field);
        std::fs::remove_file(&npy).ok();
        std::fs::remove_file(&mat).ok();
    }

    #[test]
    fn unsupported_format() {
        let result = infer_format(Path::new("field.xyz"));
        assert!(matches!(result, Err(FmmError::UnsupportedFileFormat(_))));
        let result = infer_format(Path::new("field"));
        assert!(matches!(result, Err(FmmError::UnsupportedFileFormat(_))));
    }

    #[test]
    fn sources_roundtrip_npy() {
        // Two 2-D sources: rows are [i, j, distance, nx, ny].
        let rows = ndarray::arr2(&[
            [2.0, 3.0, 0.5, 1.0, 0.0],
            [4.0, 1.0, -0.25, 0.0, -1.0],
        ]);
        let tmp = std::env::temp_dir().join("fmm_test_sources.npy");
        ndarray_npy::write_npy(&tmp, &rows).unwrap();

        let (indices, distances, normals) = load_sources::<2>(&tmp).unwrap();
        assert_eq!(indices, vec![[2, 3], [4, 1]]);
        assert_eq!(distances, vec![0.5, -0.25]);
        assert_eq!(normals, vec![[1.0, 0.0], [0.0, -1.0]]);
        std::fs::remove_file(&tmp).ok();
    }

    #[test]
    fn sources_wrong_column_count() {
        let rows = ndarray::arr2(&[[2.0, 3.0, 0.5]]);
        let tmp = std::env::temp_dir().join("fmm_test_sources_bad.npy");
        ndarray_npy::write_npy(&tmp, &rows).unwrap();

        let result = load_sources::<2>(&tmp);
        assert!(matches!(result, Err(FmmError::ShapeMismatch { .. })));
        std::fs::remove_file(&tmp).ok();
    }

    #[test]
    fn mat_reversed_dims_reordered() {
        // A writer using row-major convention stores the transpose: C-order
        // data under reversed dimensions.
        let field = make_test_field_2d();
        let arr = ArrayD::from_shape_vec(IxDyn(&[4, 3]).f(), field.clone()).unwrap();
        let c_order = arr.as_standard_layout().to_owned().into_raw_vec();
        let tmp = std::env::temp_dir().join("fmm_test_mat_reversed.mat");
        write_mat_level5(&tmp, "distance", &[3, 4], &c_order).unwrap();

        let loaded = load_mat_field(&tmp, "distance", &[4, 3]).unwrap();
        assert_eq!(loaded, field);
        std::fs::remove_file(&tmp).ok();
    }
}
