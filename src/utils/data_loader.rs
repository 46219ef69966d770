//! This module provides the matrix storage collaborator.
//!
//! Component matrices are read from Matrix Market files and persisted eigenvectors are
//! written back in the same family of formats:
//!
//! - `coordinate` files (`real`, `integer`, `complex` or `pattern` entries, with
//!   `general`, `symmetric`, `skew-symmetric` or `hermitian` symmetry) load as sparse
//!   matrices;
//! - `array` files (`general` only) load as sparse matrices holding their nonzeros, and
//!   vectors are written as `array complex general` files with one column.
//!
//! The [`MatrixStore`] trait is the seam the sweep depends on; [`MatrixMarketStore`]
//! is the implementation used by the binary.

use faer::{
    Mat, MatRef, c64,
    sparse::{SparseColMat, Triplet},
};
use std::{
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::Path,
};
use thiserror::Error;

/// Represents all possible errors that can occur while reading or writing matrix files.
#[derive(Error, Debug)]
pub enum DataLoaderError {
    /// Wraps a standard I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Occurs when a string cannot be parsed into an integer.
    #[error("Parse error: Failed to parse integer from '{0}'")]
    ParseInt(String),
    /// Occurs when a string cannot be parsed into a float.
    #[error("Parse error: Failed to parse float from '{0}'")]
    ParseFloat(String),
    /// Occurs if the `%%MatrixMarket` banner is missing or malformed.
    #[error("Format error: The '%%MatrixMarket' header was not found or was malformed.")]
    HeaderMissing,
    /// Occurs for header combinations this loader does not handle.
    #[error("Format error: Unsupported Matrix Market variant '{0}'.")]
    Unsupported(String),
    /// Occurs when the end of a file is reached unexpectedly during parsing.
    #[error("Format error: Unexpected end of file while reading data.")]
    UnexpectedEof,
    /// Occurs when an entry addresses a position outside the declared dimensions.
    #[error("Format error: Entry ({row}, {col}) lies outside a {nrows}x{ncols} matrix.")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        nrows: usize,
        ncols: usize,
    },
    /// Occurs if the sparse matrix construction fails internally.
    #[error("Internal error: Failed to construct the sparse matrix from triplets.")]
    SparseMatrixConstructionError,
}

/// Storage collaborator: loads component matrices and persists solution vectors.
pub trait MatrixStore {
    /// Loads a sparse matrix from `path`.
    fn load_sparse(&self, path: &Path) -> Result<SparseColMat<usize, c64>, DataLoaderError>;

    /// Writes a single-column vector to `path`.
    fn write_vector(&self, path: &Path, vector: MatRef<'_, c64>) -> Result<(), DataLoaderError>;
}

/// [`MatrixStore`] backed by Matrix Market files on the local file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct MatrixMarketStore;

impl MatrixStore for MatrixMarketStore {
    fn load_sparse(&self, path: &Path) -> Result<SparseColMat<usize, c64>, DataLoaderError> {
        load_matrix_market(path)
    }

    fn write_vector(&self, path: &Path, vector: MatRef<'_, c64>) -> Result<(), DataLoaderError> {
        write_vector_market(path, vector)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Coordinate,
    Array,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Real,
    Complex,
    Pattern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Symmetry {
    General,
    Symmetric,
    SkewSymmetric,
    Hermitian,
}

#[derive(Debug, Clone, Copy)]
struct Header {
    layout: Layout,
    field: Field,
    symmetry: Symmetry,
}

/// Parses the `%%MatrixMarket matrix <layout> <field> <symmetry>` banner.
fn parse_header(line: &str) -> Result<Header, DataLoaderError> {
    let parts: Vec<String> = line
        .split_whitespace()
        .map(|s| s.to_ascii_lowercase())
        .collect();
    if parts.len() != 5 || parts[0] != "%%matrixmarket" {
        return Err(DataLoaderError::HeaderMissing);
    }
    if parts[1] != "matrix" {
        return Err(DataLoaderError::Unsupported(parts[1].clone()));
    }

    let layout = match parts[2].as_str() {
        "coordinate" => Layout::Coordinate,
        "array" => Layout::Array,
        other => return Err(DataLoaderError::Unsupported(other.to_string())),
    };
    let field = match parts[3].as_str() {
        "real" | "double" | "integer" => Field::Real,
        "complex" => Field::Complex,
        "pattern" => Field::Pattern,
        other => return Err(DataLoaderError::Unsupported(other.to_string())),
    };
    let symmetry = match parts[4].as_str() {
        "general" => Symmetry::General,
        "symmetric" => Symmetry::Symmetric,
        "skew-symmetric" => Symmetry::SkewSymmetric,
        "hermitian" => Symmetry::Hermitian,
        other => return Err(DataLoaderError::Unsupported(other.to_string())),
    };

    // Array files are only accepted in their plain form; patterns have no array layout.
    if layout == Layout::Array && (symmetry != Symmetry::General || field == Field::Pattern) {
        return Err(DataLoaderError::Unsupported(line.trim().to_string()));
    }

    Ok(Header {
        layout,
        field,
        symmetry,
    })
}

fn parse_usize(token: &str) -> Result<usize, DataLoaderError> {
    token
        .parse::<usize>()
        .map_err(|_| DataLoaderError::ParseInt(token.to_string()))
}

fn parse_f64(token: &str) -> Result<f64, DataLoaderError> {
    token
        .parse::<f64>()
        .map_err(|_| DataLoaderError::ParseFloat(token.to_string()))
}

/// Parses the value tokens of one entry according to the header's field.
fn parse_value(tokens: &[&str], field: Field) -> Result<c64, DataLoaderError> {
    match field {
        Field::Pattern => Ok(c64::new(1.0, 0.0)),
        Field::Real => {
            let re = tokens.first().ok_or(DataLoaderError::UnexpectedEof)?;
            Ok(c64::new(parse_f64(re)?, 0.0))
        }
        Field::Complex => {
            let (re, im) = match tokens {
                [re, im, ..] => (re, im),
                _ => return Err(DataLoaderError::UnexpectedEof),
            };
            Ok(c64::new(parse_f64(re)?, parse_f64(im)?))
        }
    }
}

/// Returns the next line that is neither blank nor a comment.
fn next_data_line(
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> Result<Option<String>, DataLoaderError> {
    for line in lines {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('%') {
            continue;
        }
        return Ok(Some(trimmed.to_string()));
    }
    Ok(None)
}

/// Loads a Matrix Market file into a sparse column matrix of complex entries.
///
/// Entries stored only once for a symmetric, skew-symmetric or hermitian matrix are
/// mirrored into the other triangle. Duplicate coordinates are summed.
pub fn load_matrix_market(
    path: impl AsRef<Path>,
) -> Result<SparseColMat<usize, c64>, DataLoaderError> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = reader.lines();

    let banner = lines.next().ok_or(DataLoaderError::HeaderMissing)??;
    let header = parse_header(&banner)?;

    let size_line = next_data_line(&mut lines)?.ok_or(DataLoaderError::UnexpectedEof)?;
    let sizes: Vec<&str> = size_line.split_whitespace().collect();

    let mut triplets: Vec<Triplet<usize, usize, c64>> = Vec::new();
    let (nrows, ncols) = match header.layout {
        Layout::Coordinate => {
            let &[nrows, ncols, nnz] = sizes.as_slice() else {
                return Err(DataLoaderError::UnexpectedEof);
            };
            let (nrows, ncols, nnz) = (parse_usize(nrows)?, parse_usize(ncols)?, parse_usize(nnz)?);
            triplets.reserve(if header.symmetry == Symmetry::General { nnz } else { 2 * nnz });

            for _ in 0..nnz {
                let line = next_data_line(&mut lines)?.ok_or(DataLoaderError::UnexpectedEof)?;
                let parts: Vec<&str> = line.split_whitespace().collect();
                if parts.len() < 2 {
                    return Err(DataLoaderError::UnexpectedEof);
                }
                // Matrix Market indices are 1-based.
                let row = parse_usize(parts[0])?;
                let col = parse_usize(parts[1])?;
                if row == 0 || col == 0 || row > nrows || col > ncols {
                    return Err(DataLoaderError::IndexOutOfBounds {
                        row,
                        col,
                        nrows,
                        ncols,
                    });
                }
                let (row, col) = (row - 1, col - 1);
                let val = parse_value(&parts[2..], header.field)?;
                triplets.push(Triplet { row, col, val });

                if row != col {
                    let mirrored = match header.symmetry {
                        Symmetry::General => None,
                        Symmetry::Symmetric => Some(val),
                        Symmetry::SkewSymmetric => Some(-val),
                        Symmetry::Hermitian => Some(val.conj()),
                    };
                    if let Some(val) = mirrored {
                        triplets.push(Triplet {
                            row: col,
                            col: row,
                            val,
                        });
                    }
                }
            }
            (nrows, ncols)
        }
        Layout::Array => {
            let &[nrows, ncols] = sizes.as_slice() else {
                return Err(DataLoaderError::UnexpectedEof);
            };
            let (nrows, ncols) = (parse_usize(nrows)?, parse_usize(ncols)?);
            // Array entries are listed in column-major order.
            for col in 0..ncols {
                for row in 0..nrows {
                    let line = next_data_line(&mut lines)?.ok_or(DataLoaderError::UnexpectedEof)?;
                    let parts: Vec<&str> = line.split_whitespace().collect();
                    let val = parse_value(&parts, header.field)?;
                    if val != c64::new(0.0, 0.0) {
                        triplets.push(Triplet { row, col, val });
                    }
                }
            }
            (nrows, ncols)
        }
    };

    SparseColMat::try_new_from_triplets(nrows, ncols, &triplets)
        .map_err(|_| DataLoaderError::SparseMatrixConstructionError)
}

/// Writes a single-column vector as a Matrix Market `array complex general` file.
///
/// Values are printed with Rust's shortest round-trip float formatting, so reading the
/// file back reproduces the vector exactly.
pub fn write_vector_market(
    path: impl AsRef<Path>,
    vector: MatRef<'_, c64>,
) -> Result<(), DataLoaderError> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "%%MatrixMarket matrix array complex general")?;
    writeln!(writer, "{} {}", vector.nrows(), vector.ncols())?;
    for col in 0..vector.ncols() {
        for row in 0..vector.nrows() {
            let z = vector[(row, col)];
            writeln!(writer, "{:e} {:e}", z.re, z.im)?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Reads a Matrix Market `array` file back into a dense matrix.
pub fn read_vector_market(path: impl AsRef<Path>) -> Result<Mat<c64>, DataLoaderError> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = reader.lines();

    let banner = lines.next().ok_or(DataLoaderError::HeaderMissing)??;
    let header = parse_header(&banner)?;
    if header.layout != Layout::Array {
        return Err(DataLoaderError::Unsupported(banner.trim().to_string()));
    }

    let size_line = next_data_line(&mut lines)?.ok_or(DataLoaderError::UnexpectedEof)?;
    let sizes: Vec<&str> = size_line.split_whitespace().collect();
    let &[nrows, ncols] = sizes.as_slice() else {
        return Err(DataLoaderError::UnexpectedEof);
    };
    let (nrows, ncols) = (parse_usize(nrows)?, parse_usize(ncols)?);

    let mut out = Mat::<c64>::zeros(nrows, ncols);
    for col in 0..ncols {
        for row in 0..nrows {
            let line = next_data_line(&mut lines)?.ok_or(DataLoaderError::UnexpectedEof)?;
            let parts: Vec<&str> = line.split_whitespace().collect();
            out[(row, col)] = parse_value(&parts, header.field)?;
        }
    }
    Ok(out)
}
