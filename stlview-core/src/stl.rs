/// STL file parser for binary and ASCII formats
use nom::{
    bytes::complete::{tag, take_while},
    character::complete::{multispace0, multispace1},
    multi::many0,
    number::complete::float,
    sequence::preceded,
    IResult,
};
use thiserror::Error;

use crate::geometry::{Triangle, TriangleMesh, Vertex};

const BINARY_HEADER_LEN: usize = 80;
const BINARY_RECORD_LEN: usize = 50;

/// Failures while decoding an STL container
#[derive(Debug, Error)]
pub enum StlError {
    #[error("file too small to be a valid STL ({0} bytes)")]
    TooShort(usize),
    #[error("unexpected end of file in triangle record {index}")]
    Truncated { index: usize },
    #[error("ASCII STL syntax error: {0}")]
    Ascii(String),
}

/// Parse a binary STL file
pub fn parse_binary_stl(data: &[u8]) -> Result<TriangleMesh, StlError> {
    if data.len() < BINARY_HEADER_LEN + 4 {
        return Err(StlError::TooShort(data.len()));
    }

    // 80-byte header, then little-endian triangle count
    let body = &data[BINARY_HEADER_LEN..];
    let triangle_count = u32::from_le_bytes([body[0], body[1], body[2], body[3]]) as usize;
    let mut rest = &body[4..];

    // The declared count is untrusted; reserve no more than the payload
    // can hold and let the per-record length check reject the shortfall.
    let mut mesh = TriangleMesh::with_capacity(triangle_count.min(rest.len() / BINARY_RECORD_LEN));

    for index in 0..triangle_count {
        if rest.len() < BINARY_RECORD_LEN {
            return Err(StlError::Truncated { index });
        }

        let (nx, ny, nz) = (read_f32(rest, 0), read_f32(rest, 4), read_f32(rest, 8));
        let mut vertices = [Vertex::new(0.0, 0.0, 0.0, nx, ny, nz); 3];
        for (i, vertex) in vertices.iter_mut().enumerate() {
            let at = 12 + i * 12;
            *vertex = Vertex::new(
                read_f32(rest, at),
                read_f32(rest, at + 4),
                read_f32(rest, at + 8),
                nx,
                ny,
                nz,
            );
        }
        mesh.push(Triangle::new(vertices[0], vertices[1], vertices[2]));

        // Record ends with a 2-byte attribute count we ignore
        rest = &rest[BINARY_RECORD_LEN..];
    }

    Ok(mesh)
}

fn read_f32(data: &[u8], at: usize) -> f32 {
    f32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

/// Parse an ASCII STL file
pub fn parse_ascii_stl(input: &str) -> Result<TriangleMesh, StlError> {
    match parse_ascii_stl_impl(input) {
        Ok((_, mesh)) => Ok(mesh),
        Err(e) => Err(StlError::Ascii(e.to_string())),
    }
}

fn parse_ascii_stl_impl(input: &str) -> IResult<&str, TriangleMesh> {
    let (input, _) = preceded(multispace0, tag("solid"))(input)?;
    let (input, _) = take_while(|c| c != '\n')(input)?; // Optional solid name
    let (input, triangles) = many0(parse_facet)(input)?;
    let (input, _) = preceded(multispace0, tag("endsolid"))(input)?;

    let mut mesh = TriangleMesh::with_capacity(triangles.len());
    for triangle in triangles {
        mesh.push(triangle);
    }

    Ok((input, mesh))
}

fn parse_facet(input: &str) -> IResult<&str, Triangle> {
    let (input, _) = preceded(multispace0, tag("facet"))(input)?;
    let (input, _) = preceded(multispace1, tag("normal"))(input)?;
    let (input, normal) = parse_vector3(input)?;
    let (input, _) = preceded(multispace0, tag("outer"))(input)?;
    let (input, _) = preceded(multispace1, tag("loop"))(input)?;
    let (input, v1) = parse_vertex(input, normal)?;
    let (input, v2) = parse_vertex(input, normal)?;
    let (input, v3) = parse_vertex(input, normal)?;
    let (input, _) = preceded(multispace0, tag("endloop"))(input)?;
    let (input, _) = preceded(multispace0, tag("endfacet"))(input)?;

    Ok((input, Triangle::new(v1, v2, v3)))
}

fn parse_vertex(input: &str, normal: (f32, f32, f32)) -> IResult<&str, Vertex> {
    let (input, _) = preceded(multispace0, tag("vertex"))(input)?;
    let (input, (x, y, z)) = parse_vector3(input)?;
    Ok((input, Vertex::new(x, y, z, normal.0, normal.1, normal.2)))
}

fn parse_vector3(input: &str) -> IResult<&str, (f32, f32, f32)> {
    let (input, _) = multispace0(input)?;
    let (input, x) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, y) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, z) = float(input)?;
    Ok((input, (x, y, z)))
}

/// Detect and parse STL data (binary or ASCII)
pub fn parse_stl(data: &[u8]) -> Result<TriangleMesh, StlError> {
    // A leading "solid" suggests ASCII, but binary exporters are known to
    // write it too, so fall through to binary when ASCII parsing fails.
    if data.len() > 5 && &data[0..5] == b"solid" {
        if let Ok(text) = std::str::from_utf8(data) {
            if let Ok(mesh) = parse_ascii_stl(text) {
                return Ok(mesh);
            }
        }
    }

    parse_binary_stl(data)
}
