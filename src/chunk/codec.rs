//! Chunk binary codec: outer container framing + inner typed payload.
//! All integers little-endian, floats IEEE-754 LE.

use crate::error::{Error, Result};
use crate::geo::LatLon;

use super::model::{CellEntry, Chunk, Node, Segment};

const OUTER_MAGIC: &[u8; 4] = b"IARC";
const INNER_MAGIC: &[u8; 4] = b"IAR1";
const CONTAINER_VERSION: u16 = 1;
const PAYLOAD_VERSION: u16 = 1;

const COMPRESSION_RAW: u16 = 0;
const COMPRESSION_LZFSE: u16 = 1;

/// A small cursor over a byte slice that tracks how much has been consumed,
/// turning truncation into a typed [`Error::InvalidHeader`] instead of a panic.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| Error::InvalidHeader("unexpected end of chunk data".into()))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into().unwrap()))
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn i16(&mut self) -> Result<i16> {
        Ok(i16::from_le_bytes(self.take(2)?.try_into().unwrap()))
    }

    fn i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn remaining(&self) -> &'a [u8] {
        &self.bytes[self.pos..]
    }
}

/// Parse the outer container, decompress if needed, and parse the inner
/// payload into a [`Chunk`].
pub fn parse_container(bytes: &[u8]) -> Result<Chunk> {
    let mut r = Reader::new(bytes);

    let magic = r.take(4)?;
    if magic != OUTER_MAGIC {
        return Err(Error::InvalidHeader(format!(
            "bad outer magic {:?}, expected IARC",
            magic
        )));
    }

    let version = r.u16()?;
    if version != CONTAINER_VERSION {
        return Err(Error::UnsupportedVersion(format!(
            "container version {version}"
        )));
    }

    let compression = r.u16()?;
    let uncomp_size = r.u32()? as usize;
    let payload = r.remaining();

    let decompressed: std::borrow::Cow<[u8]> = match compression {
        COMPRESSION_RAW => std::borrow::Cow::Borrowed(payload),
        COMPRESSION_LZFSE => {
            let mut dst = vec![0u8; uncomp_size];
            let written = lzfse::decode_buffer(payload, &mut dst);
            if written == 0 {
                return Err(Error::DecompressionFailed(
                    "lzfse decoder reported 0 bytes".into(),
                ));
            }
            if written != uncomp_size {
                return Err(Error::DecompressionFailed(format!(
                    "decoded {written} bytes, expected {uncomp_size}"
                )));
            }
            std::borrow::Cow::Owned(dst)
        }
        other => {
            return Err(Error::UnsupportedVersion(format!(
                "compression code {other}"
            )))
        }
    };

    parse_payload(&decompressed)
}

fn parse_payload(bytes: &[u8]) -> Result<Chunk> {
    let mut r = Reader::new(bytes);

    let magic = r.take(4)?;
    if magic != INNER_MAGIC {
        return Err(Error::InvalidHeader(format!(
            "bad inner magic {:?}, expected IAR1",
            magic
        )));
    }

    let version = r.u16()?;
    if version != PAYLOAD_VERSION {
        return Err(Error::UnsupportedVersion(format!(
            "payload version {version}"
        )));
    }
    let _padding = r.u16()?;

    let origin_lat = r.f64()?;
    let origin_lon = r.f64()?;
    let cell_size = r.f32()?;
    let grid_width = r.u16()?;
    let grid_height = r.u16()?;

    let strings_n = r.u32()? as usize;
    let nodes_n = r.u32()? as usize;
    let segments_n = r.u32()? as usize;
    let shapes_n = r.u32()? as usize;
    let node_edges_n = r.u32()? as usize;
    let cell_entries_n = r.u32()? as usize;
    let cell_segments_n = r.u32()? as usize;
    let string_bytes = r.u32()? as usize;

    let mut string_offsets = Vec::with_capacity(strings_n + 1);
    for _ in 0..=strings_n {
        string_offsets.push(r.u32()? as usize);
    }
    for w in string_offsets.windows(2) {
        if w[1] < w[0] {
            return Err(Error::InvalidHeader("string offsets not monotonic".into()));
        }
    }
    if string_offsets.last() != Some(&string_bytes) {
        return Err(Error::InvalidHeader(
            "last string offset must equal stringBytes".into(),
        ));
    }

    let string_data = r.take(string_bytes)?;
    let mut strings = Vec::with_capacity(strings_n);
    for w in string_offsets.windows(2) {
        let slice = string_data
            .get(w[0]..w[1])
            .ok_or_else(|| Error::InvalidHeader("string offset out of range".into()))?;
        strings.push(String::from_utf8_lossy(slice).into_owned());
    }

    let mut nodes = Vec::with_capacity(nodes_n);
    for _ in 0..nodes_n {
        let lat_e7 = r.i32()?;
        let lon_e7 = r.i32()?;
        let edge_start = r.u32()?;
        let edge_count = r.u16()?;
        let _pad = r.u16()?;
        nodes.push(Node {
            lat_e7,
            lon_e7,
            edge_start,
            edge_count,
        });
    }

    let mut segments = Vec::with_capacity(segments_n);
    for _ in 0..segments_n {
        let name_index = r.u32()?;
        let node_a = r.u32()?;
        let node_b = r.u32()?;
        let shape_start = r.u32()?;
        let shape_count = r.u16()?;
        let flags = r.u16()?;
        let bearing_ab = r.i16()?;
        let bearing_ba = r.i16()?;

        if node_a as usize >= nodes_n || node_b as usize >= nodes_n {
            return Err(Error::InvalidHeader(format!(
                "segment references out-of-range node ({node_a}, {node_b})"
            )));
        }
        if shape_count > 0 && shape_start as usize + shape_count as usize > shapes_n {
            return Err(Error::InvalidHeader(
                "segment shape range out of range".into(),
            ));
        }

        segments.push(Segment {
            name_index,
            node_a,
            node_b,
            shape_start,
            shape_count,
            flags,
            bearing_ab,
            bearing_ba,
        });
    }

    let mut shapes = Vec::with_capacity(shapes_n);
    for _ in 0..shapes_n {
        let lat_e7 = r.i32()?;
        let lon_e7 = r.i32()?;
        shapes.push(LatLon::new(lat_e7 as f64 * 1e-7, lon_e7 as f64 * 1e-7));
    }

    let mut node_edges = Vec::with_capacity(node_edges_n);
    for _ in 0..node_edges_n {
        let seg_idx = r.u32()?;
        if seg_idx as usize >= segments_n {
            return Err(Error::InvalidHeader(
                "nodeEdges references out-of-range segment".into(),
            ));
        }
        node_edges.push(seg_idx);
    }

    let mut cell_entries = Vec::with_capacity(cell_entries_n);
    let mut prev_cell_id: Option<u32> = None;
    for _ in 0..cell_entries_n {
        let cell_id = r.u32()?;
        let seg_start = r.u32()?;
        let seg_count = r.u16()?;
        let _pad = r.u16()?;

        if let Some(prev) = prev_cell_id {
            if cell_id < prev {
                return Err(Error::InvalidHeader(
                    "cellEntries not sorted ascending by cellId".into(),
                ));
            }
        }
        prev_cell_id = Some(cell_id);

        if seg_start as usize + seg_count as usize > cell_segments_n {
            return Err(Error::InvalidHeader(
                "cellEntries segment range out of range".into(),
            ));
        }

        cell_entries.push(CellEntry {
            cell_id,
            seg_start,
            seg_count,
        });
    }

    let mut cell_segments = Vec::with_capacity(cell_segments_n);
    for _ in 0..cell_segments_n {
        let seg_idx = r.u32()?;
        if seg_idx as usize >= segments_n {
            return Err(Error::InvalidHeader(
                "cellSegments references out-of-range segment".into(),
            ));
        }
        cell_segments.push(seg_idx);
    }

    Ok(Chunk {
        origin_lat,
        origin_lon,
        cell_size_meters: cell_size,
        grid_width,
        grid_height,
        strings,
        nodes,
        segments,
        shapes,
        node_edges,
        cell_entries,
        cell_segments,
    })
}

/// Serialize a chunk's inner payload bytes (no outer container framing).
/// Used by tests exercising codec round-trips and by offline
/// chunk-generation tooling outside this crate's scope.
pub fn write_payload(chunk: &Chunk) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(INNER_MAGIC);
    out.extend_from_slice(&PAYLOAD_VERSION.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&chunk.origin_lat.to_le_bytes());
    out.extend_from_slice(&chunk.origin_lon.to_le_bytes());
    out.extend_from_slice(&chunk.cell_size_meters.to_le_bytes());
    out.extend_from_slice(&chunk.grid_width.to_le_bytes());
    out.extend_from_slice(&chunk.grid_height.to_le_bytes());

    out.extend_from_slice(&(chunk.strings.len() as u32).to_le_bytes());
    out.extend_from_slice(&(chunk.nodes.len() as u32).to_le_bytes());
    out.extend_from_slice(&(chunk.segments.len() as u32).to_le_bytes());
    out.extend_from_slice(&(chunk.shapes.len() as u32).to_le_bytes());
    out.extend_from_slice(&(chunk.node_edges.len() as u32).to_le_bytes());
    out.extend_from_slice(&(chunk.cell_entries.len() as u32).to_le_bytes());
    out.extend_from_slice(&(chunk.cell_segments.len() as u32).to_le_bytes());

    let mut string_data = Vec::new();
    let mut offsets = Vec::with_capacity(chunk.strings.len() + 1);
    offsets.push(0u32);
    for s in &chunk.strings {
        string_data.extend_from_slice(s.as_bytes());
        offsets.push(string_data.len() as u32);
    }
    out.extend_from_slice(&(string_data.len() as u32).to_le_bytes());
    for off in &offsets {
        out.extend_from_slice(&off.to_le_bytes());
    }
    out.extend_from_slice(&string_data);

    for n in &chunk.nodes {
        out.extend_from_slice(&n.lat_e7.to_le_bytes());
        out.extend_from_slice(&n.lon_e7.to_le_bytes());
        out.extend_from_slice(&n.edge_start.to_le_bytes());
        out.extend_from_slice(&n.edge_count.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
    }

    for s in &chunk.segments {
        out.extend_from_slice(&s.name_index.to_le_bytes());
        out.extend_from_slice(&s.node_a.to_le_bytes());
        out.extend_from_slice(&s.node_b.to_le_bytes());
        out.extend_from_slice(&s.shape_start.to_le_bytes());
        out.extend_from_slice(&s.shape_count.to_le_bytes());
        out.extend_from_slice(&s.flags.to_le_bytes());
        out.extend_from_slice(&s.bearing_ab.to_le_bytes());
        out.extend_from_slice(&s.bearing_ba.to_le_bytes());
    }

    for p in &chunk.shapes {
        out.extend_from_slice(&((p.lat * 1e7).round() as i32).to_le_bytes());
        out.extend_from_slice(&((p.lon * 1e7).round() as i32).to_le_bytes());
    }

    for &e in &chunk.node_edges {
        out.extend_from_slice(&e.to_le_bytes());
    }

    for c in &chunk.cell_entries {
        out.extend_from_slice(&c.cell_id.to_le_bytes());
        out.extend_from_slice(&c.seg_start.to_le_bytes());
        out.extend_from_slice(&c.seg_count.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
    }

    for &s in &chunk.cell_segments {
        out.extend_from_slice(&s.to_le_bytes());
    }

    out
}

/// Wrap a payload in the outer container with the given compression code.
/// `compression` must be `0` (raw) or `1` (LZFSE).
pub fn write_container(payload: &[u8], compression: u16) -> Result<Vec<u8>> {
    let body = match compression {
        COMPRESSION_RAW => payload.to_vec(),
        COMPRESSION_LZFSE => {
            let mut dst = vec![0u8; payload.len() + payload.len() / 2 + 64];
            let written = lzfse::encode_buffer(payload, &mut dst);
            if written == 0 {
                return Err(Error::DecompressionFailed(
                    "lzfse encoder reported 0 bytes".into(),
                ));
            }
            dst.truncate(written);
            dst
        }
        other => {
            return Err(Error::UnsupportedVersion(format!(
                "compression code {other}"
            )))
        }
    };

    let mut out = Vec::with_capacity(body.len() + 12);
    out.extend_from_slice(OUTER_MAGIC);
    out.extend_from_slice(&CONTAINER_VERSION.to_le_bytes());
    out.extend_from_slice(&compression.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::model::{FLAG_LINK, FLAG_ONEWAY};

    fn sample_chunk() -> Chunk {
        Chunk {
            origin_lat: 40.0,
            origin_lon: -73.0,
            cell_size_meters: 100.0,
            grid_width: 4,
            grid_height: 4,
            strings: vec!["Main St".to_string(), "".to_string()],
            nodes: vec![
                Node {
                    lat_e7: 400_000_000,
                    lon_e7: -730_000_000,
                    edge_start: 0,
                    edge_count: 1,
                },
                Node {
                    lat_e7: 400_010_000,
                    lon_e7: -730_000_000,
                    edge_start: 1,
                    edge_count: 1,
                },
            ],
            segments: vec![Segment {
                name_index: 0,
                node_a: 0,
                node_b: 1,
                shape_start: 0,
                shape_count: 0,
                flags: FLAG_ONEWAY | FLAG_LINK | (1 << 15),
                bearing_ab: 0,
                bearing_ba: 180,
            }],
            shapes: vec![],
            node_edges: vec![0, 0],
            cell_entries: vec![CellEntry {
                cell_id: 0,
                seg_start: 0,
                seg_count: 1,
            }],
            cell_segments: vec![0],
        }
    }

    #[test]
    fn raw_round_trip_matches_structurally() {
        let chunk = sample_chunk();
        let payload = write_payload(&chunk);
        let container = write_container(&payload, 0).unwrap();
        let parsed = parse_container(&container).unwrap();

        assert_eq!(parsed.origin_lat, chunk.origin_lat);
        assert_eq!(parsed.origin_lon, chunk.origin_lon);
        assert_eq!(parsed.grid_width, chunk.grid_width);
        assert_eq!(parsed.strings, chunk.strings);
        assert_eq!(parsed.nodes.len(), chunk.nodes.len());
        assert_eq!(parsed.segments[0].node_a, chunk.segments[0].node_a);
        assert_eq!(parsed.segments[0].flags, chunk.segments[0].flags);
        assert_eq!(parsed.cell_entries[0].cell_id, chunk.cell_entries[0].cell_id);
    }

    #[test]
    fn unknown_flag_bits_survive() {
        let chunk = sample_chunk();
        let payload = write_payload(&chunk);
        let parsed = parse_payload(&payload).unwrap();
        assert_eq!(parsed.segments[0].flags, chunk.segments[0].flags);
        assert_eq!(parsed.segments[0].flags & (1 << 15), 1 << 15);
    }

    #[test]
    fn bad_magic_is_invalid_header() {
        let bytes = b"XXXX\x01\x00\x00\x00\x00\x00\x00\x00";
        match parse_container(bytes) {
            Err(Error::InvalidHeader(_)) => {}
            other => panic!("expected InvalidHeader, got {other:?}"),
        }
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(OUTER_MAGIC);
        bytes.extend_from_slice(&99u16.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        match parse_container(&bytes) {
            Err(Error::UnsupportedVersion(_)) => {}
            other => panic!("expected UnsupportedVersion, got {other:?}"),
        }
    }

    #[test]
    fn truncated_header_is_invalid_header() {
        let bytes = b"IARC\x01\x00";
        match parse_container(bytes) {
            Err(Error::InvalidHeader(_)) => {}
            other => panic!("expected InvalidHeader, got {other:?}"),
        }
    }

    #[test]
    fn out_of_range_node_index_is_invalid_header() {
        let mut chunk = sample_chunk();
        chunk.segments[0].node_b = 99;
        let payload = write_payload(&chunk);
        match parse_payload(&payload) {
            Err(Error::InvalidHeader(_)) => {}
            other => panic!("expected InvalidHeader, got {other:?}"),
        }
    }

    #[test]
    fn out_of_range_string_index_yields_empty_string() {
        let chunk = sample_chunk();
        let payload = write_payload(&chunk);
        let parsed = parse_payload(&payload).unwrap();
        let mut seg = parsed.segments[0];
        seg.name_index = 999;
        assert_eq!(parsed.segment_name(&seg), "");
    }
}
