use crate::error::SpeError;
use crate::types::header::{
    DATA_OFFSET, FOOTER_OFFSET_POS, Header, LEGACY_FRAME_COUNT_POS, LEGACY_HEIGHT_POS,
    LEGACY_PIXEL_TYPE_POS, LEGACY_WIDTH_POS, LegacyHeader, VERSION_POS,
};
use winnow::{
    Parser,
    binary::{le_f32, le_i16, le_i32, le_u16, le_u64},
    error::ContextError,
};

/// Runs `parser` on the bytes starting at `offset`.
fn parse_at<'a, O, P>(data: &'a [u8], offset: usize, field: &str, mut parser: P) -> Result<O, SpeError>
where
    P: Parser<&'a [u8], O, ContextError>,
{
    let mut input = data
        .get(offset..)
        .ok_or_else(|| SpeError::CorruptHeader(format!("{field} at byte {offset} is past end of file")))?;
    parser
        .parse_next(&mut input)
        .map_err(|e| SpeError::CorruptHeader(format!("failed to read {field} at byte {offset}: {e:?}")))
}

/// Parses the fields every SPE file carries at fixed offsets.
///
/// - bytes 678..686: little‑endian u64 footer offset
/// - bytes 1992..1996: little‑endian f32 format version
pub fn parse_header(data: &[u8]) -> Result<Header, SpeError> {
    if (data.len() as u64) < DATA_OFFSET {
        return Err(SpeError::CorruptHeader(format!(
            "file is {} bytes, shorter than the {DATA_OFFSET} byte header",
            data.len()
        )));
    }
    let footer_offset = parse_at(data, FOOTER_OFFSET_POS, "footer offset", le_u64)?;
    let version = parse_at(data, VERSION_POS, "version", le_f32)?;

    Ok(Header::builder()
        .footer_offset(footer_offset)
        .version(version)
        .build())
}

/// Parses the 2.x fixed-layout fields:
/// - byte 108: i16 pixel type code
/// - byte 42: u16 frame width
/// - byte 656: u16 frame height
/// - byte 1446: i32 frame count
pub fn parse_legacy_header(data: &[u8]) -> Result<LegacyHeader, SpeError> {
    let pixel_type_code = parse_at(data, LEGACY_PIXEL_TYPE_POS, "pixel type", le_i16)?;
    let width = parse_at(data, LEGACY_WIDTH_POS, "frame width", le_u16)?;
    let height = parse_at(data, LEGACY_HEIGHT_POS, "frame height", le_u16)?;
    let frame_count = parse_at(data, LEGACY_FRAME_COUNT_POS, "frame count", le_i32)?;

    Ok(LegacyHeader::builder()
        .pixel_type_code(pixel_type_code)
        .width(width)
        .height(height)
        .frame_count(frame_count)
        .build())
}
