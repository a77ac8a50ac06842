//! In-memory PDF fixtures for integration tests.

#![allow(dead_code)]

use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;

/// Builds a PDF object by object, numbering from 1, and writes a classic
/// xref table with correct offsets.
#[derive(Debug, Default)]
pub struct PdfBuilder {
    objects: Vec<Vec<u8>>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number the next added object will get.
    pub fn next_number(&self) -> u32 {
        self.objects.len() as u32 + 1
    }

    /// Add an object with the given body (usually a dictionary).
    pub fn object(&mut self, body: &str) -> u32 {
        self.objects.push(body.as_bytes().to_vec());
        self.next_number() - 1
    }

    /// Add an uncompressed stream object. `dict` is extra dictionary content.
    pub fn stream(&mut self, dict: &str, data: &[u8]) -> u32 {
        let mut body = format!("<< /Length {}{} >>\nstream\n", data.len(), dict).into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(b"\nendstream");
        self.objects.push(body);
        self.next_number() - 1
    }

    /// Add a Flate-compressed stream object.
    pub fn flate_stream(&mut self, dict: &str, data: &[u8]) -> u32 {
        let dict = format!(" /Filter /FlateDecode{}", dict);
        self.stream(&dict, &compress(data))
    }

    /// Document with xref table, trailer and `startxref`.
    pub fn build(&self) -> Vec<u8> {
        let (mut out, offsets) = self.body();
        let xref_offset = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n", offsets.len() + 1).as_bytes());
        out.extend_from_slice(b"0000000000 65535 f \n");
        for offset in &offsets {
            out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
                offsets.len() + 1,
                xref_offset
            )
            .as_bytes(),
        );
        out
    }

    /// Document with objects only: no xref table and no `startxref`.
    pub fn build_without_xref(&self) -> Vec<u8> {
        let (mut out, _) = self.body();
        out.extend_from_slice(b"%%EOF\n");
        out
    }

    fn body(&self) -> (Vec<u8>, Vec<usize>) {
        let mut out = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (index, body) in self.objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n", index + 1).as_bytes());
            out.extend_from_slice(body);
            out.extend_from_slice(b"\nendobj\n");
        }
        (out, offsets)
    }
}

/// zlib-compress `data`.
pub fn compress(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Catalog, page tree and one page per content stream. Objects 1 and 2 are
/// the catalog and page tree.
pub fn pages(contents: &[&[u8]], compressed: bool) -> Vec<u8> {
    let mut pdf = PdfBuilder::new();
    let count = contents.len() as u32;
    // Pages occupy 3.., each followed by its content stream
    let kids: Vec<String> = (0..count).map(|i| format!("{} 0 R", 3 + 2 * i)).collect();
    pdf.object("<< /Type /Catalog /Pages 2 0 R >>");
    pdf.object(&format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), count));
    for content in contents {
        let page = pdf.next_number();
        pdf.object(&format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents {} 0 R >>",
            page + 1
        ));
        if compressed {
            pdf.flate_stream("", content);
        } else {
            pdf.stream("", content);
        }
    }
    pdf.build()
}

/// One page showing `content`, uncompressed.
pub fn single_page(content: &[u8]) -> Vec<u8> {
    pages(&[content], false)
}

/// A ToUnicode-mapped font document.
///
/// Objects: 1 catalog, 2 pages, 3 page using `/F1`, 4 content, 5 font
/// `/ABCDEF+Aptos`, 6 ToUnicode stream holding `cmap`.
pub fn tounicode_document(cmap: &str, content: &[u8]) -> Vec<u8> {
    let mut pdf = PdfBuilder::new();
    pdf.object("<< /Type /Catalog /Pages 2 0 R >>");
    pdf.object("<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    pdf.object(
        "<< /Type /Page /Parent 2 0 R /Resources << /Font << /F1 5 0 R >> >> /Contents 4 0 R >>",
    );
    pdf.stream("", content);
    pdf.object("<< /Type /Font /Subtype /Type0 /BaseFont /ABCDEF+Aptos /Encoding /Identity-H /ToUnicode 6 0 R >>");
    pdf.stream("", cmap_program(cmap).as_bytes());
    pdf.build()
}

/// Wrap bfchar/bfrange sections in a complete CMap program.
pub fn cmap_program(sections: &str) -> String {
    format!(
        "/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n/CMapType 2 def\n\
         1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n\
         {}\nendcmap\nCMapName currentdict /CMap defineresource pop\nend\nend",
        sections
    )
}

/// A TrueType program with only `cmap`, `head`, `hhea` and `maxp`. Its
/// Windows BMP `cmap` maps `A`, `B` and `C` to glyphs 1 to 3.
pub fn truetype_program() -> Vec<u8> {
    let be16 = |values: &[u16]| values.iter().flat_map(|v| v.to_be_bytes()).collect::<Vec<u8>>();

    let mut cmap = be16(&[0, 1, 3, 1]);
    cmap.extend_from_slice(&12u32.to_be_bytes());
    cmap.extend(be16(&[4, 32, 0, 4, 4, 1, 0, 0x0043, 0xFFFF, 0, 0x0041, 0xFFFF, 0xFFC0, 1, 0, 0]));

    let mut head = vec![0u8; 54];
    head[..4].copy_from_slice(&0x0001_0000u32.to_be_bytes());
    head[18..20].copy_from_slice(&1000u16.to_be_bytes());

    let mut hhea = vec![0u8; 36];
    hhea[34..36].copy_from_slice(&1u16.to_be_bytes());

    let mut maxp = 0x0000_5000u32.to_be_bytes().to_vec();
    maxp.extend(be16(&[10]));

    let tables: [(&[u8], Vec<u8>); 4] = [(b"cmap", cmap), (b"head", head), (b"hhea", hhea), (b"maxp", maxp)];
    let mut font = 0x0001_0000u32.to_be_bytes().to_vec();
    font.extend(be16(&[tables.len() as u16, 0, 0, 0]));
    let mut offset = 12 + 16 * tables.len() as u32;
    for (tag, table) in &tables {
        font.extend_from_slice(tag);
        font.extend_from_slice(&0u32.to_be_bytes());
        font.extend_from_slice(&offset.to_be_bytes());
        font.extend_from_slice(&(table.len() as u32).to_be_bytes());
        offset += table.len() as u32;
    }
    for (_, table) in &tables {
        font.extend_from_slice(table);
    }
    font
}
