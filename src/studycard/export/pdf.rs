//! Minimal single-page PDF holding one raster image.
//!
//! The page is sized to the image at 96 dpi (one pixel is 0.75 pt) and the
//! image is embedded as a Flate-compressed RGB XObject.

use crate::error::Result;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::RgbImage;
use std::io::Write;

const POINTS_PER_PIXEL: f32 = 0.75;

/// Writes PDF objects while tracking their byte offsets for the xref table.
struct ObjectWriter {
    out: Vec<u8>,
    offsets: Vec<usize>,
}

impl ObjectWriter {
    fn new() -> Self {
        let mut out = Vec::new();
        out.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");
        Self {
            out,
            offsets: Vec::new(),
        }
    }

    fn object(&mut self, body: &str) {
        self.begin();
        self.out.extend_from_slice(body.as_bytes());
        self.out.extend_from_slice(b"\nendobj\n");
    }

    fn stream(&mut self, dict: &str, data: &[u8]) {
        self.begin();
        self.out
            .extend_from_slice(format!("<< {} /Length {} >>\nstream\n", dict, data.len()).as_bytes());
        self.out.extend_from_slice(data);
        self.out.extend_from_slice(b"\nendstream\nendobj\n");
    }

    fn begin(&mut self) {
        self.offsets.push(self.out.len());
        let number = self.offsets.len();
        self.out
            .extend_from_slice(format!("{} 0 obj\n", number).as_bytes());
    }

    fn finish(mut self, root: usize) -> Vec<u8> {
        let xref_at = self.out.len();
        let count = self.offsets.len() + 1;
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", count);
        for offset in &self.offsets {
            xref.push_str(&format!("{:010} 00000 n \n", offset));
        }
        xref.push_str(&format!(
            "trailer\n<< /Size {} /Root {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            count, root, xref_at
        ));
        self.out.extend_from_slice(xref.as_bytes());
        self.out
    }
}

/// Encodes `image` as a one-page PDF document.
pub fn single_page(image: &RgbImage) -> Result<Vec<u8>> {
    let (w, h) = image.dimensions();
    let page_w = w as f32 * POINTS_PER_PIXEL;
    let page_h = h as f32 * POINTS_PER_PIXEL;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(image.as_raw())?;
    let pixels = encoder.finish()?;

    let content = format!("q\n{:.2} 0 0 {:.2} 0 0 cm\n/Im0 Do\nQ", page_w, page_h);

    let mut pdf = ObjectWriter::new();
    pdf.object("<< /Type /Catalog /Pages 2 0 R >>");
    pdf.object("<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    pdf.object(&format!(
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
         /Resources << /XObject << /Im0 5 0 R >> >> /Contents 4 0 R >>",
        page_w, page_h
    ));
    pdf.stream("", content.as_bytes());
    pdf.stream(
        &format!(
            "/Type /XObject /Subtype /Image /Width {} /Height {} \
             /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /FlateDecode",
            w, h
        ),
        &pixels,
    );
    Ok(pdf.finish(1))
}
