//! Pairing challenge rendering.

use base64::Engine;
use qrcode::{Color, QrCode};

/// Pixels per module in the rendered SVG.
const MODULE_SIZE: usize = 8;
/// Quiet-zone width in modules.
const MARGIN: usize = 4;

/// Render a pairing code as an SVG image wrapped in a data URI, suitable
/// for an `<img src>` attribute.
pub fn data_uri(code: &str) -> Option<String> {
    let svg = render_svg(code)?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(svg.as_bytes());
    Some(format!("data:image/svg+xml;base64,{encoded}"))
}

/// Render a QR code as an SVG document, one rect per dark module.
fn render_svg(data: &str) -> Option<String> {
    let code = QrCode::new(data.as_bytes()).ok()?;
    let modules = code.to_colors();
    let width = code.width();
    let dim = (width + 2 * MARGIN) * MODULE_SIZE;

    let mut svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 {dim} {dim}\">\
         <rect width=\"{dim}\" height=\"{dim}\" fill=\"#fff\"/>"
    );
    for y in 0..width {
        for x in 0..width {
            if matches!(modules[y * width + x], Color::Dark) {
                let px = (x + MARGIN) * MODULE_SIZE;
                let py = (y + MARGIN) * MODULE_SIZE;
                svg.push_str(&format!(
                    "<rect x=\"{px}\" y=\"{py}\" width=\"{MODULE_SIZE}\" height=\"{MODULE_SIZE}\" fill=\"#000\"/>"
                ));
            }
        }
    }
    svg.push_str("</svg>");
    Some(svg)
}
