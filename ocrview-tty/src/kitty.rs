//! Frame output over the kitty graphics protocol.

use std::io::Write;

use anyhow::Result;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use crossterm::{
    cursor,
    terminal::{Clear, ClearType},
};
use ocrview_core::RenderImage;
use png::{BitDepth, ColorType, Encoder};
use tracing::trace;

/// Largest base64 payload the protocol accepts per escape sequence.
const CHUNK_LEN: usize = 4096;
const FRAME_IMAGE_ID: u32 = 1;
const FRAME_PLACEMENT_ID: u32 = 1;

pub struct KittyRenderer<W: Write> {
    writer: W,
    frames_sent: u64,
}

/// Cell area the frame is scaled into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawParams {
    pub columns: u32,
    pub rows: u32,
}

impl DrawParams {
    pub fn clamped(columns: u32, rows: u32) -> Self {
        Self {
            columns: columns.max(1),
            rows: rows.max(1),
        }
    }
}

impl<W: Write> KittyRenderer<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            frames_sent: 0,
        }
    }

    pub fn writer(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Sends `image` and places it at the cursor. Every frame reuses one
    /// image id, so the terminal swaps it in place.
    pub fn draw(&mut self, image: &RenderImage, params: DrawParams) -> Result<()> {
        let encoded = BASE64.encode(encode_png(image)?);
        trace!(bytes = encoded.len(), frame = self.frames_sent, "transmitting frame");

        let header = format!(
            "a=T,f=100,C=1,q=2,i={FRAME_IMAGE_ID},p={FRAME_PLACEMENT_ID},c={},r={},s={},v={},z=-1",
            params.columns, params.rows, image.width, image.height
        );
        let chunks: Vec<&[u8]> = encoded.as_bytes().chunks(CHUNK_LEN).collect();
        if chunks.is_empty() {
            self.write_command(&format!("{header},m=0"), &[])?;
        }
        for (index, chunk) in chunks.iter().enumerate() {
            let more = u8::from(index + 1 < chunks.len());
            if index == 0 {
                self.write_command(&format!("{header},m={more}"), chunk)?;
            } else {
                self.write_command(&format!("m={more},q=2"), chunk)?;
            }
        }

        self.frames_sent += 1;
        self.writer.flush()?;
        Ok(())
    }

    pub fn begin_sync_update(&mut self) -> Result<()> {
        write!(self.writer, "\u{1b}[?2026h")?;
        Ok(())
    }

    /// The terminal paints everything queued since
    /// [`begin_sync_update`](Self::begin_sync_update) at once.
    pub fn end_sync_update(&mut self) -> Result<()> {
        write!(self.writer, "\u{1b}[?2026l")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Clears the text grid and drops every placed image.
    pub fn clear_all(&mut self) -> Result<()> {
        self.write_command("a=d,d=A,q=2", &[])?;
        crossterm::execute!(
            &mut self.writer,
            Clear(ClearType::All),
            cursor::MoveTo(0, 0)
        )?;
        Ok(())
    }

    fn write_command(&mut self, control: &str, payload: &[u8]) -> Result<()> {
        write!(self.writer, "\u{1b}_G{control}")?;
        if !payload.is_empty() {
            self.writer.write_all(b";")?;
            self.writer.write_all(payload)?;
        }
        write!(self.writer, "\u{1b}\\")?;
        Ok(())
    }
}

fn encode_png(image: &RenderImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    {
        let mut encoder = Encoder::new(&mut buffer, image.width, image.height);
        encoder.set_color(ColorType::Rgba);
        encoder.set_depth(BitDepth::Eight);
        let mut png = encoder.write_header()?;
        png.write_image_data(&image.pixels)?;
        png.finish()?;
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noise(width: u32, height: u32) -> RenderImage {
        let mut state: u32 = 0x9e37_79b9;
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for _ in 0..(width * height) {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let [r, g, b, _] = state.to_le_bytes();
            pixels.extend_from_slice(&[r, g, b, 255]);
        }
        RenderImage {
            width,
            height,
            pixels,
        }
    }

    #[test]
    fn single_pixel_frame() {
        let mut renderer = KittyRenderer::new(Vec::new());
        let image = RenderImage {
            width: 1,
            height: 1,
            pixels: vec![255, 0, 0, 255],
        };

        renderer.draw(&image, DrawParams::clamped(10, 5)).unwrap();
        assert_eq!(renderer.frames_sent(), 1);
        let output = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(output.starts_with("\u{1b}_Ga=T,f=100"));
        assert!(output.contains("c=10,r=5,s=1,v=1,z=-1,m=0;"));
        assert!(output.ends_with("\u{1b}\\"));
    }

    #[test]
    fn noisy_frames_span_several_chunks() {
        let mut renderer = KittyRenderer::new(Vec::new());
        renderer.draw(&noise(64, 64), DrawParams::clamped(0, 0)).unwrap();
        let output = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(output.contains("c=1,r=1"));
        assert!(output.contains(",m=1;"));
        assert!(output.contains("\u{1b}_Gm=0,q=2;"));
        let escapes = output.matches("\u{1b}_G").count();
        assert!(escapes >= 2, "expected chunked output, got {escapes} escape(s)");
    }

    #[test]
    fn clear_deletes_images() {
        let mut renderer = KittyRenderer::new(Vec::new());
        renderer.clear_all().unwrap();
        let output = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(output.starts_with("\u{1b}_Ga=d,d=A,q=2\u{1b}\\"));
    }
}
