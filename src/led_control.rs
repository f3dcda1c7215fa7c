//! LED output: the pixel buffer for the chained strips and the renderer that
//! pushes it to the hardware.

use core::fmt::Debug;
use core::ops::Range;

use log::{debug, warn};
use smart_leds::SmartLedsWrite;

use crate::BoardError;
use crate::color::Color;
use crate::config::{LED_COUNT, LEDS_PER_STRIP, STRIP_COUNT};

/// Positions occupied by strip `strip` in the chained sequence.
///
/// Strip *k* covers `[LEDS_PER_STRIP * k, LEDS_PER_STRIP * (k + 1))`.
pub fn strip_range(strip: usize) -> Option<Range<usize>> {
    if strip >= STRIP_COUNT {
        return None;
    }
    let start = strip * LEDS_PER_STRIP;
    Some(start..start + LEDS_PER_STRIP)
}

/// A fixed-length frame with one color per physical LED
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelFrame<const N: usize> {
    pixels: [Color; N],
}

/// Frame covering the whole jacket
pub type JacketFrame = PixelFrame<LED_COUNT>;

impl<const N: usize> PixelFrame<N> {
    /// Create a frame with every LED off
    pub const fn new() -> Self {
        Self::filled(Color::BLACK)
    }

    pub const fn filled(color: Color) -> Self {
        Self { pixels: [color; N] }
    }

    pub const fn len(&self) -> usize {
        N
    }

    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    pub fn fill(&mut self, color: Color) {
        self.pixels.fill(color);
    }

    pub fn get(&self, index: usize) -> Option<Color> {
        self.pixels.get(index).copied()
    }

    pub fn set(&mut self, index: usize, color: Color) -> Result<(), BoardError> {
        let pixel = self.pixels.get_mut(index).ok_or(BoardError::LedError)?;
        *pixel = color;
        Ok(())
    }

    /// Paint one strip of the chain, leaving the others untouched
    pub fn set_strip(&mut self, strip: usize, color: Color) -> Result<(), BoardError> {
        let range = strip_range(strip)
            .filter(|range| range.end <= N)
            .ok_or(BoardError::LedError)?;
        self.pixels[range].fill(color);
        Ok(())
    }

    /// The color shared by every LED, if the frame is a solid color
    pub fn uniform_color(&self) -> Option<Color> {
        let first = *self.pixels.first()?;
        self.pixels.iter().all(|&c| c == first).then_some(first)
    }

    pub fn as_slice(&self) -> &[Color] {
        &self.pixels
    }

    pub fn iter(&self) -> impl Iterator<Item = Color> + '_ {
        self.pixels.iter().copied()
    }
}

impl<const N: usize> Default for PixelFrame<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns the pixel buffer and writes it to the strip chain
pub struct LedRenderer<S, const N: usize = LED_COUNT> {
    strip: S,
    frame: PixelFrame<N>,
    frames_pushed: u32,
}

impl<S, const N: usize> LedRenderer<S, N>
where
    S: SmartLedsWrite,
    S::Color: From<Color>,
    S::Error: Debug,
{
    /// Create a renderer; nothing is written until the first render call
    pub fn new(strip: S) -> Self {
        Self {
            strip,
            frame: PixelFrame::new(),
            frames_pushed: 0,
        }
    }

    /// Paint every LED with `color` and push the frame in one write
    pub fn render(&mut self, color: Color) -> Result<(), BoardError> {
        self.frame.fill(color);
        self.push()
    }

    /// Replace the whole buffer and push it
    pub fn render_frame(&mut self, frame: PixelFrame<N>) -> Result<(), BoardError> {
        self.frame = frame;
        self.push()
    }

    /// Last frame handed to the hardware
    pub fn frame(&self) -> &PixelFrame<N> {
        &self.frame
    }

    pub fn frames_pushed(&self) -> u32 {
        self.frames_pushed
    }

    pub fn strip(&self) -> &S {
        &self.strip
    }

    fn push(&mut self) -> Result<(), BoardError> {
        // Unchanged frames are still written so a glitched LED recovers on the next cycle
        match self.strip.write(self.frame.iter()) {
            Ok(()) => {
                self.frames_pushed = self.frames_pushed.wrapping_add(1);
                debug!("[LED] Frame {} pushed to {} LEDs", self.frames_pushed, N);
                Ok(())
            }
            Err(e) => {
                warn!("[LED] Failed to push frame: {:?}", e);
                Err(BoardError::LedError)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingStrip {
        writes: Vec<Vec<Color>>,
        fail: bool,
    }

    impl SmartLedsWrite for RecordingStrip {
        type Error = &'static str;
        type Color = Color;

        fn write<T, I>(&mut self, iterator: T) -> Result<(), Self::Error>
        where
            T: IntoIterator<Item = I>,
            I: Into<Self::Color>,
        {
            if self.fail {
                return Err("rmt busy");
            }
            self.writes.push(iterator.into_iter().map(Into::into).collect());
            Ok(())
        }
    }

    #[test]
    fn strips_cover_the_chain_without_overlap() {
        assert_eq!(strip_range(0), Some(0..14));
        assert_eq!(strip_range(5), Some(70..84));
        assert_eq!(strip_range(6), None);
        assert_eq!(STRIP_COUNT * LEDS_PER_STRIP, LED_COUNT);
    }

    #[test]
    fn new_frame_is_black() {
        let frame = JacketFrame::new();
        assert_eq!(frame.len(), 84);
        assert_eq!(frame.uniform_color(), Some(Color::BLACK));
    }

    #[test]
    fn set_strip_only_touches_its_range() {
        let mut frame = JacketFrame::new();
        frame.set_strip(2, Color::new(1, 2, 3)).unwrap();

        assert_eq!(frame.get(27), Some(Color::BLACK));
        assert_eq!(frame.get(28), Some(Color::new(1, 2, 3)));
        assert_eq!(frame.get(41), Some(Color::new(1, 2, 3)));
        assert_eq!(frame.get(42), Some(Color::BLACK));
        assert_eq!(frame.uniform_color(), None);
        assert_eq!(frame.set_strip(6, Color::BLACK), Err(BoardError::LedError));
    }

    #[test]
    fn set_out_of_bounds_is_rejected() {
        let mut frame = JacketFrame::new();
        assert_eq!(frame.set(84, Color::BLACK), Err(BoardError::LedError));
    }

    #[test]
    fn render_writes_uniform_frame_every_call() {
        let mut renderer: LedRenderer<_> = LedRenderer::new(RecordingStrip::default());
        let orange = Color::new(255, 100, 50);

        renderer.render(orange).unwrap();
        renderer.render(orange).unwrap();

        let writes = &renderer.strip().writes;
        assert_eq!(writes.len(), 2);
        assert!(writes.iter().all(|w| w.len() == 84 && w.iter().all(|&c| c == orange)));
        assert_eq!(renderer.frames_pushed(), 2);
    }

    #[test]
    fn render_frame_pushes_per_strip_colors() {
        let mut renderer: LedRenderer<_> = LedRenderer::new(RecordingStrip::default());
        let mut frame = JacketFrame::new();
        frame.set_strip(5, Color::new(0, 0, 255)).unwrap();

        renderer.render_frame(frame.clone()).unwrap();

        assert_eq!(renderer.strip().writes[0], frame.as_slice());
    }

    #[test]
    fn push_failure_is_reported() {
        let strip = RecordingStrip {
            fail: true,
            ..Default::default()
        };
        let mut renderer: LedRenderer<_> = LedRenderer::new(strip);

        assert_eq!(renderer.render(Color::BLACK), Err(BoardError::LedError));
        assert_eq!(renderer.frames_pushed(), 0);
    }
}
