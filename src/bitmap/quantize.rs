//! Median-cut colour quantization in RGBA space.
//!
//! The colour histogram is split recursively along its widest channel at the
//! weighted median until the box budget is exhausted or every box holds a
//! single colour.  Each box becomes one palette entry (the pixel-weighted
//! mean of its colours).  Images that already use no more colours than the
//! budget are mapped exactly, with no averaging.
//!
//! Output is deterministic: identical input always yields the same palette
//! order and the same indices.

use std::collections::HashMap;

/// Largest palette the quantizer will produce.
pub const MAX_COLORS: usize = 256;

/// Result of quantizing a run of RGBA pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quantized {
    /// At most `max_colors` RGBA entries.
    pub palette: Vec<[u8; 4]>,
    /// One palette index per input pixel.
    pub indices: Vec<u8>,
}

#[derive(Debug)]
struct ColorBox {
    /// (colour, pixel count), unique colours only.
    colors: Vec<([u8; 4], u32)>,
}

impl ColorBox {
    fn channel_range(&self, channel: usize) -> u8 {
        let (lo, hi) = self.colors.iter().fold((u8::MAX, u8::MIN), |(lo, hi), (c, _)| {
            (lo.min(c[channel]), hi.max(c[channel]))
        });
        hi.saturating_sub(lo)
    }

    /// Channel with the largest spread, and that spread.
    fn widest_channel(&self) -> (usize, u8) {
        (0..4)
            .map(|ch| (ch, self.channel_range(ch)))
            .fold((0, 0), |best, cur| if cur.1 > best.1 { cur } else { best })
    }

    fn pixel_count(&self) -> u64 {
        self.colors.iter().map(|(_, n)| *n as u64).sum()
    }

    /// Split at the weighted median of the widest channel.  Both halves are
    /// non-empty; callers only split boxes holding two or more colours.
    fn split(mut self) -> (ColorBox, ColorBox) {
        let (channel, _) = self.widest_channel();
        self.colors.sort_by_key(|(c, _)| (c[channel], *c));

        let total = self.pixel_count();
        let mut running = 0u64;
        let mut cut = 1;
        for (i, (_, n)) in self.colors.iter().enumerate() {
            running += *n as u64;
            if running * 2 >= total {
                cut = i + 1;
                break;
            }
        }
        let cut = cut.clamp(1, self.colors.len() - 1);
        let upper = self.colors.split_off(cut);
        (self, ColorBox { colors: upper })
    }

    fn mean(&self) -> [u8; 4] {
        let total = self.pixel_count().max(1);
        let mut sums = [0u64; 4];
        for (c, n) in &self.colors {
            for ch in 0..4 {
                sums[ch] += c[ch] as u64 * *n as u64;
            }
        }
        sums.map(|s| ((s + total / 2) / total) as u8)
    }
}

/// Reduce `pixels` to at most `max_colors` colours (clamped to `1..=256`).
pub fn median_cut(pixels: &[[u8; 4]], max_colors: usize) -> Quantized {
    let max_colors = max_colors.clamp(1, MAX_COLORS);

    let mut histogram: HashMap<[u8; 4], u32> = HashMap::new();
    for p in pixels {
        *histogram.entry(*p).or_insert(0) += 1;
    }
    let mut colors: Vec<([u8; 4], u32)> = histogram.into_iter().collect();
    colors.sort_unstable_by_key(|(c, _)| *c);

    if colors.len() <= max_colors {
        let lookup: HashMap<[u8; 4], u8> = colors
            .iter()
            .enumerate()
            .map(|(i, (c, _))| (*c, i as u8))
            .collect();
        return Quantized {
            palette: colors.iter().map(|(c, _)| *c).collect(),
            indices: pixels.iter().map(|p| lookup[p]).collect(),
        };
    }

    let mut boxes = vec![ColorBox { colors }];
    while boxes.len() < max_colors {
        // Split the splittable box with the widest spread; ties go to the
        // earliest box so the result does not depend on hash order.
        let candidate = boxes
            .iter()
            .enumerate()
            .filter(|(_, b)| b.colors.len() > 1)
            .map(|(i, b)| (i, b.widest_channel().1))
            .fold(None, |best: Option<(usize, u8)>, cur| match best {
                Some(b) if b.1 >= cur.1 => Some(b),
                _                       => Some(cur),
            });
        let Some((i, _)) = candidate else { break };
        let (lo, hi) = boxes.swap_remove(i).split();
        boxes.push(lo);
        boxes.push(hi);
    }

    let mut palette = Vec::with_capacity(boxes.len());
    let mut lookup: HashMap<[u8; 4], u8> = HashMap::new();
    for (i, b) in boxes.iter().enumerate() {
        palette.push(b.mean());
        for (c, _) in &b.colors {
            lookup.insert(*c, i as u8);
        }
    }

    Quantized {
        palette,
        indices: pixels.iter().map(|p| lookup[p]).collect(),
    }
}
