use lode_blocks::TintSource;

use crate::snapshot::SectionSnapshot;

const WHITE: [u8; 3] = [255, 255, 255];

/// Averages biome colors over the 3x3 block columns around a cell, with a
/// per-section cache since every cell in a column shares the result.
pub struct TintSampler<'a> {
    snapshot: &'a SectionSnapshot,
    cache: [[Option<[u8; 3]>; 256]; 3],
}

impl<'a> TintSampler<'a> {
    pub fn new(snapshot: &'a SectionSnapshot) -> Self {
        Self {
            snapshot,
            cache: [[None; 256]; 3],
        }
    }

    /// Color for a block at section-local `(x, z)`; white when untinted or
    /// no column data is reachable.
    pub fn sample(&mut self, source: TintSource, x: usize, z: usize) -> [u8; 3] {
        let slot = match source {
            TintSource::None => return WHITE,
            TintSource::Grass => 0,
            TintSource::Foliage => 1,
            TintSource::Water => 2,
        };
        let key = z * 16 + x;
        if let Some(c) = self.cache[slot][key] {
            return c;
        }
        let c = self.average(source, x as i32, z as i32);
        self.cache[slot][key] = Some(c);
        c
    }

    fn average(&self, source: TintSource, x: i32, z: i32) -> [u8; 3] {
        let mut sum = [0u32; 3];
        let mut n = 0u32;
        for dz in -1..=1 {
            for dx in -1..=1 {
                let (wx, wz) = (x + dx, z + dz);
                let Some(chunk) = self
                    .snapshot
                    .column(wx.div_euclid(16), wz.div_euclid(16))
                else {
                    continue;
                };
                let tint = chunk.tint(wx.rem_euclid(16) as usize, wz.rem_euclid(16) as usize);
                if let Some(c) = tint.color(source) {
                    for i in 0..3 {
                        sum[i] += u32::from(c[i]);
                    }
                    n += 1;
                }
            }
        }
        if n == 0 {
            return WHITE;
        }
        sum.map(|s| (s / n) as u8)
    }
}
