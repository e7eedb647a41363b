//! The live particle set.
//!
//! [`LiveSet`] is the materialized state of every particle alive at the
//! current frame. It keeps two parallel structures: a compact row-ordered
//! struct-of-arrays for rendering and an auxiliary `ParticleId -> row` map
//! for P-frame application. Both are rebuilt wholesale on I-frames and
//! mutated in place on P-frames.

use std::collections::HashMap;

use crate::frame::{DeltaFrame, KeyFrame, POS_SCALE};
use crate::types::{ParticleId, ParticleState};

/// The live particle set at one frame.
#[derive(Debug, Clone, Default)]
pub struct LiveSet {
    ids: Vec<ParticleId>,
    px: Vec<f32>,
    py: Vec<f32>,
    pz: Vec<f32>,
    cr: Vec<u8>,
    cg: Vec<u8>,
    cb: Vec<u8>,
    ca: Vec<u8>,
    sizes: Vec<u16>,
    tex_ids: Vec<u8>,
    seq_idxs: Vec<u8>,
    rows: HashMap<ParticleId, usize>,
    touched: Vec<u64>,
    epoch: u64,
}

impl LiveSet {
    /// Creates an empty live set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty live set with room for `capacity` particles.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: Vec::with_capacity(capacity),
            px: Vec::with_capacity(capacity),
            py: Vec::with_capacity(capacity),
            pz: Vec::with_capacity(capacity),
            cr: Vec::with_capacity(capacity),
            cg: Vec::with_capacity(capacity),
            cb: Vec::with_capacity(capacity),
            ca: Vec::with_capacity(capacity),
            sizes: Vec::with_capacity(capacity),
            tex_ids: Vec::with_capacity(capacity),
            seq_idxs: Vec::with_capacity(capacity),
            rows: HashMap::with_capacity(capacity),
            touched: Vec::with_capacity(capacity),
            epoch: 0,
        }
    }

    /// Returns the number of live particles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if no particles are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns `true` if `id` is live.
    #[must_use]
    pub fn contains(&self, id: ParticleId) -> bool {
        self.rows.contains_key(&id)
    }

    /// Returns the materialized state of a live particle.
    #[must_use]
    pub fn get(&self, id: ParticleId) -> Option<ParticleState> {
        self.rows.get(&id).map(|&row| self.state_at(row))
    }

    /// Returns the IDs in row order.
    #[must_use]
    pub fn ids(&self) -> &[ParticleId] {
        &self.ids
    }

    /// Returns the X position column in row order.
    #[must_use]
    pub fn px(&self) -> &[f32] {
        &self.px
    }

    /// Returns the Y position column in row order.
    #[must_use]
    pub fn py(&self) -> &[f32] {
        &self.py
    }

    /// Returns the Z position column in row order.
    #[must_use]
    pub fn pz(&self) -> &[f32] {
        &self.pz
    }

    /// Iterates over `(id, state)` pairs in row order.
    pub fn iter(&self) -> impl Iterator<Item = (ParticleId, ParticleState)> + '_ {
        (0..self.len()).map(move |row| (self.ids[row], self.state_at(row)))
    }

    /// Inserts a particle, rejecting duplicates.
    ///
    /// Returns `false` (and leaves the set unchanged) if `id` is already
    /// live.
    pub fn insert(&mut self, id: ParticleId, state: ParticleState) -> bool {
        if self.rows.contains_key(&id) {
            return false;
        }
        self.push_row(id, state);
        true
    }

    /// Removes every particle.
    pub fn clear(&mut self) {
        self.ids.clear();
        self.px.clear();
        self.py.clear();
        self.pz.clear();
        self.cr.clear();
        self.cg.clear();
        self.cb.clear();
        self.ca.clear();
        self.sizes.clear();
        self.tex_ids.clear();
        self.seq_idxs.clear();
        self.rows.clear();
        self.touched.clear();
        self.epoch = 0;
    }

    fn state_at(&self, row: usize) -> ParticleState {
        ParticleState {
            pos: [self.px[row], self.py[row], self.pz[row]],
            color: [self.cr[row], self.cg[row], self.cb[row], self.ca[row]],
            size: self.sizes[row],
            tex_id: self.tex_ids[row],
            seq_idx: self.seq_idxs[row],
        }
    }

    fn push_row(&mut self, id: ParticleId, state: ParticleState) {
        let row = self.ids.len();
        self.ids.push(id);
        self.px.push(state.pos[0]);
        self.py.push(state.pos[1]);
        self.pz.push(state.pos[2]);
        self.cr.push(state.color[0]);
        self.cg.push(state.color[1]);
        self.cb.push(state.color[2]);
        self.ca.push(state.color[3]);
        self.sizes.push(state.size);
        self.tex_ids.push(state.tex_id);
        self.seq_idxs.push(state.seq_idx);
        self.touched.push(self.epoch);
        self.rows.insert(id, row);
    }

    /// Replaces the whole set with the particles of an I-frame.
    pub fn reset_from_key(&mut self, kf: &KeyFrame) {
        self.clear();
        let n = kf.len();
        self.ids.extend_from_slice(&kf.ids);
        self.px.extend_from_slice(&kf.px);
        self.py.extend_from_slice(&kf.py);
        self.pz.extend_from_slice(&kf.pz);
        self.cr.extend_from_slice(&kf.cr);
        self.cg.extend_from_slice(&kf.cg);
        self.cb.extend_from_slice(&kf.cb);
        self.ca.extend_from_slice(&kf.ca);
        self.sizes.extend_from_slice(&kf.sizes);
        self.tex_ids.extend_from_slice(&kf.tex_ids);
        self.seq_idxs.extend_from_slice(&kf.seq_idxs);
        self.touched.resize(n, 0);
        self.rows.reserve(n);
        for (row, &id) in kf.ids.iter().enumerate() {
            self.rows.insert(id, row);
        }
    }

    /// Extracts the whole set as an I-frame payload in row order.
    #[must_use]
    pub fn to_key_frame(&self) -> KeyFrame {
        KeyFrame {
            ids: self.ids.clone(),
            px: self.px.clone(),
            py: self.py.clone(),
            pz: self.pz.clone(),
            cr: self.cr.clone(),
            cg: self.cg.clone(),
            cb: self.cb.clone(),
            ca: self.ca.clone(),
            sizes: self.sizes.clone(),
            tex_ids: self.tex_ids.clone(),
            seq_idxs: self.seq_idxs.clone(),
        }
    }

    /// Applies a P-frame: updates particles present in both, spawns new IDs
    /// from the zero basis, and despawns IDs absent from the frame.
    ///
    /// The frame's ID column is trusted to be duplicate-free; the payload
    /// decoder enforces that.
    pub fn apply_delta(&mut self, df: &DeltaFrame) {
        self.epoch += 1;
        for i in 0..df.len() {
            let id = df.ids[i];
            match self.rows.get(&id).copied() {
                Some(row) => {
                    self.px[row] += f32::from(df.dx[i]) / POS_SCALE;
                    self.py[row] += f32::from(df.dy[i]) / POS_SCALE;
                    self.pz[row] += f32::from(df.dz[i]) / POS_SCALE;
                    self.cr[row] = self.cr[row].saturating_add_signed(df.dr[i]);
                    self.cg[row] = self.cg[row].saturating_add_signed(df.dg[i]);
                    self.cb[row] = self.cb[row].saturating_add_signed(df.db[i]);
                    self.ca[row] = self.ca[row].saturating_add_signed(df.da[i]);
                    let size = i32::from(self.sizes[row]) + i32::from(df.dsize[i]);
                    self.sizes[row] = size.clamp(0, 65535) as u16;
                    self.tex_ids[row] = self.tex_ids[row].saturating_add_signed(df.dtex[i]);
                    self.seq_idxs[row] = self.seq_idxs[row].saturating_add_signed(df.dseq[i]);
                    self.touched[row] = self.epoch;
                }
                None => {
                    // Zero basis: the delta bytes of a spawned particle are
                    // its absolute initial values. Byte-wide columns are
                    // reinterpreted as unsigned.
                    let state = ParticleState {
                        pos: [
                            f32::from(df.dx[i]) / POS_SCALE,
                            f32::from(df.dy[i]) / POS_SCALE,
                            f32::from(df.dz[i]) / POS_SCALE,
                        ],
                        color: [
                            df.dr[i] as u8,
                            df.dg[i] as u8,
                            df.db[i] as u8,
                            df.da[i] as u8,
                        ],
                        size: i32::from(df.dsize[i]).clamp(0, 65535) as u16,
                        tex_id: df.dtex[i] as u8,
                        seq_idx: df.dseq[i] as u8,
                    };
                    self.push_row(id, state);
                }
            }
        }
        self.retain_touched();
    }

    /// Compacts away every row not touched this epoch, preserving row order.
    fn retain_touched(&mut self) {
        let mut write = 0;
        for read in 0..self.ids.len() {
            if self.touched[read] == self.epoch {
                if write != read {
                    let id = self.ids[read];
                    self.ids[write] = id;
                    self.px[write] = self.px[read];
                    self.py[write] = self.py[read];
                    self.pz[write] = self.pz[read];
                    self.cr[write] = self.cr[read];
                    self.cg[write] = self.cg[read];
                    self.cb[write] = self.cb[read];
                    self.ca[write] = self.ca[read];
                    self.sizes[write] = self.sizes[read];
                    self.tex_ids[write] = self.tex_ids[read];
                    self.seq_idxs[write] = self.seq_idxs[read];
                    self.touched[write] = self.touched[read];
                    self.rows.insert(id, write);
                }
                write += 1;
            } else {
                self.rows.remove(&self.ids[read]);
            }
        }
        self.ids.truncate(write);
        self.px.truncate(write);
        self.py.truncate(write);
        self.pz.truncate(write);
        self.cr.truncate(write);
        self.cg.truncate(write);
        self.cb.truncate(write);
        self.ca.truncate(write);
        self.sizes.truncate(write);
        self.tex_ids.truncate(write);
        self.seq_idxs.truncate(write);
        self.touched.truncate(write);
    }
}
