//! End-to-end playback tests: encode with the writer, play back with the
//! reader, and check the materialized live sets frame by frame.

use std::io::Cursor;

use nbl_codec::{
    CancelToken, EncoderOptions, LiveSet, ParticleId, ParticleState, Reader, TextureEntry, Writer,
};

fn flame_texture() -> Vec<TextureEntry> {
    vec![TextureEntry {
        path: "minecraft:textures/particle/flame.png".to_owned(),
        rows: 1,
        cols: 1,
    }]
}

fn live_of(particles: &[(i32, ParticleState)]) -> LiveSet {
    let mut live = LiveSet::new();
    for &(id, state) in particles {
        assert!(live.insert(ParticleId::new(id), state));
    }
    live
}

fn snapshot(live: &LiveSet) -> Vec<(i32, ParticleState)> {
    let mut rows: Vec<(i32, ParticleState)> = live.iter().map(|(id, s)| (id.raw(), s)).collect();
    rows.sort_by_key(|&(id, _)| id);
    rows
}

fn encode(frames: &[LiveSet], options: EncoderOptions, textures: Vec<TextureEntry>) -> Vec<u8> {
    let mut writer = Writer::create(Vec::new(), options, textures).unwrap();
    for frame in frames {
        writer.push_frame(frame, false).unwrap();
    }
    writer.finish().unwrap()
}

#[test]
fn single_frame_single_particle() {
    let state = ParticleState {
        pos: [1.0, 2.0, 3.0],
        color: [255, 128, 64, 255],
        size: 100,
        tex_id: 0,
        seq_idx: 0,
    };
    let bytes = encode(
        &[live_of(&[(42, state)])],
        EncoderOptions::default(),
        flame_texture(),
    );

    let mut reader = Reader::open(Cursor::new(bytes)).unwrap();
    assert_eq!(reader.total_frames(), 1);
    assert_eq!(reader.header().target_fps, 30);
    assert_eq!(reader.textures().len(), 1);
    assert_eq!(
        reader.textures()[0].path,
        "minecraft:textures/particle/flame.png"
    );

    let live = reader.seek(0).unwrap();
    assert_eq!(live.len(), 1);
    assert_eq!(live.get(ParticleId::new(42)).unwrap(), state);
}

#[test]
fn two_frame_update_applies_quantized_deltas() {
    let frame0 = live_of(&[(
        42,
        ParticleState {
            pos: [1.0, 2.0, 3.0],
            color: [255, 128, 64, 255],
            size: 100,
            tex_id: 0,
            seq_idx: 0,
        },
    )]);
    // dX = 1500 stored units, dR = -10.
    let frame1 = live_of(&[(
        42,
        ParticleState {
            pos: [2.5, 2.0, 3.0],
            color: [245, 128, 64, 255],
            size: 100,
            tex_id: 0,
            seq_idx: 0,
        },
    )]);
    let bytes = encode(
        &[frame0, frame1],
        EncoderOptions::default(),
        flame_texture(),
    );

    let mut reader = Reader::open(Cursor::new(bytes)).unwrap();
    let live = reader.seek(1).unwrap();
    let state = live.get(ParticleId::new(42)).unwrap();
    assert_eq!(state.pos, [2.5, 2.0, 3.0]);
    assert_eq!(state.color[0], 245);
}

#[test]
fn spawn_via_p_frame_uses_zero_basis() {
    let frame0 = LiveSet::new();
    let frame1 = live_of(&[(
        7,
        ParticleState {
            pos: [0.5, 1.0, -0.25],
            color: [200, 200, 200, 255],
            size: 50,
            tex_id: 0,
            seq_idx: 0,
        },
    )]);
    let bytes = encode(
        &[frame0, frame1],
        EncoderOptions::default(),
        flame_texture(),
    );

    let mut reader = Reader::open(Cursor::new(bytes)).unwrap();
    // Frame 1 must have stayed a P-frame for the zero basis to be on disk.
    assert_eq!(reader.keyframes().frames(), &[0]);

    let live = reader.seek(1).unwrap();
    let state = live.get(ParticleId::new(7)).unwrap();
    assert_eq!(state.pos, [0.5, 1.0, -0.25]);
    assert_eq!(state.color, [200, 200, 200, 255]);
    assert_eq!(state.size, 50);
}

#[test]
fn despawn_removes_absent_ids() {
    let base = ParticleState {
        color: [255, 255, 255, 255],
        size: 100,
        ..ParticleState::default()
    };
    let frame0 = live_of(&[
        (1, ParticleState { pos: [1.0, 0.0, 0.0], ..base }),
        (2, ParticleState { pos: [2.0, 0.0, 0.0], ..base }),
        (3, ParticleState { pos: [3.0, 0.0, 0.0], ..base }),
    ]);
    let frame1 = live_of(&[
        (1, ParticleState { pos: [1.0, 0.0, 0.0], ..base }),
        (3, ParticleState { pos: [3.0, 0.0, 0.0], ..base }),
    ]);
    let bytes = encode(
        &[frame0, frame1],
        EncoderOptions::default(),
        flame_texture(),
    );

    let mut reader = Reader::open(Cursor::new(bytes)).unwrap();
    let live = reader.seek(1).unwrap();
    let mut ids: Vec<i32> = live.ids().iter().map(|id| id.raw()).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 3]);
}

#[test]
fn respawn_after_despawn_resets_to_zero_basis() {
    let rich = ParticleState {
        pos: [4.0, 4.0, 4.0],
        color: [255, 255, 255, 255],
        size: 500,
        tex_id: 0,
        seq_idx: 7,
    };
    let modest = ParticleState {
        pos: [0.25, 0.0, 0.0],
        color: [10, 20, 30, 40],
        size: 5,
        tex_id: 0,
        seq_idx: 1,
    };
    let frames = [
        live_of(&[(1, rich)]),
        LiveSet::new(),
        live_of(&[(1, modest)]),
    ];
    let bytes = encode(&frames, EncoderOptions::default(), flame_texture());

    let mut reader = Reader::open(Cursor::new(bytes)).unwrap();
    let live = reader.seek(2).unwrap();
    assert_eq!(live.get(ParticleId::new(1)).unwrap(), modest);
}

/// Builds a 180-frame animation of three particles drifting on exactly
/// representable steps, so playback states are exact.
fn drifting_frames() -> Vec<LiveSet> {
    (0..180u32)
        .map(|f| {
            let t = f as f32;
            live_of(&[
                (
                    1,
                    ParticleState {
                        pos: [t * 0.25, 0.0, 0.0],
                        color: [255, 200, 0, 255],
                        size: 100,
                        tex_id: 0,
                        seq_idx: (f % 8) as u8,
                    },
                ),
                (
                    2,
                    ParticleState {
                        pos: [0.0, t * 0.125, -t * 0.5],
                        color: [0, 128, 255, 200],
                        size: 100 + (f % 50) as u16,
                        tex_id: 0,
                        seq_idx: 0,
                    },
                ),
                (
                    3,
                    ParticleState {
                        pos: [-1.0, 2.0, t * 0.125],
                        color: [(f % 256) as u8, 0, 0, 255],
                        size: 100,
                        tex_id: 0,
                        seq_idx: 0,
                    },
                ),
            ])
        })
        .collect()
}

#[test]
fn default_gop_places_keyframes_every_sixty_frames() {
    let bytes = encode(
        &drifting_frames(),
        EncoderOptions::default(),
        flame_texture(),
    );
    let reader = Reader::open(Cursor::new(bytes)).unwrap();
    assert_eq!(reader.keyframes().frames(), &[0, 60, 120]);
}

#[test]
fn random_seek_matches_stepping() {
    let bytes = encode(
        &drifting_frames(),
        EncoderOptions::default(),
        flame_texture(),
    );

    let mut seeker = Reader::open(Cursor::new(bytes.clone())).unwrap();
    let mut stepper = Reader::open(Cursor::new(bytes)).unwrap();

    let direct = snapshot(seeker.seek(150).unwrap());

    stepper.seek(120).unwrap();
    for _ in 0..30 {
        stepper.step_forward().unwrap();
    }
    assert_eq!(stepper.current_frame(), Some(150));
    assert_eq!(snapshot(stepper.live()), direct);
}

#[test]
fn seek_equals_stepping_from_zero() {
    let bytes = encode(
        &drifting_frames(),
        EncoderOptions::default(),
        flame_texture(),
    );

    let mut seeker = Reader::open(Cursor::new(bytes.clone())).unwrap();
    let mut stepper = Reader::open(Cursor::new(bytes)).unwrap();

    stepper.seek(0).unwrap();
    for target in [0u32, 13, 59, 60, 61, 119, 120, 179] {
        while stepper.current_frame() != Some(target) {
            stepper.step_forward().unwrap();
        }
        let direct = snapshot(seeker.seek(target).unwrap());
        assert_eq!(snapshot(stepper.live()), direct, "frame {target}");
    }
}

#[test]
fn backward_seek_restarts_from_keyframe() {
    let bytes = encode(
        &drifting_frames(),
        EncoderOptions::default(),
        flame_texture(),
    );
    let mut reader = Reader::open(Cursor::new(bytes.clone())).unwrap();

    let early = snapshot(reader.seek(70).unwrap());
    reader.seek(150).unwrap();
    let again = snapshot(reader.seek(70).unwrap());
    assert_eq!(early, again);
}

#[test]
fn playback_states_match_source_exactly() {
    let frames = drifting_frames();
    let bytes = encode(&frames, EncoderOptions::default(), flame_texture());
    let mut reader = Reader::open(Cursor::new(bytes)).unwrap();

    reader.seek(0).unwrap();
    for (f, source) in frames.iter().enumerate() {
        if f > 0 {
            reader.step_forward().unwrap();
        }
        assert_eq!(
            snapshot(reader.live()),
            snapshot(source),
            "frame {f} diverged"
        );
    }
}

#[test]
fn cancelled_seek_surfaces_cancelled() {
    let bytes = encode(
        &drifting_frames(),
        EncoderOptions::default(),
        flame_texture(),
    );
    let mut reader = Reader::open(Cursor::new(bytes)).unwrap();

    let token = CancelToken::new();
    token.cancel();
    let err = reader.seek_cancellable(150, &token).unwrap_err();
    assert!(matches!(err, nbl_codec::CodecError::Cancelled));

    // A fresh seek recovers from a fresh keyframe.
    let live = reader.seek(150).unwrap();
    assert_eq!(live.len(), 3);
}
