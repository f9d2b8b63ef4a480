//! Sequencer-driven playback through the controller's offline path.

use pb_formats::{frames_to_wav, load_wav};
use pb_master::{Config, Controller, Frame, PRESETS};
use std::path::Path;

const RATE: usize = 44_100;

fn write_click(path: &Path, value: i16, frames: usize) {
    let wav = frames_to_wav(&vec![Frame::mono(value); frames], RATE as u32);
    std::fs::write(path, wav).unwrap();
}

fn onsets(frames: &[Frame]) -> Vec<usize> {
    frames
        .windows(2)
        .enumerate()
        .filter(|(_, w)| w[0].left == 0 && w[1].left != 0)
        .map(|(i, _)| i + 1)
        .collect()
}

#[test]
fn kit_from_config_plays_on_the_grid() {
    let dir = tempfile::tempdir().unwrap();
    write_click(&dir.path().join("kick.wav"), 8_000, 200);
    let config_path = dir.path().join("kit.yaml");
    std::fs::write(
        &config_path,
        "tempo: 120\npresets: false\nmaster_volume: 100\npads:\n  0: kick.wav\n",
    )
    .unwrap();

    let config = Config::load(&config_path).unwrap();
    let ctrl = Controller::from_config(&config).unwrap();
    for step in [0, 4, 8, 12] {
        ctrl.set_step(0, step, true).unwrap();
    }
    ctrl.play();
    // Stop short of the next bar's downbeat.
    let frames = ctrl.render(RATE * 2 - 1_000).unwrap();

    // Quarter notes at 120 BPM are 22050 frames apart; triggers land on
    // block boundaries so allow one block of jitter.
    let starts = {
        let mut s = onsets(&frames);
        if frames[0].left != 0 {
            s.insert(0, 0);
        }
        s
    };
    assert_eq!(starts.len(), 4, "{starts:?}");
    for (i, &start) in starts.iter().enumerate() {
        let expected = i * RATE / 2;
        assert!(start.abs_diff(expected) <= 128, "{start} vs {expected}");
    }
    assert_eq!(frames[0].left, 8_000);
}

#[test]
fn presets_play_and_cycle() {
    let config = Config::from_yaml("tempo: 300\ncycle_bars: 1\n").unwrap();
    let ctrl = Controller::from_config(&config).unwrap();
    for pad in 0..16u8 {
        ctrl.load_pad(pad, pb_master::SampleBuffer::new("tick", vec![1_000; 100]))
            .unwrap();
    }
    assert_eq!(ctrl.pattern(1).unwrap(), PRESETS[1].pattern());
    ctrl.play();

    // One bar at 300 BPM is 0.8 s.
    let frames = ctrl.render(RATE).unwrap();
    assert!(frames.iter().any(|f| f.left != 0));
    assert_eq!(ctrl.bars_played(), 1);
    assert_eq!(ctrl.current_pattern(), 1);
}

#[test]
fn muted_track_renders_silence() {
    let ctrl = Controller::new();
    ctrl.load_pad(3, pb_master::SampleBuffer::new("hat", vec![5_000; 50]))
        .unwrap();
    ctrl.set_step(3, 0, true).unwrap();
    ctrl.mute_track(3, true).unwrap();
    ctrl.play();
    assert!(ctrl.render(4_096).unwrap().iter().all(|f| f.left == 0));

    ctrl.mute_track(3, false).unwrap();
    ctrl.play();
    ctrl.stop().unwrap();
    ctrl.play();
    assert!(ctrl.render(4_096).unwrap().iter().any(|f| f.left != 0));
}

#[test]
fn wav_render_round_trips_through_loader() {
    let ctrl = Controller::new();
    ctrl.set_master_volume(50).unwrap();
    ctrl.load_pad(0, pb_master::SampleBuffer::new("tone", vec![2_000; 1_000]))
        .unwrap();
    ctrl.trigger_pad(0, 127).unwrap();
    let wav = ctrl.render_wav(2_000).unwrap();
    let decoded = load_wav(&wav, "render").unwrap();
    assert_eq!(decoded.len(), 2_000);
    assert_eq!(decoded.data()[0], 1_000);
    assert_eq!(decoded.data()[1_999], 0);
}

#[test]
fn visualization_reflects_output() {
    let ctrl = Controller::new();
    assert!(ctrl.visualization().spectrum.iter().all(|&b| b == 0));
    ctrl.set_master_volume(100).unwrap();
    ctrl.load_pad(0, pb_master::SampleBuffer::new("loud", vec![20_000; 4_000]))
        .unwrap();
    ctrl.trigger_pad(0, 127).unwrap();
    ctrl.render(512).unwrap();
    let vis = ctrl.visualization();
    assert!(vis.spectrum.iter().all(|&b| b == 255));
    assert!(vis.waveform.iter().all(|&p| p > 200));
}
