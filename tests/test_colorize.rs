// tests/test_colorize.rs -- Integration tests for depth colorization.

use depthbridge::colorize::{
    colorize_depth_frame, depth_to_color, DepthEncoding, DepthPalette, INVALID_DEPTH, VALID_ALPHA,
};
use depthbridge::delta::{colorize_depth_delta, depth_delta};
use depthbridge::image::{Image, Rgba};

fn l1(a: [u8; 3], b: [u8; 3]) -> u32 {
    a.iter().zip(&b).map(|(&x, &y)| (x as i32 - y as i32).unsigned_abs()).sum()
}

// ===== Single sample =====

#[test]
fn sentinel_is_black_and_nothing_else_is() {
    assert_eq!(depth_to_color(INVALID_DEPTH), [0, 0, 0]);
    for s in 0..INVALID_DEPTH {
        assert_ne!(depth_to_color(s), [0, 0, 0], "sample {s}");
    }
}

#[test]
fn adjacent_depths_have_adjacent_colors() {
    for s in 0..INVALID_DEPTH - 1 {
        let d = l1(depth_to_color(s), depth_to_color(s + 1));
        assert!(d <= 2, "samples {s} and {} differ by {d}", s + 1);
    }
}

#[test]
fn near_is_blue_far_is_red() {
    let near = depth_to_color(800);
    let far = depth_to_color(4000);
    assert!(near[2] > near[0]);
    assert!(far[0] > far[2]);
}

#[test]
fn mapping_is_deterministic() {
    for s in [0u16, 799, 1500, 2400, 3999, 8000] {
        assert_eq!(depth_to_color(s), depth_to_color(s));
    }
}

// ===== Whole frame =====

#[test]
fn colorize_frame_matches_per_sample_mapping() {
    let palette = DepthPalette::default();
    let depth = Image::from_vec(
        4,
        2,
        vec![0, 800, 1600, 2400, 3200, 4000, 4800, INVALID_DEPTH],
    );
    let out = colorize_depth_frame(&depth, &palette);
    assert_eq!(out.dimensions(), (4, 2));
    for (x, y, px) in out.pixels() {
        let s = depth.get(x, y);
        if s == INVALID_DEPTH {
            assert_eq!(px, Rgba::ZERO);
        } else {
            assert_eq!(px.rgb(), depth_to_color(s));
            assert_eq!(px.alpha(), VALID_ALPHA);
        }
    }
}

#[test]
fn all_invalid_frame_is_all_zero() {
    let depth = Image::filled(80, 60, INVALID_DEPTH);
    let out = colorize_depth_frame(&depth, &DepthPalette::default());
    assert!(out.as_bytes().iter().all(|&b| b == 0));
}

#[test]
fn packed_encoding_matches_millimeters() {
    let mm = DepthPalette::default();
    let packed = DepthPalette { encoding: DepthEncoding::KinectPacked, ..mm };
    for d in [500u16, 1200, 2500, 3900, 6000] {
        assert_eq!(packed.color(d << 3 | 3), mm.color(d));
    }
}

#[test]
fn export_to_image_crate() {
    let depth = Image::from_vec(2, 1, vec![800u16, INVALID_DEPTH]);
    let rgba = colorize_depth_frame(&depth, &DepthPalette::default()).to_rgba_image();
    assert_eq!(rgba.dimensions(), (2, 1));
    assert_eq!(rgba.get_pixel(0, 0).0, [0, 0, 255, VALID_ALPHA]);
    assert_eq!(rgba.get_pixel(1, 0).0, [0, 0, 0, 0]);
}

// ===== Delta =====

#[test]
fn delta_saturates_and_propagates_sentinel() {
    let prev = Image::from_vec(4, 1, vec![1000u16, 2000, INVALID_DEPTH, 1500]);
    let curr = Image::from_vec(4, 1, vec![1500u16, 1000, 1200, INVALID_DEPTH]);
    let d = depth_delta(&prev, &curr).unwrap();
    assert_eq!(d.row(0), &[500, 0, INVALID_DEPTH, INVALID_DEPTH]);

    let colored = colorize_depth_delta(&prev, &curr, &DepthPalette::default()).unwrap();
    assert_eq!(colored.get(2, 0), Rgba::ZERO);
    assert_eq!(colored.get(1, 0).alpha(), VALID_ALPHA);
}
